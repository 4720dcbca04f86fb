//! Shared configuration for the sconnect tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `sconnect_api::ClientConfig`. The CLI layers its
//! flag overrides on top of this.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sconnect_api::{ClientConfig, DEFAULT_BASE_URL, RetryPolicy, TlsMode, TransportConfig};

/// Environment variable consulted for the API key when a profile doesn't
/// name its own.
pub const API_KEY_ENV: &str = "MERAKI_API_KEY";

/// Keyring service name.
const KEYRING_SERVICE: &str = "sconnect";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named dashboard profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    sconnect_api::retry::DEFAULT_MAX_RETRIES
}

/// A named dashboard profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// API root (default: `https://api.meraki.com/api/v1`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Organization the site commands act on.
    pub organization_id: Option<String>,

    /// API key in plaintext. Prefer the keyring or an env var.
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Override retry budget.
    pub max_retries: Option<u32>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Path to an additional CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate verification. Only for local mocks and lab proxies.
    pub insecure: Option<bool>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

impl Profile {
    /// A profile pointing at `base_url` with everything else unset.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sconnect", "sconnect").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sconnect");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path, layering `SCONNECT_*` env vars on top.
///
/// Nested keys use `__` in the environment, e.g.
/// `SCONNECT_DEFAULTS__MAX_RETRIES=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SCONNECT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve an API key from the credential chain (no CLI flag step).
///
/// Order: profile `api_key_env` → `MERAKI_API_KEY` → system keyring →
/// plaintext `api_key`.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(val) = std::env::var(API_KEY_ENV) {
        if !val.is_empty() {
            return Ok(SecretString::from(val));
        }
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring under `{profile}/api-key`.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key)?;
    Ok(())
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
}

/// Build a `ClientConfig` from a profile and global defaults, without CLI
/// flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let api_key = resolve_api_key(profile, profile_name)?;
    client_config_with_key(profile, defaults, api_key)
}

/// Build a `ClientConfig` from a profile using an already-resolved key.
pub fn client_config_with_key(
    profile: &Profile,
    defaults: &Defaults,
    api_key: SecretString,
) -> Result<ClientConfig, ConfigError> {
    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsMode::DangerAcceptInvalid
    } else {
        profile
            .ca_cert
            .clone()
            .map_or(TlsMode::System, TlsMode::CustomCa)
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(ClientConfig {
        base_url,
        api_key,
        retry: RetryPolicy::with_max_retries(profile.max_retries.unwrap_or(defaults.max_retries)),
        transport: TransportConfig { tls, timeout },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn default_config_has_default_profile_name() {
        let cfg = Config::default();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.max_retries, 3);
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn load_and_save_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        let mut profile = Profile::new("https://example.test/api/v1");
        profile.organization_id = Some("549236".into());
        profile.max_retries = Some(5);
        cfg.profiles.insert("lab".into(), profile);
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let lab = &loaded.profiles["lab"];
        assert_eq!(lab.base_url, "https://example.test/api/v1");
        assert_eq!(lab.organization_id.as_deref(), Some("549236"));
        assert_eq!(lab.max_retries, Some(5));
    }

    #[test]
    fn profile_without_base_url_uses_public_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[profiles.default]\norganization_id = \"42\"\napi_key = \"plain\"\n",
        )
        .unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.profiles.is_empty());
    }

    #[test]
    fn client_config_from_profile() {
        let mut profile = Profile::new("https://example.test/api/v1");
        // Point at a variable nobody sets so the plaintext key is reached
        // unless MERAKI_API_KEY is set in the test environment.
        profile.api_key_env = Some("SCONNECT_TEST_UNSET_KEY_VAR".into());
        profile.api_key = Some("plain-key".into());
        profile.timeout = Some(5);

        let defaults = Defaults {
            max_retries: 7,
            ..Defaults::default()
        };
        let cfg = profile_to_client_config(&profile, "unit-test-profile", &defaults).unwrap();

        assert_eq!(cfg.base_url.as_str(), "https://example.test/api/v1");
        assert_eq!(cfg.retry.max_retries, 7);
        assert_eq!(cfg.transport.timeout, Duration::from_secs(5));
        assert_eq!(cfg.transport.tls, TlsMode::System);
        assert!(!cfg.api_key.expose_secret().is_empty());
    }

    #[test]
    fn invalid_base_url_is_a_validation_error() {
        let mut profile = Profile::new("not a url");
        profile.api_key = Some("k".into());
        let err = profile_to_client_config(&profile, "p", &Defaults::default()).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "base_url"),
            "got {err:?}"
        );
    }

    #[test]
    fn ca_cert_selects_custom_tls() {
        let mut profile = Profile::new(DEFAULT_BASE_URL);
        profile.api_key = Some("k".into());
        profile.ca_cert = Some(PathBuf::from("/etc/ssl/proxy.pem"));
        let cfg = profile_to_client_config(&profile, "p", &Defaults::default()).unwrap();
        assert_eq!(
            cfg.transport.tls,
            TlsMode::CustomCa(PathBuf::from("/etc/ssl/proxy.pem"))
        );
    }

    #[test]
    fn insecure_overrides_ca_cert() {
        let mut profile = Profile::new(DEFAULT_BASE_URL);
        profile.ca_cert = Some(PathBuf::from("/etc/ssl/proxy.pem"));
        profile.insecure = Some(true);
        let cfg = client_config_with_key(
            &profile,
            &Defaults::default(),
            SecretString::from("k".to_owned()),
        )
        .unwrap();
        assert_eq!(cfg.transport.tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn insecure_false_keeps_system_roots() {
        let mut profile = Profile::new(DEFAULT_BASE_URL);
        profile.insecure = Some(false);
        let cfg = client_config_with_key(
            &profile,
            &Defaults::default(),
            SecretString::from("k".to_owned()),
        )
        .unwrap();
        assert_eq!(cfg.transport.tls, TlsMode::System);
    }
}
