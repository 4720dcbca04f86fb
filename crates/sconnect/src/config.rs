//! CLI configuration: a thin wrapper around `sconnect_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--base-url, --api-key, --org, ...).

use clap::ValueEnum;
use secrecy::SecretString;

use sconnect_api::{ClientConfig, DEFAULT_BASE_URL};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sconnect_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_api_key,
};

/// Everything a site command needs: the client settings, the organization
/// it acts on, and the profile it came from (for error hints).
#[derive(Debug)]
pub struct Resolved {
    pub client: ClientConfig,
    pub organization_id: String,
    pub profile_name: String,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Output format: `--output` flag, else `defaults.output`, else table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    if let Some(ref format) = global.output_flag {
        return format.clone();
    }
    <OutputFormat as ValueEnum>::from_str(&config.defaults.output, true).unwrap_or_else(|_| {
        tracing::warn!(value = %config.defaults.output, "unknown defaults.output, using table");
        OutputFormat::Table
    })
}

/// Build client settings from the config file, profile, and CLI overrides.
///
/// A missing profile is not an error: flags and environment alone are
/// enough to reach the public endpoint.
pub fn resolve(global: &GlobalOpts, config: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, config);
    let fallback;
    let profile = if let Some(p) = config.profiles.get(&profile_name) {
        p
    } else {
        if global.profile.is_some() {
            return Err(profile_not_found(&profile_name, config));
        }
        fallback = Profile::new(DEFAULT_BASE_URL);
        &fallback
    };

    resolve_profile(profile, &profile_name, global, config)
}

/// Translate a `Profile` + global flags into a [`Resolved`].
///
/// CLI flag overrides take priority over profile values, which take
/// priority over `[defaults]`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    config: &Config,
) -> Result<Resolved, CliError> {
    // 1. Base URL (flag > env > profile)
    let url_str = global.base_url.as_deref().unwrap_or(&profile.base_url);
    let mut effective = profile.clone();
    effective.base_url = url_str.to_owned();
    if let Some(timeout) = global.timeout {
        effective.timeout = Some(timeout);
    }
    if let Some(max_retries) = global.max_retries {
        effective.max_retries = Some(max_retries);
    }
    if global.insecure {
        effective.insecure = Some(true);
    }

    // 2. Organization (flag > env > profile)
    let organization_id = global
        .organization
        .clone()
        .or_else(|| profile.organization_id.clone())
        .filter(|org| !org.is_empty())
        .ok_or(CliError::NoOrganization)?;

    // 3. API key: the flag short-circuits the shared chain
    let client = match global.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => sconnect_config::client_config_with_key(
            &effective,
            &config.defaults,
            SecretString::from(key.to_owned()),
        )?,
        None => {
            sconnect_config::profile_to_client_config(&effective, profile_name, &config.defaults)?
        }
    };

    Ok(Resolved {
        client,
        organization_id,
        profile_name: profile_name.to_owned(),
    })
}

pub fn profile_not_found(name: &str, config: &Config) -> CliError {
    let mut available: Vec<_> = config.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name: name.to_owned(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}
