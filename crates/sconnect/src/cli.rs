//! Clap derive structures for the `sconnect` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use sconnect_api::RegionType;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sconnect -- manage Secure Connect site enrollments from the command line
#[derive(Debug, Parser)]
#[command(
    name = "sconnect",
    version,
    about = "Manage Secure Connect site enrollments from the command line",
    long_about = "Enroll, list, and remove Secure Connect sites for a dashboard organization.\n\n\
        Transient failures (5xx, 429) are retried with exponential backoff;\n\
        listings follow Link-header pagination to the last page.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "SCONNECT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "SCONNECT_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Dashboard API key
    #[arg(long, env = "MERAKI_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Organization ID (overrides profile)
    #[arg(long = "org", short = 'O', env = "SCONNECT_ORG", global = true)]
    pub organization: Option<String>,

    /// Output format [default: `defaults.output` from config, else table]
    #[arg(
        long = "output",
        short = 'o',
        env = "SCONNECT_OUTPUT",
        value_name = "FORMAT",
        global = true
    )]
    pub output_flag: Option<OutputFormat>,

    /// Effective output format, settled once config is loaded.
    #[arg(skip)]
    pub output: OutputFormat,

    /// Retries for transient failures (overrides profile)
    #[arg(long, env = "SCONNECT_MAX_RETRIES", global = true)]
    pub max_retries: Option<u32>,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SCONNECT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "SCONNECT_INSECURE", global = true)]
    pub insecure: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage Secure Connect site enrollments
    #[command(alias = "s")]
    Sites(SitesArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sites ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List every enrolled site in the organization
    #[command(alias = "ls")]
    List,

    /// Show one enrolled site, looked up by name
    Get {
        /// Exact site name
        name: String,
    },

    /// Enroll a site
    Create {
        /// Network (site) ID to enroll
        site_id: String,

        /// Region type
        #[arg(long, value_parser = parse_region_type)]
        region_type: RegionType,

        /// Region ID
        #[arg(long)]
        region_id: Option<String>,

        /// Region name
        #[arg(long)]
        region_name: Option<String>,
    },

    /// Remove a site's enrollment
    #[command(alias = "rm")]
    Delete {
        /// Network (site) ID to remove
        site_id: String,
    },
}

fn parse_region_type(s: &str) -> Result<RegionType, String> {
    s.parse()
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile with guided setup
    Init,

    /// Display current configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the API key for a profile in the system keyring
    SetKey {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
