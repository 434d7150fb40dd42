//! Clap derive structures for the `sabiana` CLI.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use sabiana_core::HvacMode;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sabiana -- watch and control Sabiana Cloud vent units
#[derive(Debug, Parser)]
#[command(
    name = "sabiana",
    version,
    about = "Monitor and control Sabiana Cloud vent units",
    long_about = "Polls the Sabiana Cloud API for vent unit state and sends commands.\n\n\
        Commands are shown optimistically until the cloud reports that the\n\
        unit has applied them.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "SABIANA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "SABIANA_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Sabiana Cloud API key
    #[arg(long, env = "SABIANA_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SABIANA_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SABIANA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll once and list vent units
    #[command(alias = "ls")]
    Units(UnitsArgs),

    /// Poll continuously and print every new snapshot
    Watch(WatchArgs),

    /// Change mode, fan speed or target temperature of a unit
    Set(SetArgs),

    /// Poll once and dump coordinator diagnostics
    Diagnostics,

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Units ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UnitsArgs {
    /// Show a single unit in detail (`<group>:<address>`)
    pub unit: Option<String>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Stop after this many snapshots
    #[arg(long, short = 'n')]
    pub count: Option<usize>,
}

// ── Set ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("change")
        .required(true)
        .multiple(true)
        .args(["mode", "fan", "temperature"])
))]
pub struct SetArgs {
    /// Group id of the unit
    pub group: String,

    /// Address of the unit
    pub address: String,

    /// Operating mode
    #[arg(long, short = 'm')]
    pub mode: Option<ModeArg>,

    /// Fan speed, as a label from the profile's fan map or a raw value
    #[arg(long, short = 'f')]
    pub fan: Option<String>,

    /// Target temperature for the current mode
    #[arg(long, short = 't', allow_negative_numbers = true)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Off,
    Heat,
    Cool,
    Auto,
    FanOnly,
}

impl From<ModeArg> for HvacMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Off => Self::Off,
            ModeArg::Heat => Self::Heat,
            ModeArg::Cool => Self::Cool,
            ModeArg::Auto => Self::Auto,
            ModeArg::FanOnly => Self::FanOnly,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration with secrets masked
    Show,

    /// Store an API key in the system keyring for the active profile
    SetKey {
        /// The key to store
        key: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
