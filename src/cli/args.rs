//! CLI argument definitions
//!
//! All Clap derive structs for `skynt-phi` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::SourceKind;
use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Φ scoring engine, NFT rarity scoring and on-chain parameter reader.
#[derive(Parser, Debug)]
#[command(name = "skynt-phi", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "SKYNT_PHI_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "SKYNT_PHI_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Path to YAML configuration file.
    #[arg(short, long, global = true, env = "SKYNT_PHI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Data source overrides, applied over the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Data source selection.
    #[arg(long = "source", global = true, env = "SKYNT_PHI_SOURCE")]
    pub kind: Option<SourceKind>,

    /// JSON-RPC endpoint of the chain node.
    #[arg(long, global = true, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Path of the deployment record (`deployed_admin.json`).
    #[arg(long, global = true, env = "SKYNT_PHI_DEPLOYMENT")]
    pub deployment: Option<PathBuf>,

    /// Fail instead of answering from mock data when the source is down.
    #[arg(long, global = true)]
    pub no_fallback: bool,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read or compute Φ.
    Phi(PhiCommand),

    /// Compute a rarity score offline.
    Rarity(RarityArgs),

    /// Query minted tokens.
    Nft(NftCommand),

    /// Generate the eigenvector particle field from live parameters.
    Particles(ParticlesArgs),

    /// Sample Φ periodically into the history buffer.
    Watch(WatchArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Phi Command
// ============================================================================

/// Φ commands.
#[derive(Args, Debug)]
pub struct PhiCommand {
    /// Phi subcommand.
    #[command(subcommand)]
    pub subcommand: PhiSubcommand,
}

/// Φ subcommands.
#[derive(Subcommand, Debug)]
pub enum PhiSubcommand {
    /// Current Φ total from the data source.
    Current(FormatArgs),

    /// Parameter set and derived entropy-shift metrics.
    Details(FormatArgs),

    /// Run the engine on parameters given on the command line.
    Compute(ComputeArgs),
}

/// Arguments for `phi compute`.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Comma-separated weights.
    #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    pub weights: Vec<String>,

    /// Comma-separated values.
    #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    pub values: Vec<String>,

    /// Comma-separated eigen-coefficients (enables ΔS output).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub eigen: Option<Vec<String>>,

    /// Use 256-bit integer arithmetic (inputs must be non-negative integers).
    #[arg(long)]
    pub exact: bool,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Rarity Command
// ============================================================================

/// Arguments for `rarity`.
#[derive(Args, Debug)]
pub struct RarityArgs {
    /// Tokens minted at mint time.
    #[arg(long, allow_negative_numbers = true)]
    pub supply: String,

    /// Demand at mint time.
    #[arg(long, allow_negative_numbers = true)]
    pub demand: String,

    /// The token's φ value.
    #[arg(long = "phi", allow_negative_numbers = true)]
    pub phi_value: String,

    /// Use 256-bit integer arithmetic.
    #[arg(long)]
    pub exact: bool,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// NFT Command
// ============================================================================

/// Token commands.
#[derive(Args, Debug)]
pub struct NftCommand {
    /// NFT subcommand.
    #[command(subcommand)]
    pub subcommand: NftSubcommand,
}

/// Token subcommands.
#[derive(Subcommand, Debug)]
pub enum NftSubcommand {
    /// The first 100 tokens with metadata and owner.
    List(FormatArgs),

    /// One token with metadata and owner.
    Get(TokenArgs),

    /// Recomputed rarity score of one token.
    Rarity(TokenArgs),

    /// Token count per rarity tier (first 1000 tokens).
    Distribution(FormatArgs),
}

/// Arguments naming one token.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Token id.
    pub token_id: u64,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Particles / Watch
// ============================================================================

/// Arguments for `particles`.
#[derive(Args, Debug)]
pub struct ParticlesArgs {
    /// Particle count (overrides `particles.count`).
    #[arg(long)]
    pub count: Option<usize>,

    /// RNG seed.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Simulation ticks to advance before printing.
    #[arg(long, default_value_t = 0)]
    pub steps: u64,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Sampling interval, e.g. `3s` (overrides `watch.interval`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this many samples (runs until interrupted otherwise).
    #[arg(long)]
    pub samples: Option<u64>,

    /// History entries to print on exit (overrides `history.default_limit`).
    #[arg(long)]
    pub history_limit: Option<usize>,

    /// Write JSONL events to this file instead of stderr.
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for `completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell.
    pub shell: Shell,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Output format only.
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Color when stderr is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

/// Command output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Human,
    /// JSON.
    Json,
}

/// Shells supported by `completions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash.
    Bash,
    /// Zsh.
    Zsh,
    /// Fish.
    Fish,
    /// PowerShell.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
