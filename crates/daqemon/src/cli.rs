//! Clap derive structures for the `daqemon` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// daqemon -- sync DAQEMON channels to an Emoncms metering server
#[derive(Debug, Parser)]
#[command(
    name = "daqemon",
    version,
    about = "Sync DAQEMON channels to an Emoncms metering server",
    long_about = "Reconciles the channels configured on a DAQEMON node with the inputs,\n\
        feeds and process lists of an Emoncms server, and drives the local\n\
        daemon over JSON-RPC.",
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
    /// Emoncms server URL (overrides config)
    #[arg(long, short = 's', env = "DAQEMON_SERVER", global = true)]
    pub server: Option<String>,

    /// Emoncms write API key
    #[arg(long, env = "DAQEMON_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Daemon JSON-RPC endpoint (overrides config)
    #[arg(long, env = "DAQEMON_RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Local device configuration file (overrides config)
    #[arg(long, env = "DAQEMON_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DAQEMON_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "DAQEMON_INSECURE", global = true)]
    pub insecure: bool,

    /// Server request timeout, e.g. "5s" (overrides config)
    #[arg(long, env = "DAQEMON_TIMEOUT", global = true)]
    pub timeout: Option<humantime::Duration>,
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
    /// Reconcile local channels with the metering server
    Sync(SyncArgs),

    /// Inspect the metering server
    #[command(alias = "r")]
    Remote(RemoteArgs),

    /// Register the node and load its profile
    Node(NodeArgs),

    /// Control the local DAQEMON daemon
    #[command(alias = "d")]
    Daemon(DaemonArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommand,
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Show what an apply would create or update, then stop
    Plan,

    /// Preview, confirm, and apply inputs, feeds and process lists
    Apply,
}

// ── Remote ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteCommand,
}

#[derive(Debug, Subcommand)]
pub enum RemoteCommand {
    /// List inputs
    Inputs {
        /// Only inputs of this node
        #[arg(long, short = 'n')]
        node: Option<String>,
    },

    /// List feeds
    Feeds,

    /// List the process catalogue
    Processes,

    /// Print the server version
    Version,
}

// ── Node ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Create or update the node resource, load its profile meta, and
    /// hand the updated configuration to the daemon
    Register {
        /// Ask the daemon to persist the configuration
        #[arg(long)]
        persist: bool,
    },
}

// ── Daemon ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    /// Show whether the service is enabled and running
    Status,

    /// List serial ports available to the daemon
    Ports,

    /// Show the length of the upload queue
    Queue,

    /// Restart the service
    Restart,

    /// Enable the service at boot
    Enable,

    /// Disable the service at boot
    Disable,

    /// Start the service
    Start,

    /// Stop the service
    Stop,

    /// Scan a bus for devices, or poll a running scan
    Scan {
        /// Interfaces to scan (comma-separated)
        #[arg(long, short = 'i')]
        interfaces: Option<String>,

        /// Number of slave ids to probe
        #[arg(long, short = 'c')]
        count: Option<u32>,
    },

    /// Erase the daemon configuration
    Erase,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Store the API key for the configured server in the system keyring
    SetKey,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
