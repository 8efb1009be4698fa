//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kiln Controller CLI
#[derive(Parser, Debug)]
#[command(name = "kilnctl")]
#[command(version, about = "Kiln Controller CLI", long_about = None)]
pub struct Cli {
    /// Server URL (overrides config file)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/kiln/cli.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show system information
    Info,

    /// Show controller state
    Status {
        /// Keep polling until interrupted
        #[arg(short, long)]
        watch: bool,

        /// Polling interval in seconds when watching
        #[arg(short, long, default_value_t = 2)]
        interval: u64,
    },

    /// Check server connectivity and health
    Health,

    /// Firing profile management commands
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Start a run
    Run {
        /// Profile to run (default: the last one run)
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Stop the current run and de-energize
    Stop,

    /// Acknowledge a latched fault
    Ack,

    /// Show or manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all profiles
    List,

    /// Show a profile's points
    Show {
        /// Profile name
        name: String,
    },

    /// Create or replace a profile
    Save {
        /// Profile name
        name: String,

        /// Points as `seconds:celsius` pairs (e.g., "0:20,60:20,660:999")
        #[arg(short, long)]
        points: String,

        /// What happens after the last point: hold_last or return_idle
        #[arg(short, long)]
        end: Option<String>,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,
    },

    /// Show the target temperature at an elapsed time
    Preview {
        /// Profile name
        name: String,

        /// Seconds since the run started
        #[arg(short, long)]
        elapsed: f64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Reset configuration to defaults
    Reset,
}
