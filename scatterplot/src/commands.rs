use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scatterplot", version, about = "Scatterplot data tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a color dataset covers every point of a position dataset
    CheckMapping {
        #[arg(long)]
        registry: PathBuf,
        colors: u64,
        positions: u64,
        #[arg(long, alias = "jq")]
        json_query: bool,
    },
    /// List the roles a dataset can take when dropped on a plot
    DropTargets {
        #[arg(long)]
        registry: PathBuf,
        #[arg(long)]
        positions: Option<u64>,
        candidate: u64,
        #[arg(long, alias = "jq")]
        json_query: bool,
    },
    /// Map a color dataset onto the points of a position dataset
    Colors {
        #[arg(long)]
        registry: PathBuf,
        #[arg(long)]
        positions: u64,
        #[arg(long)]
        colors: u64,
        #[arg(long, default_value_t = 0)]
        dimension: usize,
        #[arg(long, alias = "jq")]
        json_query: bool,
    },
    /// Show or change the persisted plot settings
    Settings {
        /// Directory holding the defaults and factory settings files
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the current defaults
    Show {
        #[arg(long, alias = "jq")]
        json_query: bool,
    },
    /// Apply a JSON object of settings and store it as the new defaults
    Set {
        json: String,
    },
    /// Restore the factory settings
    Reset,
}
