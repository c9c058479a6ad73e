pub mod app;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "projectdesk")]
#[command(about = "Project-tracking REST backend")]
pub struct Cli {
    /// Directory for the write-ahead log and snapshots (overrides DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (the default)
    Serve {
        /// Overrides APP_HOST
        #[arg(long)]
        host: Option<String>,
        /// Overrides APP_PORT
        #[arg(long)]
        port: Option<u16>,
        /// Insert this many sample projects before serving
        #[arg(long)]
        seed: Option<usize>,
    },
    /// Fill the store with sample projects
    Seed {
        #[arg(long, default_value_t = 20)]
        count: usize,
        /// Remove existing projects first
        #[arg(long)]
        reset: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            host: None,
            port: None,
            seed: None,
        })
    }
}
