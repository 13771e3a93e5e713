//! CLI module - Command-line interface for Authgate
//!
//! This module provides a structured CLI using clap for argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Authgate - token authentication API
#[derive(Parser)]
#[command(name = "authgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Delete expired tokens and reset codes
    Prune,
}

impl Cli {
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }

    /// `init` gets defaults since the file it is about to write may not exist yet.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match (&self.command, &self.config) {
            (Some(Commands::Init { .. }), _) => Ok(Config::default()),
            (_, Some(path)) => Config::load_from_path(path),
            (_, None) => Config::load(),
        }
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::parse_from(["authgate"]);
        assert_eq!(cli.command(), Commands::Serve);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["authgate", "prune", "--config", "/tmp/a.toml"]);
        assert_eq!(cli.command(), Commands::Prune);
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/a.toml"));
    }

    #[test]
    fn test_init_force() {
        let cli = Cli::parse_from(["authgate", "init", "--force"]);
        assert_eq!(cli.command(), Commands::Init { force: true });
        assert!(cli.load_config().is_ok());
    }
}
