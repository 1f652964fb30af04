use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for the `audixd` binary.
#[derive(Debug, Parser)]
#[command(name = "audixd", version, about = "audix - versioned audit templates and checklists")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Explicit config file, layered above the project config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the REST server
    Serve {
        /// Listen address, overrides `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create or upgrade the database schema, then exit
    Migrate,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["audixd", "serve", "--bind", "0.0.0.0:9000", "--verbose"])
            .expect("cli should parse");
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Serve { bind: Some(ref addr) } if addr == "0.0.0.0:9000"
        ));
    }

    #[test]
    fn config_path_parses_before_subcommand() {
        let cli = Cli::try_parse_from(["audixd", "--config", "/etc/audix.toml", "migrate"])
            .expect("cli should parse");
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/audix.toml")));
        assert!(matches!(cli.command, Commands::Migrate));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["audixd"]).is_err());
    }
}
