//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Scangraph -- synchronize vulnerability scan data into an entity graph.
///
/// Use `scangraph <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "scangraph", version, about, long_about = None)]
pub struct Cli {
    /// Path to the scangraph.toml configuration file.
    #[arg(short, long, default_value = "scangraph.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one synchronization and build the entity graph.
    Sync(SyncArgs),

    /// Validate configuration and API credentials.
    Validate(ValidateArgs),

    /// Run a single bulk export and report its contents.
    Export(ExportArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- sync ----

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Write the resulting graph snapshot (JSON) to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Also synchronize container images and their reports.
    #[arg(long)]
    pub containers: bool,
}

// ---- validate ----

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Only check the configuration file; do not contact the API.
    #[arg(long)]
    pub offline: bool,
}

// ---- export ----

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Which export to run.
    pub kind: ExportTarget,

    /// Write the exported records (JSON array) to this file.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Bulk export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportTarget {
    Assets,
    Vulnerabilities,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tenable, export, sync).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_sync_defaults() {
        let cli = Cli::try_parse_from(["scangraph", "sync"]).expect("parse succeeded");
        match cli.command {
            Commands::Sync(args) => {
                assert!(args.out.is_none(), "out should default to None");
                assert!(!args.containers, "containers should default to false");
            }
            _ => panic!("expected Sync command"),
        }
        assert_eq!(cli.config, PathBuf::from("scangraph.toml"));
    }

    #[test]
    fn test_cli_parse_sync_with_out_file() {
        let cli = Cli::try_parse_from(["scangraph", "sync", "--out", "/tmp/graph.json", "--containers"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.out, Some(PathBuf::from("/tmp/graph.json")));
                assert!(args.containers);
            }
            _ => panic!("expected Sync command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_offline() {
        let cli = Cli::try_parse_from(["scangraph", "validate", "--offline"]).expect("parse succeeded");
        match cli.command {
            Commands::Validate(args) => assert!(args.offline),
            _ => panic!("expected Validate command"),
        }
    }

    #[test]
    fn test_cli_parse_export_kinds() {
        for (arg, expected) in [
            ("assets", ExportTarget::Assets),
            ("vulnerabilities", ExportTarget::Vulnerabilities),
        ] {
            let cli = Cli::try_parse_from(["scangraph", "export", arg]).expect("parse succeeded");
            match cli.command {
                Commands::Export(args) => assert_eq!(args.kind, expected),
                _ => panic!("expected Export command"),
            }
        }
    }

    #[test]
    fn test_cli_parse_export_unknown_kind_fails() {
        let args = Cli::try_parse_from(["scangraph", "export", "containers"]);
        assert!(args.is_err(), "unknown export kind should be rejected");
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["scangraph", "config", "show", "--section", "tenable"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => assert_eq!(section, Some("tenable".to_owned())),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "scangraph",
            "-c",
            "/etc/scangraph.toml",
            "--log-level",
            "debug",
            "--output",
            "json",
            "validate",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/scangraph.toml"));
        assert_eq!(cli.log_level, Some("debug".to_owned()));
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["scangraph"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "scangraph");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in ["sync", "validate", "export", "config"] {
            assert!(
                subcommands.contains(&expected),
                "should have '{expected}' subcommand"
            );
        }
    }
}
