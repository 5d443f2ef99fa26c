//! Command-line interface for cardiodesk.
//!
//! This module provides the CLI structure for the `cardiodesk` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AnalyzeCommand, ConfigCommand, OutputFormat, PatientsCommand, ServeCommand, StatusCommand,
};

/// cardiodesk - Patient intake and cardiac signal analysis
///
/// Registers patients through a local web interface, runs the external
/// QRS/RR/QT analysis for each of them and shows the resulting report.
#[derive(Debug, Parser)]
#[command(name = "cardiodesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web interface
    Serve(ServeCommand),

    /// Create or upgrade the patient database
    InitDb,

    /// Show database statistics
    Status(StatusCommand),

    /// Inspect patient records
    #[command(subcommand)]
    Patients(PatientsCommand),

    /// Run the analysis for one patient and store its NAD result
    Analyze(AnalyzeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::InitDb,
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "cardiodesk");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["cardiodesk", "serve"]).unwrap();
        match cli.command {
            Command::Serve(cmd) => {
                assert!(cmd.bind.is_none());
                assert!(cmd.port.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli =
            Cli::try_parse_from(["cardiodesk", "serve", "--bind", "0.0.0.0", "-p", "8080"])
                .unwrap();
        match cli.command {
            Command::Serve(cmd) => {
                assert_eq!(cmd.bind, Some("0.0.0.0".parse().unwrap()));
                assert_eq!(cmd.port, Some(8080));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_rejects_bad_port() {
        assert!(Cli::try_parse_from(["cardiodesk", "serve", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_parse_init_db() {
        let cli = Cli::try_parse_from(["cardiodesk", "init-db"]).unwrap();
        assert!(matches!(cli.command, Command::InitDb));
    }

    #[test]
    fn test_parse_patients_list() {
        let cli = Cli::try_parse_from(["cardiodesk", "patients", "list", "-f", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Patients(PatientsCommand::List {
                format: OutputFormat::Json
            })
        ));
    }

    #[test]
    fn test_parse_patients_list_default_format() {
        let cli = Cli::try_parse_from(["cardiodesk", "patients", "list"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Patients(PatientsCommand::List {
                format: OutputFormat::Table
            })
        ));
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from(["cardiodesk", "analyze", "42"]).unwrap();
        match cli.command {
            Command::Analyze(cmd) => assert_eq!(cmd.patient_id, 42),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_analyze_requires_id() {
        assert!(Cli::try_parse_from(["cardiodesk", "analyze"]).is_err());
    }

    #[test]
    fn test_parse_status_json() {
        let cli = Cli::try_parse_from(["cardiodesk", "status", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Status(StatusCommand { json: true })));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["cardiodesk", "-c", "/custom/config.toml", "init-db"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cardiodesk", "serve", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["cardiodesk", "status", "-q"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["cardiodesk", "config", "validate", "--file", "a.toml"]).unwrap();
        match cli.command {
            Command::Config(ConfigCommand::Validate { file }) => {
                assert_eq!(file, Some(PathBuf::from("a.toml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
