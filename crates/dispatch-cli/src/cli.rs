use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Economic dispatch model builder", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the dispatch model for a case, solve it and write result sheets
    Run {
        /// Case directory holding the input CSV sheets
        #[arg(value_hint = ValueHint::DirPath)]
        case: PathBuf,
        /// Output directory for result sheets and the run manifest
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        /// Settings file (defaults to `<case>/settings.toml` when present)
        #[arg(long, value_hint = ValueHint::FilePath)]
        settings: Option<PathBuf>,
        /// Value of lost load (currency/MWh), overrides the settings file
        #[arg(long)]
        voll: Option<f64>,
        /// Add load-shedding units, overrides the settings file
        #[arg(long, value_enum)]
        shedding: Option<Toggle>,
        /// LP solver backend (clarabel; highs when built with `solver-highs`)
        #[arg(long)]
        lp_solver: Option<String>,
        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Print model statistics and the generation block table
    Inspect {
        #[arg(value_hint = ValueHint::DirPath)]
        case: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        settings: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Check a case for data problems without solving it
    Validate {
        #[arg(value_hint = ValueHint::DirPath)]
        case: PathBuf,
        #[arg(long, value_hint = ValueHint::FilePath)]
        settings: Option<PathBuf>,
        /// Treat warnings as failures
        #[arg(long)]
        strict: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn run_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "dispatch",
            "run",
            "case",
            "--out",
            "results",
            "--voll",
            "2500",
            "--shedding",
            "on",
            "--lp-solver",
            "clarabel",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Run {
                voll,
                shedding,
                lp_solver,
                ..
            }) => {
                assert_eq!(voll, Some(2500.0));
                assert_eq!(shedding, Some(Toggle::On));
                assert_eq!(lp_solver.as_deref(), Some("clarabel"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_requires_out() {
        assert!(Cli::try_parse_from(["dispatch", "run", "case"]).is_err());
    }
}
