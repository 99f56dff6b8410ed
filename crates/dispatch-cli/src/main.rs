use anyhow::Context;
use clap::Parser;
use dispatch_cli::{Cli, Commands};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use crate::commands::case::SettingsOverrides;
use crate::commands::run::RunArgs;

mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match &cli.command {
        Some(Commands::Run {
            case,
            out,
            settings,
            voll,
            shedding,
            lp_solver,
            json,
        }) => commands::run::handle(RunArgs {
            case,
            out,
            settings: settings.as_deref(),
            overrides: SettingsOverrides {
                voll: *voll,
                shedding: shedding.map(|toggle| toggle.enabled()),
                lp_solver: lp_solver.clone(),
            },
            json: *json,
        }),
        Some(Commands::Inspect {
            case,
            settings,
            format,
        }) => commands::inspect::handle(case, settings.as_deref(), *format),
        Some(Commands::Validate {
            case,
            settings,
            strict,
        }) => commands::validate::handle(case, settings.as_deref(), *strict),
        Some(Commands::Completions { shell, out }) => {
            commands::completions::handle(*shell, out.as_deref())
        }
        None => {
            info!("No subcommand provided. Use `dispatch --help` for more information.");
            Ok(())
        }
    }
}
