use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod domain;
mod lifecycle;
mod services;

pub use cli::*;
pub use domain::errors::{ConfigError, GateError, ScanError, TransportError};
pub use domain::models::*;
pub use services::clamav::{classify, MalwareScanner, Scanner};
pub use services::intake::IntakePipeline;
pub use services::listing::ListingService;
pub use services::output::{print_err, print_one, print_out};
pub use services::remote::ListingClient;
pub use services::server::serve;
pub use services::settings::Settings;
pub use services::sync::SyncClient;
pub use services::transport::{build_transport, host_key_policy, FailClosed};
pub use services::validate::classify_model;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = error_code(&e);
            let message = format!("{e:#}");
            tracing::error!(code, error = %message, "command failed");
            print_err(cli.json, code, &message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    // Format checks run anywhere; every other command needs its role section.
    let settings = match &cli.command {
        Commands::Intake {
            command: IntakeCommands::Check { .. },
        } => Settings::load_or_default(&cli.config)?,
        _ => Settings::load(&cli.config)?,
    };
    services::logging::init_logging(
        &settings.logging.level,
        settings.log_file().as_deref(),
        cli.verbose,
    )?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    if commands::handle_intake_commands(cli, &settings)? {
        return Ok(());
    }
    if commands::handle_serve(cli, &settings)? {
        return Ok(());
    }
    if commands::handle_listing_commands(cli, &settings)? {
        return Ok(());
    }
    commands::handle_sync_commands(cli, &settings)?;
    Ok(())
}

fn error_code(e: &anyhow::Error) -> &'static str {
    if let Some(g) = e.downcast_ref::<GateError>() {
        g.code()
    } else if e.downcast_ref::<ConfigError>().is_some() {
        "CONFIG"
    } else if e.downcast_ref::<TransportError>().is_some() {
        "TRANSPORT"
    } else if e.downcast_ref::<ScanError>().is_some() {
        "SCAN_FAILED"
    } else {
        "INTERNAL"
    }
}
