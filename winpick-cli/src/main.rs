mod app;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::app::{Cli, EXIT_FAILURE};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = match init_logging(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("winpick: {err:#}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    tracing::debug!(command = ?cli.command, "starting winpick");
    run_native(&cli)
}

fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "winpick.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (
                Some(fmt::layer().with_writer(non_blocking).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(windows)]
fn run_native(cli: &Cli) -> ExitCode {
    let picker = winpick::NativePicker::default();
    let mut stdout = std::io::stdout().lock();
    match app::run(&picker, cli, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!(error = ?err, "Failed to write selection");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

#[cfg(not(windows))]
fn run_native(_cli: &Cli) -> ExitCode {
    tracing::error!("native file dialogs require Windows");
    eprintln!("winpick: native file dialogs are only available on Windows");
    ExitCode::from(EXIT_FAILURE)
}
