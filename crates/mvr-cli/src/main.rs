//! mvr - query the MVR portal for issued and not yet received identity documents
//!
//! Usage:
//!   mvr <EGN> <SURNAME>                  Solve the CAPTCHA with OCR, retrying on rejection
//!   mvr <EGN> <SURNAME> --manual         Show the CAPTCHA and ask for the answer
//!   mvr <EGN> <SURNAME> --captcha <TEXT> Submit once with a known answer

mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use mvr_captcha::{AutomaticSolver, CaptchaSolver, ManualSolver};
use mvr_client::MvrClient;
use mvr_core::{AppConfig, Egn};
use std::process::ExitCode;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\nError: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "info,mvr=debug" } else { "warn,mvr=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbose).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load config")?,
    };

    let mut config = config.with_env_overrides();
    config.client.max_retries = cli.retries;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_solver(cli: &Cli, config: &AppConfig) -> Result<Option<Box<dyn CaptchaSolver>>> {
    if cli.provided_captcha().is_some() {
        return Ok(None);
    }

    if cli.manual {
        info!("Using manual CAPTCHA solving");
        return Ok(Some(Box::new(ManualSolver::from_config(&config.captcha))));
    }

    let solver = AutomaticSolver::from_config(&config.captcha)
        .context("Automatic CAPTCHA solving is unavailable")?;
    info!("Using {} for CAPTCHA recognition", solver.engine_name());
    Ok(Some(Box::new(solver)))
}

/// Run one query. Returns whether the portal reported success.
async fn run(cli: Cli) -> Result<bool> {
    let config = load_config(&cli)?;

    if let Err(e) = Egn::validate(&cli.egn) {
        warn!("{}; submitting anyway", e);
    }

    let mut client = MvrClient::new(config.client.clone()).context("Failed to create client")?;
    if let Some(solver) = build_solver(&cli, &config)? {
        client = client.with_solver(solver);
    }

    let report = client
        .query_documents(&cli.egn, &cli.surname, cli.provided_captcha())
        .await
        .context("Query failed")?;

    info!(
        "Finished after {} attempt(s): {}",
        report.attempts, report.terminal
    );

    if let Some(path) = &cli.save_html {
        output::save_html(&report.result, path)?;
        info!("Response HTML saved to {}", path.display());
    }

    if cli.json {
        println!("{}", output::json(&report)?);
    } else {
        println!("\n{}", output::summary(&report.result));
    }

    Ok(report.result.success())
}
