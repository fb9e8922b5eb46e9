use anyhow::{Context, Result};
use clap::Parser;
use dataparc_connector::cli::{Cli, Commands};
use dataparc_connector::{Connector, Response};
use serde::Serialize;
use std::process::ExitCode;

/// Quiet dependencies, keep connector progress visible.
const DEFAULT_LOG_FILTER: &str = "warn,dataparc_connector=info";

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn emit<T: Serialize>(response: Response<T>) -> Result<ExitCode> {
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("failed to serialize response")?
    );
    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(
            status = response.status_code,
            message = %response.message,
            "historian request did not succeed"
        );
        Ok(ExitCode::FAILURE)
    }
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let connector = Connector::new(cli.connection.into_options())
        .context("failed to configure historian connector")?;
    if let Some(site) = connector.site_abbreviation() {
        tracing::info!(site, "using historian site");
    }

    match cli.command {
        Commands::Check => emit(connector.check_connection()),
        Commands::Latest(args) => emit(connector.fetch_latest_values(&args.tags)),
        Commands::Raw(args) => emit(connector.fetch_raw_data(&args.tags, args.start, args.end)),
        Commands::Interpolated(args) => emit(connector.fetch_interpolated_data(
            &args.range.tags,
            args.range.start,
            args.range.end,
            args.step,
            &args.aggregate,
        )),
        Commands::AtTimes(args) => emit(connector.fetch_data_at_times(&args.tags, &args.timestamps)),
    }
}
