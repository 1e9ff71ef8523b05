//! CLI entry point for the cpf-lookup tool.

use anyhow::{Context, Result};
use clap::Parser;
use cpf_lookup::{Endpoint, LookupClient, LookupConfig};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let mut config = LookupConfig::default()
        .with_max_attempts(u32::from(args.max_attempts))
        .with_timeout(Duration::from_secs(args.timeout_secs));

    if !args.endpoints.is_empty() {
        let endpoints = args
            .endpoints
            .iter()
            .map(|raw| {
                Url::parse(raw)
                    .map(Endpoint::form)
                    .with_context(|| format!("invalid endpoint URL: {raw}"))
            })
            .collect::<Result<Vec<_>>>()?;
        config = config.with_endpoints(endpoints);
    }

    let client = LookupClient::new(config).context("failed to initialize HTTP transports")?;

    info!(cpf = %args.cpf, "Running lookup");
    let result = client.lookup(&args.cpf).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
