//! Poverty Atlas - poverty data and nonprofits per country
//!
//! `lookup` prints one aggregate document; `serve` exposes the same pipeline
//! over HTTP.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use povertyatlas::cli::{parse_country_arg, Cli, Command};
use povertyatlas::config::Config;
use povertyatlas::logging::setup_logging;
use povertyatlas::pipeline::Pipeline;
use povertyatlas::web::{self, WebState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Reject bad arguments before touching config or the network
    let lookup_country = match &cli.command {
        Command::Lookup {
            country: Some(country),
            ..
        } => Some(parse_country_arg(country)?),
        _ => None,
    };

    let config = Config::load().context("Failed to load configuration")?;
    setup_logging(&config.log_level, cli.tracing);
    info!(version = env!("CARGO_PKG_VERSION"), "starting povertyatlas");

    let pipeline = Pipeline::from_config(&config).context("Failed to initialize pipeline")?;

    match cli.command {
        Command::Lookup { refresh, pretty, .. } => {
            let code = match lookup_country {
                Some(code) => code,
                None => parse_country_arg(&config.default_country)?,
            };
            let result = if refresh {
                pipeline.refresh(&code).await?
            } else {
                pipeline.run(&code).await?
            };

            let json = if pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{json}");
        }
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
            let state = WebState::new(pipeline, &config.default_country);
            web::serve(state, &addr)
                .await
                .with_context(|| format!("Failed to serve on {addr}"))?;
        }
    }

    Ok(())
}
