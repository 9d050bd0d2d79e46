//! Command-line interface parsing for Poverty Atlas

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The country code is empty or contains characters other than letters and digits
    #[error("Invalid country code: '{0}'. Expected letters and digits, e.g. BGD or AUS")]
    InvalidCountry(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    Pretty,
    Json,
}

/// Poverty Atlas - poverty data and poverty-focused nonprofits per country
#[derive(Parser, Debug)]
#[command(name = "povertyatlas")]
#[command(about = "Poverty data and nonprofits per country, cached for 24 hours")]
#[command(version)]
pub struct Cli {
    /// Log format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty, global = true)]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the aggregate document for one country
    ///
    /// Examples:
    ///   povertyatlas lookup            # default country
    ///   povertyatlas lookup aus        # Australia
    ///   povertyatlas lookup KEN --refresh --pretty
    Lookup {
        /// Country code (ISO 3166-1 alpha-3)
        country: Option<String>,

        /// Ignore a fresh cache entry and fetch again
        #[arg(long)]
        refresh: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Serve aggregate documents over HTTP
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

/// Parses a country argument into its canonical upper-case form.
///
/// # Returns
/// * `Ok(String)` with the trimmed, upper-cased code
/// * `Err(CliError::InvalidCountry)` if the code is empty or not alphanumeric
pub fn parse_country_arg(s: &str) -> Result<String, CliError> {
    let code = s.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CliError::InvalidCountry(s.to_string()));
    }
    Ok(code.to_uppercase())
}
