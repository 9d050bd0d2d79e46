//! Runtime configuration
//!
//! Layered with figment: built-in defaults, then `povertyatlas.toml` in the
//! working directory if present, then `ATLAS_`-prefixed environment variables
//! (e.g. `ATLAS_FRESHNESS_SECS=3600`).

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::DEFAULT_FRESHNESS_SECS;
use crate::data::nonprofits::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, EVERY_ORG_BASE_URL};
use crate::data::poverty::{DEFAULT_POVERTY_LINE, PIP_BASE_URL};
use crate::secrets::DEFAULT_SECRET_ID;

/// Optional config file read from the working directory
pub const CONFIG_FILE: &str = "povertyatlas.toml";

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "ATLAS_";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level for this crate when `RUST_LOG` is unset
    pub log_level: String,
    /// Country used when a request names none
    pub default_country: String,
    pub poverty_base_url: String,
    /// Poverty line in 2017 PPP dollars per day
    pub poverty_line: f64,
    pub nonprofit_base_url: String,
    pub page_size: u32,
    pub max_pages: u32,
    /// Timeout for each upstream request
    pub request_timeout_secs: u64,
    /// Age below which a cached aggregate is served as-is
    pub freshness_secs: u64,
    /// Cache directory; the XDG cache directory when unset
    pub cache_dir: Option<PathBuf>,
    /// Country code table; the bundled table when unset
    pub country_codes_path: Option<PathBuf>,
    /// Id of the secret holding the nonprofit provider's API key
    pub secret_id: String,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            default_country: "BGD".to_string(),
            poverty_base_url: PIP_BASE_URL.to_string(),
            poverty_line: DEFAULT_POVERTY_LINE,
            nonprofit_base_url: EVERY_ORG_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout_secs: 30,
            freshness_secs: DEFAULT_FRESHNESS_SECS,
            cache_dir: None,
            country_codes_path: None,
            secret_id: DEFAULT_SECRET_ID.to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    /// Loads defaults, the config file and the environment, then validates
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Extracts and validates a config from an arbitrary figment
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.page_size == 0, "page_size must be greater than 0"),
            (self.max_pages == 0, "max_pages must be greater than 0"),
            (self.freshness_secs == 0, "freshness_secs must be greater than 0"),
            (self.request_timeout_secs == 0, "request_timeout_secs must be greater than 0"),
        ];
        match checks.into_iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Invalid(message.to_string())),
            None => Ok(()),
        }
    }
}
