//! Country code to display name resolution
//!
//! The resolver asks a [`CountryNameLookup`] for the display name of an
//! upper-cased code. Any miss or lookup failure falls back to the raw code, so
//! resolution never aborts a request.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::CountryIdentity;

/// Country table bundled with the binary
const BUNDLED_COUNTRY_CODES: &str = include_str!("../../data/country-codes.json");

/// Errors that can occur when looking up a country name
#[derive(Debug, Error)]
pub enum LookupError {
    /// The lookup table could not be read
    #[error("Failed to read country table: {0}")]
    Io(#[from] std::io::Error),

    /// The lookup table is not a valid list of country entries
    #[error("Failed to parse country table: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backing store could not answer
    #[error("Country lookup unavailable: {0}")]
    Unavailable(String),
}

/// Source of display names keyed by upper-case country code
#[async_trait]
pub trait CountryNameLookup: Send + Sync {
    /// Returns the display name for `code`, or `None` if it is unknown
    async fn get_name(&self, code: &str) -> Result<Option<String>, LookupError>;
}

/// One row of the country code table file
#[derive(Debug, Deserialize)]
struct CountryCodeEntry {
    country_code: String,
    country_name: String,
}

/// In-memory country code table loaded from a JSON list of
/// `{"country_code": ..., "country_name": ...}` entries
#[derive(Debug, Clone, Default)]
pub struct CountryCodeTable {
    names: HashMap<String, String>,
}

impl CountryCodeTable {
    /// Parses a table from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, LookupError> {
        let entries: Vec<CountryCodeEntry> = serde_json::from_str(json)?;
        let names = entries
            .into_iter()
            .map(|entry| (entry.country_code.trim().to_uppercase(), entry.country_name))
            .collect();
        Ok(Self { names })
    }

    /// Loads a table from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The ISO 3166-1 alpha-3 table shipped in `data/country-codes.json`
    pub fn bundled() -> Self {
        // The embedded file is checked by `test_bundled_table_parses`.
        Self::from_json(BUNDLED_COUNTRY_CODES).unwrap_or_default()
    }

    /// Loads the table at `path` if given, falling back to the bundled table
    pub fn load_or_bundled(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load country table, using bundled table"
                );
                Self::bundled()
            }),
            None => Self::bundled(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[async_trait]
impl CountryNameLookup for CountryCodeTable {
    async fn get_name(&self, code: &str) -> Result<Option<String>, LookupError> {
        Ok(self.names.get(code).cloned())
    }
}

/// Maps caller-supplied codes to display names
#[derive(Clone)]
pub struct CountryResolver {
    lookup: Arc<dyn CountryNameLookup>,
}

impl CountryResolver {
    pub fn new(lookup: Arc<dyn CountryNameLookup>) -> Self {
        Self { lookup }
    }

    /// Resolves `code` to a display name
    ///
    /// Makes a single lookup attempt with the upper-cased code. Returns `code`
    /// unchanged on a miss, a blank entry, or a lookup failure.
    pub async fn resolve(&self, code: &str) -> String {
        match self.lookup.get_name(&code.to_uppercase()).await {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => {
                debug!(country = code, "Country code not found, using code as name");
                code.to_string()
            }
            Err(e) => {
                warn!(country = code, error = %e, "Country lookup failed, using code as name");
                code.to_string()
            }
        }
    }

    /// Builds the identity for a request
    pub async fn identify(&self, code: &str) -> CountryIdentity {
        let code = code.trim().to_uppercase();
        let name = self.resolve(&code).await;
        CountryIdentity::new(&code, name)
    }
}
