//! Core data models for Poverty Atlas
//!
//! This module contains the types that flow through the aggregation pipeline:
//! the resolved country identity, the opaque poverty payload, nonprofit
//! listings before and after matching, and the aggregate document that is
//! cached and returned to callers.

pub mod countries;
pub mod matcher;
pub mod nonprofits;
pub mod poverty;

pub use countries::{CountryCodeTable, CountryNameLookup, CountryResolver, LookupError};
pub use matcher::filter;
pub use nonprofits::{Harvest, NonprofitClient, OrgSource, StopReason};
pub use poverty::{PovertyClient, PovertySource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The country a request is about
///
/// `code` is the caller-supplied key in upper case; `name` is the resolved
/// display name, or the code itself when resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryIdentity {
    pub code: String,
    pub name: String,
}

impl CountryIdentity {
    /// Builds an identity, upper-casing the code
    pub fn new(code: &str, name: impl Into<String>) -> Self {
        Self {
            code: code.trim().to_uppercase(),
            name: name.into(),
        }
    }
}

/// Yearly poverty data points exactly as the provider returned them
///
/// Usually a JSON array, occasionally a single object. The pipeline never
/// looks inside it beyond counting elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PovertyRecord(pub Value);

impl PovertyRecord {
    /// An empty sequence, used whenever the provider is unavailable
    pub fn empty() -> Self {
        Self(Value::Array(Vec::new()))
    }

    /// Number of yearly data points: the element count of a sequence, else 1
    pub fn year_count(&self) -> usize {
        match &self.0 {
            Value::Array(items) => items.len(),
            _ => 1,
        }
    }

    pub fn is_empty_sequence(&self) -> bool {
        matches!(&self.0, Value::Array(items) if items.is_empty())
    }
}

impl Default for PovertyRecord {
    fn default() -> Self {
        Self::empty()
    }
}

/// A nonprofit listing from the paginated provider, with missing values
/// normalized to empty strings and an empty tag list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgListing {
    pub name: String,
    pub description: String,
    pub website: String,
    pub location: String,
    pub tags: Vec<String>,
    pub profile_url: String,
    pub logo_url: String,
    pub cover_image_url: String,
}

/// A listing kept by the matcher, annotated with why it matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedOrg {
    #[serde(flatten)]
    pub listing: OrgListing,
    pub matched_by_location: bool,
    pub matched_by_description: bool,
}

/// Derived statistics over an aggregate result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub org_count: usize,
    pub poverty_year_count: usize,
    pub generated_at: DateTime<Utc>,
}

/// The canonical per-country document: the unit of caching and the unit
/// returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub identity: CountryIdentity,
    pub poverty_data: PovertyRecord,
    pub organizations: Vec<MatchedOrg>,
    pub summary: Summary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_uppercases_code() {
        let identity = CountryIdentity::new(" aus ", "Australia");
        assert_eq!(identity.code, "AUS");
        assert_eq!(identity.name, "Australia");
    }

    #[test]
    fn test_year_count_for_sequence() {
        let record = PovertyRecord(json!([{"year": 2019}, {"year": 2020}, {"year": 2021}]));
        assert_eq!(record.year_count(), 3);
    }

    #[test]
    fn test_year_count_for_single_object() {
        let record = PovertyRecord(json!({"year": 2019, "headcount": 0.12}));
        assert_eq!(record.year_count(), 1);
    }

    #[test]
    fn test_empty_record_is_empty_sequence() {
        let record = PovertyRecord::empty();
        assert_eq!(record.year_count(), 0);
        assert!(record.is_empty_sequence());
        assert_eq!(serde_json::to_string(&record).unwrap(), "[]");
    }

    #[test]
    fn test_matched_org_serializes_flat_camel_case() {
        let org = MatchedOrg {
            listing: OrgListing {
                name: "Hope".to_string(),
                profile_url: "https://every.org/hope".to_string(),
                ..Default::default()
            },
            matched_by_location: true,
            matched_by_description: false,
        };

        let value = serde_json::to_value(&org).unwrap();
        assert_eq!(value["name"], "Hope");
        assert_eq!(value["profileUrl"], "https://every.org/hope");
        assert_eq!(value["coverImageUrl"], "");
        assert_eq!(value["tags"], json!([]));
        assert_eq!(value["matchedByLocation"], true);
        assert_eq!(value["matchedByDescription"], false);
    }

    #[test]
    fn test_aggregate_result_field_names() {
        let result = AggregateResult {
            identity: CountryIdentity::new("BGD", "Bangladesh"),
            poverty_data: PovertyRecord::empty(),
            organizations: Vec::new(),
            summary: Summary {
                org_count: 0,
                poverty_year_count: 0,
                generated_at: Utc::now(),
            },
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["identity"]["code"], "BGD");
        assert_eq!(value["povertyData"], json!([]));
        assert_eq!(value["organizations"], json!([]));
        assert_eq!(value["summary"]["orgCount"], 0);
        assert_eq!(value["summary"]["povertyYearCount"], 0);
        assert!(value["summary"]["generatedAt"].is_string());
    }
}
