//! Combines the resolved identity, the poverty payload and the matched
//! nonprofits into one [`AggregateResult`].

use chrono::{DateTime, Utc};

use crate::data::{AggregateResult, CountryIdentity, MatchedOrg, PovertyRecord, Summary};

/// Builds the aggregate document, stamped with the current time
pub fn aggregate(
    identity: CountryIdentity,
    poverty_data: PovertyRecord,
    organizations: Vec<MatchedOrg>,
) -> AggregateResult {
    aggregate_at(identity, poverty_data, organizations, Utc::now())
}

/// Builds the aggregate document with an explicit generation time
pub fn aggregate_at(
    identity: CountryIdentity,
    poverty_data: PovertyRecord,
    organizations: Vec<MatchedOrg>,
    generated_at: DateTime<Utc>,
) -> AggregateResult {
    let summary = Summary {
        org_count: organizations.len(),
        poverty_year_count: poverty_data.year_count(),
        generated_at,
    };

    AggregateResult {
        identity,
        poverty_data,
        organizations,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OrgListing;
    use chrono::TimeZone;
    use serde_json::json;

    fn matched(name: &str) -> MatchedOrg {
        MatchedOrg {
            listing: OrgListing {
                name: name.to_string(),
                ..Default::default()
            },
            matched_by_location: true,
            matched_by_description: false,
        }
    }

    #[test]
    fn test_summary_counts_match_contents() {
        let result = aggregate(
            CountryIdentity::new("BGD", "Bangladesh"),
            PovertyRecord(json!([{"year": 2010}, {"year": 2016}, {"year": 2022}])),
            vec![matched("a"), matched("b")],
        );

        assert_eq!(result.summary.org_count, result.organizations.len());
        assert_eq!(result.summary.org_count, 2);
        assert_eq!(result.summary.poverty_year_count, 3);
    }

    #[test]
    fn test_single_object_counts_as_one_year() {
        let result = aggregate(
            CountryIdentity::new("ZZZ", "ZZZ"),
            PovertyRecord(json!({"message": "not found"})),
            Vec::new(),
        );

        assert_eq!(result.summary.poverty_year_count, 1);
        assert_eq!(result.summary.org_count, 0);
    }

    #[test]
    fn test_aggregate_is_deterministic_for_fixed_time() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let build = || {
            aggregate_at(
                CountryIdentity::new("AUS", "Australia"),
                PovertyRecord::empty(),
                vec![matched("x")],
                at,
            )
        };

        assert_eq!(build(), build());
        assert_eq!(build().summary.generated_at, at);
    }

    #[test]
    fn test_organization_order_is_kept() {
        let result = aggregate(
            CountryIdentity::new("AUS", "Australia"),
            PovertyRecord::empty(),
            vec![matched("first"), matched("second")],
        );
        assert_eq!(result.organizations[0].listing.name, "first");
        assert_eq!(result.organizations[1].listing.name, "second");
    }
}
