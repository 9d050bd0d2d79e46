//! Country matching for nonprofit listings
//!
//! A listing belongs to a country when the country's display name appears in
//! its location or its description. Matching is plain case-insensitive
//! substring containment.

use super::{MatchedOrg, OrgListing};

/// Keeps the listings that mention `name`, annotated with where it appeared
///
/// Both flags are computed independently; a listing with neither set is
/// dropped. Input order is preserved.
pub fn filter(orgs: Vec<OrgListing>, name: &str) -> Vec<MatchedOrg> {
    let needle = name.to_lowercase();
    orgs.into_iter()
        .filter_map(|listing| {
            let matched_by_location = normalize(&listing.location).contains(&needle);
            let matched_by_description = normalize(&listing.description).contains(&needle);
            (matched_by_location || matched_by_description).then_some(MatchedOrg {
                listing,
                matched_by_location,
                matched_by_description,
            })
        })
        .collect()
}

fn normalize(field: &str) -> String {
    field.trim().to_lowercase()
}
