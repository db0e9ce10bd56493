pub mod filter;
pub mod normalize;
pub mod roster;

use scraper::Html;
use tracing::warn;

use crate::store::ExecutiveRecord;

/// Two-pass pipeline over one filing: profile document → company name,
/// executives document → officer roster, with a representative-officer
/// fallback from the profile when the roster yields nothing. An empty result
/// means "no officers found", not an error.
pub fn extract_officers(profile_html: &str, executives_html: &str) -> Vec<ExecutiveRecord> {
    let profile = Html::parse_document(profile_html);
    let company_name = roster::filer_name(&profile);

    let officers = if executives_html.is_empty() {
        Vec::new()
    } else {
        roster::officer_roster(executives_html)
    };

    if officers.is_empty() {
        let Some((position, name)) = roster::representative_officer(&profile) else {
            warn!("no roster entries and no representative-officer field");
            return Vec::new();
        };
        return vec![ExecutiveRecord { company_name, name, position }];
    }

    officers
        .into_iter()
        .map(|(name, position)| ExecutiveRecord {
            company_name: company_name.clone(),
            name,
            position,
        })
        .collect()
}

// ── Tests ──
