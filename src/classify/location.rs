use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;

const US_STATE_CODES: [&str; 51] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM",
    "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

const US_STATE_NAMES: [&str; 53] = [
    "ALABAMA",
    "ALASKA",
    "ARIZONA",
    "ARKANSAS",
    "CALIFORNIA",
    "COLORADO",
    "CONNECTICUT",
    "DELAWARE",
    "DISTRICT OF COLUMBIA",
    "WASHINGTON DC",
    "D\\.C\\.",
    "FLORIDA",
    "GEORGIA",
    "HAWAII",
    "IDAHO",
    "ILLINOIS",
    "INDIANA",
    "IOWA",
    "KANSAS",
    "KENTUCKY",
    "LOUISIANA",
    "MAINE",
    "MARYLAND",
    "MASSACHUSETTS",
    "MICHIGAN",
    "MINNESOTA",
    "MISSISSIPPI",
    "MISSOURI",
    "MONTANA",
    "NEBRASKA",
    "NEVADA",
    "NEW HAMPSHIRE",
    "NEW JERSEY",
    "NEW MEXICO",
    "NEW YORK",
    "NORTH CAROLINA",
    "NORTH DAKOTA",
    "OHIO",
    "OKLAHOMA",
    "OREGON",
    "PENNSYLVANIA",
    "RHODE ISLAND",
    "SOUTH CAROLINA",
    "SOUTH DAKOTA",
    "TENNESSEE",
    "TEXAS",
    "UTAH",
    "VERMONT",
    "VIRGINIA",
    "WASHINGTON",
    "WEST VIRGINIA",
    "WISCONSIN",
    "WYOMING",
];

const CA_PROVINCE_CODES: [&str; 13] = [
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];

const CA_PROVINCE_NAMES: [&str; 14] = [
    "ALBERTA",
    "BRITISH COLUMBIA",
    "MANITOBA",
    "NEW BRUNSWICK",
    "NEWFOUNDLAND AND LABRADOR",
    "NEWFOUNDLAND",
    "NOVA SCOTIA",
    "NORTHWEST TERRITORIES",
    "NUNAVUT",
    "ONTARIO",
    "PRINCE EDWARD ISLAND",
    "QUEBEC",
    "SASKATCHEWAN",
    "YUKON",
];

static US_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:UNITED STATES|U\.S\.A\.?|USA|U\.S\.?|US)\b").expect("valid regex")
});

static CA_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bCANADA\b").expect("valid regex"));

// `CAN` is too ambiguous to stand alone, so it only counts next to a remote qualifier.
static REMOTE_COUNTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:REMOTE|VIRTUAL|WORK\s*FROM\s*HOME|WFH)\b[\s,\-–:(]*(?:IN\s+)?(?:THE\s+)?(USA|US|CAN|CANADA)\b|\b(USA|US|CAN|CANADA)\b[\s,\-–:)]*\(?(?:REMOTE|VIRTUAL)\b",
    )
    .expect("valid regex")
});

static US_STATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|,\s*)(?:{})(?:\s|,|$)",
        US_STATE_CODES.join("|")
    ))
    .expect("valid regex")
});

static CA_PROVINCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|,\s*)(?:{})(?:\s|,|$)",
        CA_PROVINCE_CODES.join("|")
    ))
    .expect("valid regex")
});

static US_STATE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|[^A-Z])(?:{})(?:[^A-Z]|$)",
        US_STATE_NAMES.join("|")
    ))
    .expect("valid regex")
});

static CA_PROVINCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|[^A-Z])(?:{})(?:[^A-Z]|$)",
        CA_PROVINCE_NAMES.join("|")
    ))
    .expect("valid regex")
});

/// Infers the set of country codes (`US`, `CA`) a free-text location points
/// at. Purely lexical: `"Remote"` alone infers nothing, while `"Remote - US"`
/// infers `US`. A location naming both countries yields both.
pub fn infer_countries(text: &str) -> BTreeSet<String> {
    let upper = text.to_uppercase();
    let upper = upper.trim();
    let mut found = BTreeSet::new();

    if upper.is_empty() {
        return found;
    }

    if US_TOKEN.is_match(upper) {
        found.insert("US".to_string());
    }
    if CA_TOKEN.is_match(upper) {
        found.insert("CA".to_string());
    }

    for caps in REMOTE_COUNTRY.captures_iter(upper) {
        let token = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        match token {
            Some("US" | "USA") => found.insert("US".to_string()),
            Some("CAN" | "CANADA") => found.insert("CA".to_string()),
            _ => false,
        };
    }

    if US_STATE_TOKEN.is_match(upper) || US_STATE_NAME.is_match(upper) {
        found.insert("US".to_string());
    }
    if CA_PROVINCE_TOKEN.is_match(upper) || CA_PROVINCE_NAME.is_match(upper) {
        found.insert("CA".to_string());
    }

    found
}

/// Maps structured country fields onto the codes the filter speaks. Unknown
/// countries come back upper-cased so they never collide with `US`/`CA`.
pub fn normalize_country(raw: &str) -> Option<String> {
    let upper = raw.trim().trim_matches('.').to_uppercase();
    let code = match upper.as_str() {
        "" => return None,
        "US" | "USA" | "U.S" | "U.S.A" | "UNITED STATES" | "UNITED STATES OF AMERICA" => "US",
        "CA" | "CAN" | "CANADA" => "CA",
        other => other,
    };
    Some(code.to_string())
}

/// Which countries an adapter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryFilter {
    Any,
    Only(BTreeSet<String>),
}

impl CountryFilter {
    /// Parses `"US,CA"`-style lists. `ALL` or `*` is the wildcard; an empty
    /// list falls back to the default North America filter.
    pub fn parse(raw: &str) -> Self {
        let codes: BTreeSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .collect();

        if codes.iter().any(|c| c == "ALL" || c == "*") {
            return CountryFilter::Any;
        }
        if codes.is_empty() {
            return CountryFilter::default();
        }

        CountryFilter::Only(codes.iter().filter_map(|c| normalize_country(c)).collect())
    }

    pub fn permits(&self, code: &str) -> bool {
        match self {
            CountryFilter::Any => true,
            CountryFilter::Only(codes) => codes.contains(code),
        }
    }
}

impl Default for CountryFilter {
    fn default() -> Self {
        CountryFilter::Only(["US", "CA"].into_iter().map(String::from).collect())
    }
}

/// Accepts a job whose candidate locations point at an allowed country.
///
/// The first candidate whose inferred countries intersect the filter accepts
/// the job. If no candidate yields any country, `keep_unknown` decides; if
/// countries were inferred but none is allowed, the job is rejected.
pub fn is_allowed<S: AsRef<str>>(candidates: &[S], filter: &CountryFilter, keep_unknown: bool) -> bool {
    if *filter == CountryFilter::Any {
        return true;
    }

    let mut inferred_any = false;
    for candidate in candidates {
        let countries = infer_countries(candidate.as_ref());
        if countries.iter().any(|c| filter.permits(c)) {
            return true;
        }
        inferred_any |= !countries.is_empty();
    }

    !inferred_any && keep_unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(text: &str) -> Vec<String> {
        infer_countries(text).into_iter().collect()
    }

    #[test]
    fn state_and_province_codes() {
        assert_eq!(codes("Seattle, WA"), vec!["US"]);
        assert_eq!(codes("Toronto, ON"), vec!["CA"]);
        assert_eq!(codes("Vancouver, BC, Canada"), vec!["CA"]);
        assert_eq!(codes("Washington, D.C."), vec!["US"]);
    }

    #[test]
    fn remote_needs_a_country() {
        assert!(codes("Remote").is_empty());
        assert_eq!(codes("Remote - US"), vec!["US"]);
        assert_eq!(codes("Remote (CAN)"), vec!["CA"]);
        assert_eq!(codes("US Remote"), vec!["US"]);
    }

    #[test]
    fn multi_country_locations_yield_both() {
        assert_eq!(codes("New York, NY / Toronto, Ontario"), vec!["CA", "US"]);
    }

    #[test]
    fn foreign_cities_infer_nothing() {
        assert!(codes("London, UK").is_empty());
        assert!(codes("Bangalore, India").is_empty());
        // Lowercase state-like words are not state codes after a comma.
        assert!(codes("Paris, France").is_empty());
    }

    #[test]
    fn country_normalization() {
        assert_eq!(normalize_country("United States of America").as_deref(), Some("US"));
        assert_eq!(normalize_country("can").as_deref(), Some("CA"));
        assert_eq!(normalize_country("GBR").as_deref(), Some("GBR"));
        assert_eq!(normalize_country("  "), None);
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(CountryFilter::parse("ALL"), CountryFilter::Any);
        assert_eq!(CountryFilter::parse("*"), CountryFilter::Any);
        assert_eq!(CountryFilter::parse(""), CountryFilter::default());
        assert_eq!(
            CountryFilter::parse("usa, Canada"),
            CountryFilter::Only(["US", "CA"].into_iter().map(String::from).collect())
        );
    }

    #[test]
    fn allowed_decisions() {
        let filter = CountryFilter::default();
        assert!(is_allowed(&["Berlin, Germany", "Austin, TX"], &filter, false));
        assert!(is_allowed(&["Berlin, Germany", "London, UK"], &filter, true));
        assert!(!is_allowed(&["Berlin, Germany", "London, UK"], &filter, false));
        assert!(!is_allowed(&["Seattle, WA"], &CountryFilter::parse("CA"), true));
        assert!(is_allowed::<&str>(&[], &filter, true));
        assert!(!is_allowed::<&str>(&[], &filter, false));
        assert!(!is_allowed(&["Remote - US"], &CountryFilter::parse("CA"), true));
        assert!(is_allowed(&["Mars"], &CountryFilter::Any, false));
    }
}
