use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::links::NetworkingLinks;

/// A normalized posting as it leaves an adapter. `url` is the identity of the
/// job everywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Posted", default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<NaiveDate>,
    #[serde(flatten)]
    pub links: NetworkingLinks,
}

/// Adapter-internal posting, before de-duplication and filtering. Any field
/// may be blank; the sieve decides what survives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPosting {
    pub title: String,
    pub url: String,
    /// Free-text location strings in the order the source listed them.
    pub locations: Vec<String>,
    /// Structured country fields (codes or names) when the source has them.
    pub countries: Vec<String>,
    pub posted: Option<NaiveDate>,
}

impl RawPosting {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        RawPosting {
            title: title.into().trim().to_string(),
            url: url.into().trim().to_string(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl AsRef<str>) -> Self {
        self.push_location(location.as_ref());
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for location in locations {
            self.push_location(location.as_ref());
        }
        self
    }

    pub fn with_country(mut self, country: impl AsRef<str>) -> Self {
        let country = country.as_ref().trim();
        if !country.is_empty() && !self.countries.iter().any(|c| c == country) {
            self.countries.push(country.to_string());
        }
        self
    }

    pub fn with_posted(mut self, posted: Option<NaiveDate>) -> Self {
        self.posted = posted;
        self
    }

    fn push_location(&mut self, location: &str) {
        let location = location.trim();
        if location.is_empty() || location.eq_ignore_ascii_case("n/a") {
            return;
        }
        if !self.locations.iter().any(|l| l == location) {
            self.locations.push(location.to_string());
        }
    }

    /// Human-readable location, `"N/A"` when nothing is known.
    pub fn display_location(&self) -> String {
        if self.locations.is_empty() {
            "N/A".to_string()
        } else {
            self.locations.join(", ")
        }
    }

    /// Fills blanks in `self` from a duplicate record of the same job.
    pub fn absorb(&mut self, other: RawPosting) {
        if self.title.is_empty() {
            self.title = other.title;
        }
        if self.locations.is_empty() {
            self.locations = other.locations;
        }
        if self.countries.is_empty() {
            self.countries = other.countries;
        }
        if self.posted.is_none() {
            self.posted = other.posted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_placeholder_locations_are_ignored() {
        let raw = RawPosting::new(" Engineer ", "https://x.test/1")
            .with_location("  ")
            .with_location("N/A")
            .with_location("Austin, TX")
            .with_location("Austin, TX");
        assert_eq!(raw.title, "Engineer");
        assert_eq!(raw.locations, vec!["Austin, TX".to_string()]);
        assert_eq!(raw.display_location(), "Austin, TX");
    }

    #[test]
    fn absorb_only_fills_missing_fields() {
        let mut first = RawPosting::new("Engineer", "https://x.test/1");
        let second = RawPosting::new("engineer", "https://x.test/1").with_location("Toronto, ON");
        first.absorb(second);
        assert_eq!(first.title, "Engineer");
        assert_eq!(first.display_location(), "Toronto, ON");
    }
}
