use super::{
    browser::CaptureFilter,
    career_site::{CareerSite, CareerSiteScraper, DomMerge, Searches},
    fields::{DEFAULT_SYNONYMS, Synonyms},
};
use crate::models::{job::JobRecord, target::Target};
use crate::utils::config::Config;

const QUERIES: &[&str] = &[
    "software engineer",
    "software developer",
    "production engineer",
    "data engineer",
    "machine learning engineer",
    "backend engineer",
    "platform engineer",
    "infrastructure engineer",
    "systems engineer",
    "ios engineer",
    "android engineer",
    "graphics engineer",
    "compiler engineer",
    "site reliability engineer",
    "reliability engineer",
    "security engineer",
    "tooling engineer",
    "new grad",
    "university grad",
    "early career",
    "intern",
];

const FAST_QUERIES: &[&str] = &[
    "software engineer",
    "software developer",
    "new grad",
    "intern",
    "early career",
];

pub static SITE: CareerSite = CareerSite {
    target: Target::Apple,
    company: "Apple",
    base: "https://jobs.apple.com",
    searches: Searches::Queries {
        templates: &["https://jobs.apple.com/en-us/search?search={q}"],
        queries: QUERIES,
        fast_queries: FAST_QUERIES,
    },
    detail_fragment: "/details/",
    capture: CaptureFilter {
        url_contains: &["jobs.apple.com"],
        require_json_mime: false,
    },
    synonyms: Synonyms {
        title: &["title", "jobTitle", "postingTitle", "name"],
        url: &["url", "applyUrl", "detailsUrl", "canonicalUrl", "href", "path", "slug"],
        location: &["location", "jobLocation", "locations", "city", "region"],
        id: &["jobId", "id", "roleNumber", "reqId", "positionId"],
        ..DEFAULT_SYNONYMS
    },
    id_template: Some("/en-us/details/{id}"),
    native_id: Some(r"/details/(\d+)"),
    dom_merge: DomMerge::Supplement,
    consent_pattern: None,
    skip_link_markers: &["search="],
    card_location: None,
    fast_early_stop: Some(350),
};

pub async fn scrape(config: Config) -> Vec<JobRecord> {
    CareerSiteScraper::new(&SITE, config).scrape().await
}
