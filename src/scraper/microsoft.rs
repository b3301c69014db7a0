use super::{
    browser::CaptureFilter,
    career_site::{CareerSite, CareerSiteScraper, DomMerge, Searches},
    fields::{DEFAULT_SYNONYMS, Synonyms},
};
use crate::models::{job::JobRecord, target::Target};
use crate::utils::config::Config;

pub static SITE: CareerSite = CareerSite {
    target: Target::Microsoft,
    company: "Microsoft",
    base: "https://jobs.careers.microsoft.com",
    searches: Searches::Fixed(&[
        "https://jobs.careers.microsoft.com/global/en/search?p=Software%20Engineering&l=en_us&pg=1&pgSz=20&o=Relevance&flt=true",
    ]),
    detail_fragment: "/job/",
    capture: CaptureFilter {
        url_contains: &["careers.microsoft.com", "gcsservices.careers.microsoft.com"],
        require_json_mime: false,
    },
    synonyms: Synonyms {
        title: &["title", "jobTitle", "name"],
        url: &[
            "url",
            "jobUrl",
            "canonicalPositionUrl",
            "applyUrl",
            "detailsUrl",
            "href",
            "path",
            "slug",
        ],
        location: &[
            "primaryWorkLocation",
            "primaryLocation",
            "location",
            "jobLocation",
            "locations",
            "city",
            "region",
        ],
        id: &["jobId", "id"],
        ..DEFAULT_SYNONYMS
    },
    id_template: Some("/us/en/job/{id}"),
    native_id: Some(r"/job/(\d+)"),
    dom_merge: DomMerge::FallbackOnly,
    consent_pattern: None,
    skip_link_markers: &["/search"],
    card_location: None,
    fast_early_stop: None,
};

pub async fn scrape(config: Config) -> Vec<JobRecord> {
    CareerSiteScraper::new(&SITE, config).scrape().await
}
