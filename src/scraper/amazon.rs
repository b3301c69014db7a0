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
    "security engineer",
    "sdet",
    "tooling engineer",
    "new grad",
    "university grad",
    "early career",
    "intern",
];

const FAST_QUERIES: &[&str] = &["software engineer", "new grad", "university grad", "intern"];

pub static SITE: CareerSite = CareerSite {
    target: Target::Amazon,
    company: "Amazon",
    base: "https://www.amazon.jobs",
    searches: Searches::Queries {
        templates: &[
            "https://www.amazon.jobs/en/search?keywords={q}",
            "https://www.amazon.jobs/en/search?business_category=software-development&keywords={q}",
        ],
        queries: QUERIES,
        fast_queries: FAST_QUERIES,
    },
    detail_fragment: "/en/jobs/",
    capture: CaptureFilter {
        url_contains: &["amazon.jobs"],
        require_json_mime: false,
    },
    synonyms: Synonyms {
        title: &["title", "jobTitle", "name"],
        url: &[
            "url",
            "jobUrl",
            "canonicalUrl",
            "applyUrl",
            "detailsUrl",
            "href",
            "path",
            "jobPath",
            "job_path",
            "slug",
        ],
        location: &["location", "normalized_location", "jobLocation", "city", "region"],
        id: &["jobId", "id_icims", "id"],
        ..DEFAULT_SYNONYMS
    },
    id_template: Some("/en/jobs/{id}"),
    native_id: Some(r"/en/jobs/(\d+)"),
    dom_merge: DomMerge::Supplement,
    consent_pattern: None,
    skip_link_markers: &["/search"],
    card_location: None,
    fast_early_stop: None,
};

pub async fn scrape(config: Config) -> Vec<JobRecord> {
    CareerSiteScraper::new(&SITE, config).scrape().await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::scraper::browser::Anchor;

    #[test]
    fn search_api_jobs_resolve_relative_paths() {
        let payload = json!({"hits": 1, "jobs": [{
            "title": "Software Development Engineer",
            "job_path": "/en/jobs/2856331/software-development-engineer",
            "normalized_location": "Seattle, Washington, USA",
            "posted_date": "June 3, 2024"
        }]});
        let raws = SITE.network_postings(&[payload]).unwrap();
        assert_eq!(
            raws[0].url,
            "https://www.amazon.jobs/en/jobs/2856331/software-development-engineer"
        );
        assert_eq!(raws[0].locations, vec!["Seattle, Washington, USA"]);
    }

    #[test]
    fn generic_dom_labels_are_kept_for_the_sieve() {
        let raws = SITE.dom_postings(vec![Anchor {
            url: "https://www.amazon.jobs/en/jobs/2856331/sde-i".to_string(),
            text: "Read more".to_string(),
            location: None,
        }]);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].title, "Read more");
    }
}
