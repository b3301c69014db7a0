use super::{
    browser::CaptureFilter,
    career_site::{CareerSite, CareerSiteScraper, DomMerge, Searches},
    fields::{DEFAULT_SYNONYMS, Synonyms},
};
use crate::models::{job::JobRecord, target::Target};
use crate::utils::config::Config;

pub static SITE: CareerSite = CareerSite {
    target: Target::Meta,
    company: "Meta",
    base: "https://www.metacareers.com",
    searches: Searches::Fixed(&[
        "https://www.metacareers.com/jobs/?q=software%20engineer",
        "https://www.metacareers.com/jobs/?q=engineer",
    ]),
    detail_fragment: "/jobs/",
    capture: CaptureFilter {
        url_contains: &["metacareers.com"],
        require_json_mime: false,
    },
    synonyms: Synonyms {
        title: &["title", "jobTitle", "name"],
        url: &["url", "jobUrl", "canonicalUrl", "applyUrl", "detailsUrl", "href", "path", "slug"],
        location: &["locations", "location", "jobLocation", "city", "region"],
        id: &["jobId", "id"],
        ..DEFAULT_SYNONYMS
    },
    id_template: Some("/jobs/{id}/"),
    native_id: Some(r"/jobs/(\d+)"),
    dom_merge: DomMerge::FallbackOnly,
    consent_pattern: None,
    skip_link_markers: &["?q=", "/jobs/?"],
    card_location: None,
    fast_early_stop: None,
};

pub async fn scrape(config: Config) -> Vec<JobRecord> {
    CareerSiteScraper::new(&SITE, config).scrape().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::browser::Anchor;

    #[test]
    fn search_links_are_not_jobs() {
        let anchors = vec![
            Anchor {
                url: "https://www.metacareers.com/jobs/?q=engineer&offices[0]=Remote".to_string(),
                text: "Remote".to_string(),
                location: None,
            },
            Anchor {
                url: "https://www.metacareers.com/jobs/1234567890/".to_string(),
                text: "Software Engineer, Infrastructure".to_string(),
                location: None,
            },
        ];
        let raws = SITE.dom_postings(anchors);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].url, "https://www.metacareers.com/jobs/1234567890/");
    }
}
