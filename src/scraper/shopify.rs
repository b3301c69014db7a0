use super::{
    browser::CaptureFilter,
    career_site::{CareerSite, CareerSiteScraper, DomMerge, Searches},
    fields::{DEFAULT_SYNONYMS, Synonyms},
};
use crate::models::{job::JobRecord, target::Target};
use crate::utils::config::Config;

pub static SITE: CareerSite = CareerSite {
    target: Target::Shopify,
    company: "Shopify",
    base: "https://www.shopify.com",
    searches: Searches::Fixed(&["https://www.shopify.com/careers/search"]),
    detail_fragment: "/careers/jobs/",
    capture: CaptureFilter {
        url_contains: &["shopify.com"],
        require_json_mime: true,
    },
    synonyms: Synonyms {
        title: &["title", "jobTitle", "name"],
        url: &["url", "applyUrl", "canonicalUrl", "href", "path", "slug"],
        location: &["location", "jobLocation", "city"],
        ..DEFAULT_SYNONYMS
    },
    id_template: None,
    native_id: None,
    dom_merge: DomMerge::FallbackOnly,
    consent_pattern: Some("^(accept|agree|allow|got it|ok)"),
    skip_link_markers: &["?"],
    card_location: Some("[class*=location], [data-testid*=location]"),
    fast_early_stop: None,
};

pub async fn scrape(config: Config) -> Vec<JobRecord> {
    CareerSiteScraper::new(&SITE, config).scrape().await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;
    use crate::scraper::browser::parse_anchors;

    #[test]
    fn cards_carry_their_location() {
        let html = r#"
            <div class="job-card">
              <a href="/careers/jobs/backend-developer_5f2c">Backend Developer</a>
              <span class="job-location">Remote - Americas</span>
            </div>
            <a href="/careers/search?teams=engineering">Engineering</a>"#;
        let base = Url::parse(SITE.base).unwrap();
        let anchors = parse_anchors(html, &base, "a[href]", SITE.card_location);
        let raws = SITE.dom_postings(anchors);

        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].url, "https://www.shopify.com/careers/jobs/backend-developer_5f2c");
        assert_eq!(raws[0].locations, vec!["Remote - Americas"]);
    }
}
