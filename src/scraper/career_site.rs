//! Generic engine for employer career portals that only render client side.
//! Each portal is described by a static [`CareerSite`]; the engine drives a
//! browser session through the portal's search pages, harvests intercepted
//! JSON and rendered anchors, and hands the pooled postings to the sieve.

use log::{debug, info, warn};
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::{
    browser::{Anchor, BrowserOptions, BrowserSession, CaptureFilter},
    fields::{JobShape, Synonyms},
    http::FetchError,
    sift_and_log,
};
use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::{config::Config, links::quote_plus};

const LOAD_MORE: &str = "^(load more|show more|see more|more jobs)";

/// Which search pages a portal is walked through.
#[derive(Debug, Clone, Copy)]
pub enum Searches {
    /// Every template (with a `{q}` placeholder) crossed with every query.
    Queries {
        templates: &'static [&'static str],
        queries: &'static [&'static str],
        fast_queries: &'static [&'static str],
    },
    Fixed(&'static [&'static str]),
}

/// How rendered anchors combine with intercepted JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomMerge {
    /// DOM postings are appended behind network postings.
    Supplement,
    /// DOM postings are used only when the network yielded nothing.
    FallbackOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct CareerSite {
    pub target: Target,
    pub company: &'static str,
    pub base: &'static str,
    pub searches: Searches,
    /// Path fragment every detail link contains.
    pub detail_fragment: &'static str,
    pub capture: CaptureFilter,
    pub synonyms: Synonyms,
    pub id_template: Option<&'static str>,
    /// Regex capturing the portal's job id from a detail URL.
    pub native_id: Option<&'static str>,
    pub dom_merge: DomMerge,
    /// Label of a cookie banner button to click after each navigation.
    pub consent_pattern: Option<&'static str>,
    /// Links containing any of these are search or filter pages, not jobs.
    pub skip_link_markers: &'static [&'static str],
    pub card_location: Option<&'static str>,
    /// In fast mode, stop opening search pages once this many network
    /// postings have been captured.
    pub fast_early_stop: Option<usize>,
}

impl CareerSite {
    pub fn search_urls(&self, fast: bool) -> Vec<String> {
        match self.searches {
            Searches::Fixed(urls) => urls.iter().map(|u| u.to_string()).collect(),
            Searches::Queries {
                templates,
                queries,
                fast_queries,
            } => {
                let queries = if fast { fast_queries } else { queries };
                queries
                    .iter()
                    .flat_map(|q| {
                        let q = quote_plus(q);
                        templates.iter().map(move |t| t.replace("{q}", &q))
                    })
                    .collect()
            }
        }
    }

    fn base_url(&self) -> Result<Url, FetchError> {
        Url::parse(self.base).map_err(|_| FetchError::Shape("career site base url"))
    }

    fn native_id_regex(&self) -> Option<Regex> {
        let pattern = self.native_id?;
        match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("{}: bad id pattern {pattern}: {e}", self.company);
                None
            }
        }
    }

    /// Job-like objects found anywhere in the intercepted payloads.
    pub fn network_postings(&self, payloads: &[Value]) -> Result<Vec<RawPosting>, FetchError> {
        let shape = JobShape::new(self.synonyms, self.base_url()?)
            .detail_fragment(self.detail_fragment)
            .id_template(self.id_template);

        Ok(payloads.iter().flat_map(|p| shape.walk(p)).collect())
    }

    fn is_detail_link(&self, url: &str) -> bool {
        url.contains(self.detail_fragment)
            && !self.skip_link_markers.iter().any(|m| url.contains(m))
    }

    /// Detail-page anchors as postings. Only the first line of the link text
    /// is kept as the title.
    pub fn dom_postings(&self, anchors: Vec<Anchor>) -> Vec<RawPosting> {
        anchors
            .into_iter()
            .filter(|a| self.is_detail_link(&a.url))
            .map(|a| {
                let title = a.text.lines().next().unwrap_or_default().to_string();
                let mut raw = RawPosting::new(title, a.url);
                if let Some(location) = a.location {
                    raw = raw.with_location(location);
                }
                raw
            })
            .collect()
    }

    pub fn pool(&self, network: Vec<RawPosting>, dom: Vec<RawPosting>) -> Vec<RawPosting> {
        match self.dom_merge {
            DomMerge::Supplement => network.into_iter().chain(dom).collect(),
            DomMerge::FallbackOnly if network.is_empty() => dom,
            DomMerge::FallbackOnly => network,
        }
    }

    /// Walks every search page in one browser session. Blocking.
    pub fn harvest(&self, options: BrowserOptions, fast: bool) -> Result<Vec<RawPosting>, FetchError> {
        let base = self.base_url()?;
        let session = BrowserSession::launch(options, self.capture)?;
        let max_loops = session.options().scroll_loops;

        let mut network = Vec::new();
        let mut dom = Vec::new();

        for url in self.search_urls(fast) {
            info!("opening {url}");
            if let Err(e) = session.open(&url) {
                warn!("{}: could not open {url}: {e}", self.company);
                continue;
            }
            if let Some(pattern) = self.consent_pattern
                && session.click_matching("button", pattern)
            {
                debug!("{}: accepted cookie banner", self.company);
                session.pause(0.5);
            }

            session.scroll_until_stable(max_loops, |s| s.click_matching("button", LOAD_MORE));
            session.pause(0.4);

            network.extend(self.network_postings(&session.take_captured())?);
            dom.extend(self.dom_postings(session.anchors(&base, "a[href]", self.card_location)));
            debug!(
                "{}: {} network and {} dom postings so far",
                self.company,
                network.len(),
                dom.len()
            );

            if fast
                && let Some(cap) = self.fast_early_stop
                && network.len() >= cap
            {
                info!("{}: early stop reached in fast mode", self.company);
                break;
            }
        }

        let pool = self.pool(network, dom);
        info!("parsed {} potential {} roles before filtering", pool.len(), self.company);
        if pool.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(pool)
    }
}

pub struct CareerSiteScraper {
    site: &'static CareerSite,
    config: Config,
}

impl CareerSiteScraper {
    pub fn new(site: &'static CareerSite, config: Config) -> Self {
        CareerSiteScraper { site, config }
    }

    pub async fn scrape(&self) -> Vec<JobRecord> {
        let site = self.site;
        info!("scraping {} with a headless browser", site.company);

        let options = BrowserOptions::from_config(&self.config);
        let fast = self.config.fast_mode;
        let harvested = tokio::task::spawn_blocking(move || site.harvest(options, fast)).await;

        let raws = match harvested {
            Ok(Ok(raws)) => raws,
            Ok(Err(e)) => {
                warn!("error while scraping {}: {e}", site.company);
                return Vec::new();
            }
            Err(e) => {
                warn!("{} browser task failed: {e}", site.company);
                return Vec::new();
            }
        };

        let native_id = site.native_id_regex();
        sift_and_log(&self.config, site.target, site.company, raws, native_id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::scraper::fields::DEFAULT_SYNONYMS;

    static SITE: CareerSite = CareerSite {
        target: Target::Apple,
        company: "Example",
        base: "https://jobs.example.com",
        searches: Searches::Queries {
            templates: &[
                "https://jobs.example.com/search?q={q}",
                "https://jobs.example.com/search?team=sw&q={q}",
            ],
            queries: &["software engineer", "new grad"],
            fast_queries: &["new grad"],
        },
        detail_fragment: "/details/",
        capture: CaptureFilter {
            url_contains: &["jobs.example.com"],
            require_json_mime: false,
        },
        synonyms: DEFAULT_SYNONYMS,
        id_template: Some("/details/{id}"),
        native_id: Some(r"/details/(\d+)"),
        dom_merge: DomMerge::FallbackOnly,
        consent_pattern: None,
        skip_link_markers: &["search="],
        card_location: None,
        fast_early_stop: None,
    };

    fn anchor(url: &str, text: &str) -> Anchor {
        Anchor {
            url: url.to_string(),
            text: text.to_string(),
            location: None,
        }
    }

    #[test]
    fn queries_cross_templates() {
        let urls = SITE.search_urls(false);
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0], "https://jobs.example.com/search?q=software+engineer");
        assert_eq!(urls[1], "https://jobs.example.com/search?team=sw&q=software+engineer");
        assert_eq!(SITE.search_urls(true).len(), 2);
    }

    #[test]
    fn dom_keeps_detail_links_only() {
        let raws = SITE.dom_postings(vec![
            anchor("https://jobs.example.com/details/42", "Software Engineer\nCupertino"),
            anchor("https://jobs.example.com/details/?search=engineer", "See all"),
            anchor("https://jobs.example.com/about", "About"),
        ]);
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].title, "Software Engineer");
    }

    #[test]
    fn network_walk_uses_id_template() {
        let payloads = vec![json!({"data": [{"postingTitle": "iOS Engineer", "positionId": 7}]})];
        let raws = SITE.network_postings(&payloads).unwrap();
        assert_eq!(raws[0].url, "https://jobs.example.com/details/7");
    }

    #[test]
    fn fallback_only_prefers_network() {
        let net = vec![RawPosting::new("A", "https://jobs.example.com/details/1")];
        let dom = vec![RawPosting::new("B", "https://jobs.example.com/details/2")];
        assert_eq!(SITE.pool(net.clone(), dom.clone()), net);
        assert_eq!(SITE.pool(Vec::new(), dom.clone()), dom);

        let supplement = CareerSite {
            dom_merge: DomMerge::Supplement,
            ..SITE
        };
        assert_eq!(supplement.pool(net, dom).len(), 2);
    }
}
