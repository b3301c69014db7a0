//! Workday-hosted portals. The public CXS endpoint is tried first, then the
//! postings inlined in the portal HTML, then a browser session that drives the
//! portal UI and captures the CXS traffic it triggers.

use std::{sync::LazyLock, time::Duration};

use log::{debug, info, warn};
use rand::Rng;
use regex::Regex;
use serde_json::{Deserializer, Value, json};
use url::Url;

use super::{
    browser::{BrowserOptions, BrowserSession, CaptureFilter},
    fields::{first_str, first_value, location_strings},
    http::{FetchError, HttpClient, Request},
    settle, sift_and_log,
};
use crate::classify::CountryFilter;
use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::config::{Config, WorkdayConfig};

static LOCALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[A-Z]{2}$").expect("valid regex"));
static LOCALE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([a-z]{2}-[A-Z]{2})/").expect("valid regex"));
static SLASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/{2,}").expect("valid regex"));
static INLINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""jobPostings"\s*:\s*\["#).expect("valid regex"));
static MAINTENANCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)oops, an error occurred").expect("valid regex"));

const COUNTRY_KEYS: [&str; 5] = [
    "country",
    "countryCode",
    "countryIsoCode",
    "isoAlpha3",
    "addressCountry",
];

const ALT_PORTALS: [&str; 7] = [
    "External",
    "external",
    "Careers",
    "careers",
    "CandidateExperience",
    "candidateExperience",
    "candidateexperience",
];

const SEARCH_INPUTS: [&str; 3] = [
    "[data-automation-id='keywordSearchInput']",
    "input[placeholder*='Search']",
    "input[aria-label*='Search']",
];

const NEXT_BUTTONS: [&str; 5] = [
    "[data-automation-id='searchResultNextButton']",
    "[data-automation-id='navigationPageNext']",
    "button[aria-label*='Next']",
    "button[title*='Next']",
    "[data-uxi-widget='pagination'] button:last-child",
];

const REMOTE_LABELS: &str = r"virtual us|us,?\s*virtual|remote\s*-\s*united states|united states\s*-\s*remote";

/// A parsed portal base URL such as
/// `https://acme.wd5.myworkdayjobs.com/en-US/External`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
    pub host: String,
    pub locale: String,
    pub portal: String,
    pub tenant: String,
    path: String,
}

impl Portal {
    pub fn parse(base_url: &str) -> Result<Self, FetchError> {
        let url = Url::parse(base_url.trim()).map_err(|_| FetchError::Shape("workday portal url"))?;
        let host = url
            .host_str()
            .ok_or(FetchError::Shape("workday portal host"))?
            .to_string();
        let parts: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        let (first, portal) = match (parts.first(), parts.last()) {
            (Some(first), Some(last)) => (*first, last.to_string()),
            _ => return Err(FetchError::Shape("workday portal path")),
        };

        let locale = if LOCALE.is_match(first) {
            first.to_string()
        } else {
            "en-US".to_string()
        };
        let tenant = host.split('.').next().unwrap_or_default().to_lowercase();

        Ok(Portal {
            path: url.path().trim_end_matches('/').to_string(),
            host,
            locale,
            portal,
            tenant,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("https://{}/wday/cxs/{}/{}/jobs", self.host, self.tenant, self.portal)
    }

    pub fn origin(&self) -> String {
        format!("https://{}", self.host)
    }

    pub fn referer(&self) -> String {
        format!("https://{}{}", self.host, self.path)
    }

    fn board_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.locale, self.portal)
    }

    /// Up to `max` portal URLs on the same host, starting with the
    /// configured portal's own spellings.
    pub fn alternates(&self, max: usize) -> Vec<String> {
        let mut capitalized = self.portal.to_lowercase();
        if let Some(first) = capitalized.get(..1) {
            capitalized = format!("{}{}", first.to_uppercase(), &capitalized[1..]);
        }
        let mut names: Vec<String> = vec![self.portal.clone(), self.portal.to_lowercase(), capitalized];
        names.extend(ALT_PORTALS.iter().map(|p| p.to_string()));

        let mut urls: Vec<String> = Vec::new();
        for name in names {
            let url = format!("https://{}/{}/{}", self.host, self.locale, name);
            if !urls.contains(&url) {
                urls.push(url);
            }
            if urls.len() >= max {
                break;
            }
        }
        urls
    }

    /// Absolute detail URL for a posting. A full `external` URL wins;
    /// otherwise the relative path gets the locale and portal it lacks.
    pub fn compose_url(&self, path_part: &str, external: Option<&str>) -> Option<String> {
        if let Some(external) = external
            && external.starts_with("http")
        {
            return Some(external.to_string());
        }

        let mut path = path_part.trim().to_string();
        if path.is_empty() {
            return None;
        }
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        let tenant_prefix = format!("/{}/", self.tenant);
        if path.starts_with(&tenant_prefix) {
            path = path[tenant_prefix.len() - 1..].to_string();
        }
        if !LOCALE_PREFIX.is_match(&path) {
            path = format!("/{}{path}", self.locale);
        }
        if !path.contains(&format!("/{}/", self.portal)) {
            let portal = &self.portal;
            path = LOCALE_PREFIX
                .replace(&path, |caps: &regex::Captures| format!("/{}/{portal}/", &caps[1]))
                .into_owned();
        }
        let path = SLASHES.replace_all(&path, "/");

        Some(format!("https://{}{}", self.host, path))
    }
}

fn country_code(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }
    Some(match upper.as_str() {
        "US" | "USA" | "UNITED STATES" | "UNITED STATES OF AMERICA" => "US".to_string(),
        "CA" | "CAN" | "CANADA" => "CA".to_string(),
        other if other.starts_with("US") => "US".to_string(),
        other if other.starts_with("CA") => "CA".to_string(),
        other => other.to_string(),
    })
}

/// Normalizes CXS `jobPostings` into raw postings. Structured country fields
/// on `locations[]` are recorded ahead of `locationsText`.
pub fn parse_postings(portal: &Portal, postings: &[Value]) -> Vec<RawPosting> {
    postings
        .iter()
        .filter_map(Value::as_object)
        .map(|posting| {
            let path_part = first_str(posting, &["externalPath", "externalUrl"]).unwrap_or_default();
            let external = first_str(posting, &["url", "externalUrl"]);
            let url = portal
                .compose_url(&path_part, external.as_deref())
                .unwrap_or_default();

            let locations = first_value(posting, &["locationsText", "locations"])
                .map(location_strings)
                .unwrap_or_default();
            let mut raw = RawPosting::new(first_str(posting, &["title"]).unwrap_or_default(), url)
                .with_locations(locations);

            if let Some(Value::Array(structured)) = posting.get("locations") {
                for code in structured
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(|loc| first_str(loc, &COUNTRY_KEYS))
                    .filter_map(|c| country_code(&c))
                {
                    raw = raw.with_country(code);
                }
            }
            raw
        })
        .collect()
}

/// Postings embedded in the portal HTML as a `"jobPostings": [...]` blob.
pub fn inlined_postings(html: &str) -> Result<Vec<Value>, FetchError> {
    let found = INLINED.find(html).ok_or(FetchError::Shape("no inlined jobPostings"))?;
    let start = found.end() - 1;
    let mut stream = Deserializer::from_str(&html[start..]).into_iter::<Vec<Value>>();
    match stream.next() {
        Some(Ok(postings)) => Ok(postings),
        Some(Err(e)) => Err(e.into()),
        None => Err(FetchError::Empty),
    }
}

fn cxs_payloads(limit: usize, offset: usize) -> [Value; 2] {
    [
        json!({"limit": limit, "offset": offset, "searchText": ""}),
        json!({"appliedFacets": {}, "limit": limit, "offset": offset, "searchText": ""}),
    ]
}

fn postings_of(payload: &Value) -> Vec<Value> {
    payload
        .get("jobPostings")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn facet_pattern(countries: &CountryFilter) -> String {
    let mut names = Vec::new();
    if countries.permits("US") {
        names.push("united states( of america)?|usa");
    }
    if countries.permits("CA") {
        names.push("canada");
    }
    names.push(REMOTE_LABELS);
    format!("^({})", names.join("|"))
}

pub struct WorkdayScraper {
    config: Config,
    client: HttpClient,
}

impl WorkdayScraper {
    pub fn new(config: Config, client: HttpClient) -> Self {
        WorkdayScraper { config, client }
    }

    fn settings(&self) -> &WorkdayConfig {
        &self.config.workday
    }

    fn cap(&self) -> Option<usize> {
        self.config.fast_mode.then_some(self.settings().fast_cap)
    }

    pub async fn scrape(&self, company: &str, base_url: &str) -> Vec<JobRecord> {
        info!("scraping workday for {company}");

        let portal = match Portal::parse(base_url) {
            Ok(portal) => portal,
            Err(e) => {
                warn!("could not parse portal for {company}: {e}");
                return Vec::new();
            }
        };
        if self.settings().skip_tenants.contains(&portal.tenant) {
            info!("skipping tenant {} (skip list)", portal.tenant);
            return Vec::new();
        }

        let mut postings = settle("workday cxs api", self.fetch_cxs(&portal).await);
        if postings.is_none() {
            postings = settle("workday html inline", self.fetch_inlined(&portal).await);
        }
        if postings.is_none() {
            postings = settle("workday browser", self.fetch_browser(&portal).await);
        }

        let Some(mut postings) = postings else {
            warn!("no workday postings for {company}");
            return Vec::new();
        };
        if let Some(cap) = self.cap() {
            postings.truncate(cap);
        }
        sift_and_log(&self.config, Target::Workday, company, postings, None)
    }

    async fn post_page(&self, portal: &Portal, offset: usize) -> Result<Value, FetchError> {
        let endpoint = portal.endpoint();
        let urls = [endpoint.clone(), format!("{endpoint}?sourceLocale=en-US")];
        let mut last = FetchError::Empty;

        for body in cxs_payloads(self.settings().page_limit, offset) {
            for url in &urls {
                let request = Request::post_json(url.as_str(), body.clone())
                    .header("Content-Type", "application/json;charset=UTF-8")
                    .board_origin(&portal.origin(), &portal.referer());
                match self.client.json::<Value>(&request).await {
                    Ok(page) => return Ok(page),
                    Err(e) => {
                        debug!("workday cxs {url}: {e}");
                        last = e;
                    }
                }
            }
        }
        Err(last)
    }

    async fn fetch_cxs(&self, portal: &Portal) -> Result<Vec<RawPosting>, FetchError> {
        let mut postings = Vec::new();
        let mut offset = 0;

        for page in 0..self.settings().max_pages {
            let payload = match self.post_page(portal, offset).await {
                Ok(payload) => payload,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    debug!("workday pagination stopped at offset {offset}: {e}");
                    break;
                }
            };
            let batch = postings_of(&payload);
            if batch.is_empty() {
                break;
            }
            offset += batch.len();
            postings.extend(batch);

            if self.cap().is_some_and(|cap| postings.len() >= cap) {
                break;
            }
            let jitter = rand::thread_rng().gen_range(120..350);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
        }

        Ok(parse_postings(portal, &postings))
    }

    async fn fetch_inlined(&self, portal: &Portal) -> Result<Vec<RawPosting>, FetchError> {
        let url = portal.board_url();
        let request = Request::get(url.as_str())
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Referer", url.clone());
        let html = self.client.text(&request).await?;
        Ok(parse_postings(portal, &inlined_postings(&html)?))
    }

    async fn fetch_browser(&self, portal: &Portal) -> Result<Vec<RawPosting>, FetchError> {
        let options = BrowserOptions::from_config(&self.config);
        let query = self.settings().force_query.clone();
        let facets = facet_pattern(&self.config.policy(Target::Workday).countries);
        let portal = portal.clone();

        let harvested = tokio::task::spawn_blocking(move || {
            browse(&portal, options, &query, &facets).map(|values| parse_postings(&portal, &values))
        })
        .await;

        match harvested {
            Ok(result) => result,
            Err(e) => Err(FetchError::Browser(e.to_string())),
        }
    }
}

fn is_maintenance(session: &BrowserSession) -> bool {
    if session.current_url().contains("community.workday.com/maintenance-page") {
        return true;
    }
    session.html().is_ok_and(|html| MAINTENANCE.is_match(&html))
}

/// Gets results on screen: cookie banner, "view all jobs", a typed search.
fn kick_results(session: &BrowserSession, query: &str) {
    if session.click_matching("button", r"^(accept( all| cookies)?|i accept)") {
        session.pause(0.3);
    }
    if session.click_matching("a, button", r"^(view|see|show|explore) all jobs") {
        session.pause(1.0);
    }
    if session.type_into(&SEARCH_INPUTS, query) {
        debug!("typed search query '{query}'");
    }
    session.click_matching("button", r"^search$");
    session.pause(0.8);
}

/// Opens the country and location facets and ticks the allowed labels.
fn apply_facets(session: &BrowserSession, pattern: &str) {
    let mut ticked = 0;
    for header in [r"^countr(y|ies)", r"^locations?$", r"^(state|province)"] {
        if session.click_matching("button, summary, [role='button']", header) {
            session.pause(0.4);
            ticked += session.click_all_matching(
                "label, [role='checkbox'], [role='option']",
                pattern,
                200,
            );
        }
    }
    debug!("facet clicks: {ticked}");
    if ticked > 0 && session.click_matching("button", r"^(apply|view jobs|show results)") {
        session.pause(1.0);
    }
}

fn browse(portal: &Portal, options: BrowserOptions, query: &str, facets: &str) -> Result<Vec<Value>, FetchError> {
    let session = BrowserSession::launch(
        options,
        CaptureFilter {
            url_contains: &["/wday/cxs/"],
            require_json_mime: false,
        },
    )?;
    let max_loops = session.options().scroll_loops;
    let base = Url::parse(&portal.origin()).map_err(|_| FetchError::Shape("workday origin"))?;

    for url in portal.alternates(3) {
        info!("opening {url}");
        if let Err(e) = session.open(&url) {
            warn!("could not open {url}: {e}");
            continue;
        }
        if is_maintenance(&session) {
            debug!("maintenance or error page at {url}");
            continue;
        }

        kick_results(&session, query);
        apply_facets(&session, facets);
        session.scroll_until_stable(max_loops, |s| {
            let clicked = s.click_first(&NEXT_BUTTONS);
            if clicked {
                s.pause(0.8);
            }
            clicked
        });

        let captured: Vec<Value> = session.take_captured().iter().flat_map(postings_of).collect();
        if !captured.is_empty() {
            return Ok(captured);
        }
        if is_maintenance(&session) {
            continue;
        }

        let dom: Vec<Value> = session
            .anchors(&base, "a[data-automation-id='jobTitle'], a[href*='/job/']", None)
            .into_iter()
            .filter(|a| a.url.contains("/job/"))
            .map(|a| json!({"title": a.text, "url": a.url}))
            .collect();
        if !dom.is_empty() {
            return Ok(dom);
        }
    }

    Err(FetchError::Empty)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn acme() -> Portal {
        Portal::parse("https://acme.wd5.myworkdayjobs.com/en-US/External").unwrap()
    }

    #[test]
    fn portal_parts() {
        let portal = acme();
        assert_eq!(portal.tenant, "acme");
        assert_eq!(portal.locale, "en-US");
        assert_eq!(portal.portal, "External");
        assert_eq!(
            portal.endpoint(),
            "https://acme.wd5.myworkdayjobs.com/wday/cxs/acme/External/jobs"
        );
        assert_eq!(portal.referer(), "https://acme.wd5.myworkdayjobs.com/en-US/External");

        let bare = Portal::parse("https://intel.wd1.myworkdayjobs.com/External").unwrap();
        assert_eq!(bare.locale, "en-US");
        assert!(Portal::parse("https://acme.wd5.myworkdayjobs.com/").is_err());
    }

    #[test]
    fn alternates_start_with_configured_portal() {
        let urls = acme().alternates(3);
        assert_eq!(
            urls,
            vec![
                "https://acme.wd5.myworkdayjobs.com/en-US/External",
                "https://acme.wd5.myworkdayjobs.com/en-US/external",
                "https://acme.wd5.myworkdayjobs.com/en-US/Careers",
            ]
        );
    }

    #[test]
    fn detail_urls_gain_locale_and_portal() {
        let portal = acme();
        assert_eq!(
            portal.compose_url("/job/Austin-TX/Software-Engineer_R123", None).as_deref(),
            Some("https://acme.wd5.myworkdayjobs.com/en-US/External/job/Austin-TX/Software-Engineer_R123")
        );
        assert_eq!(
            portal.compose_url("/acme/job/X_R1", None).as_deref(),
            Some("https://acme.wd5.myworkdayjobs.com/en-US/External/job/X_R1")
        );
        assert_eq!(
            portal.compose_url("", Some("https://elsewhere.test/job/1")).as_deref(),
            Some("https://elsewhere.test/job/1")
        );
        assert_eq!(portal.compose_url("  ", None), None);
    }

    #[test]
    fn structured_countries_are_recorded() {
        let postings = vec![
            json!({"title": "Software Engineer", "externalPath": "/job/Toronto/SE_R1",
                   "locationsText": "Toronto", "locations": [{"country": "CAN"}]}),
            json!({"title": "Firmware Engineer", "externalPath": "/job/Austin/FE_R2",
                   "locationsText": "2 Locations"}),
        ];
        let raws = parse_postings(&acme(), &postings);
        assert_eq!(raws[0].countries, vec!["CA"]);
        assert_eq!(raws[0].locations, vec!["Toronto"]);
        assert!(raws[1].countries.is_empty());
    }

    #[test]
    fn inlined_postings_survive_nested_braces() {
        let html = r#"<script>window.__data = {"total": 2, "jobPostings": [
            {"title": "SE", "externalPath": "/job/a", "bulletFields": ["R1"]},
            {"title": "QA Engineer", "externalPath": "/job/b", "meta": {"x": [1, {"y": 2}]}}
        ], "facets": []};</script>"#;
        let postings = inlined_postings(html).unwrap();
        assert_eq!(postings.len(), 2);
        assert!(inlined_postings("<html></html>").is_err());
    }

    #[test]
    fn facet_pattern_follows_country_filter() {
        let pattern = facet_pattern(&CountryFilter::parse("CA"));
        let re = Regex::new(&format!("(?i){pattern}")).unwrap();
        assert!(re.is_match("Canada"));
        assert!(!re.is_match("United States of America"));
        assert!(re.is_match("Virtual US"));
    }
}
