use std::sync::LazyLock;

use log::info;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use super::{
    fields::{first_str, first_value, location_strings, parse_posted, resolve_url},
    http::{FetchError, HttpClient, Request},
    Fallback, sift_and_log,
};
use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::config::Config;

const BOARD_HOST: &str = "https://jobs.lever.co";

static COUNTRYISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:US|USA|United States|Canada|UK|Germany|France|India|Japan)\b")
        .expect("valid regex")
});

pub struct LeverScraper {
    config: Config,
    client: HttpClient,
}

impl LeverScraper {
    pub fn new(config: Config, client: HttpClient) -> Self {
        LeverScraper { config, client }
    }

    pub async fn scrape(&self, company: &str, token: &str) -> Vec<JobRecord> {
        info!("scraping {company} (lever)");

        let mut chain = Fallback::default();
        let found = match chain.settle("lever api", self.fetch_api(token).await) {
            Some(raws) => Some(raws),
            None => chain.settle("lever html", self.fetch_html(token).await),
        };

        match found {
            Some(raws) => sift_and_log(&self.config, Target::Lever, company, raws, None),
            None => {
                chain.give_up("lever", company);
                Vec::new()
            }
        }
    }

    async fn fetch_api(&self, token: &str) -> Result<Vec<RawPosting>, FetchError> {
        let url = format!("https://api.lever.co/v0/postings/{token}?mode=json");
        let payload: Value = self.client.json(&Request::get(url)).await?;
        parse_postings(&payload)
    }

    async fn fetch_html(&self, token: &str) -> Result<Vec<RawPosting>, FetchError> {
        let html = self
            .client
            .text(&Request::get(format!("{BOARD_HOST}/{token}")))
            .await?;
        parse_board_html(&html)
    }
}

/// Parses the `?mode=json` postings list.
pub fn parse_postings(payload: &Value) -> Result<Vec<RawPosting>, FetchError> {
    let postings = payload
        .as_array()
        .ok_or(FetchError::Shape("lever api did not return a list"))?;
    let base = Url::parse(BOARD_HOST).map_err(|_| FetchError::Shape("lever host"))?;

    Ok(postings
        .iter()
        .filter_map(Value::as_object)
        .map(|posting| {
            let url = first_str(posting, &["hostedUrl", "applyUrl"])
                .and_then(|href| resolve_url(&base, &href))
                .unwrap_or_default();

            let mut locations = Vec::new();
            if let Some(Value::Object(categories)) = posting.get("categories") {
                if let Some(location) = first_value(categories, &["location"]) {
                    locations.extend(location_strings(location));
                }
                if let Some(all) = first_value(categories, &["allLocations"]) {
                    locations.extend(location_strings(all));
                }
            }

            RawPosting::new(first_str(posting, &["text", "title"]).unwrap_or_default(), url)
                .with_locations(locations)
                .with_posted(first_value(posting, &["createdAt"]).and_then(parse_posted))
        })
        .collect())
}

/// Parses the public `jobs.lever.co/{token}` board.
pub fn parse_board_html(html: &str) -> Result<Vec<RawPosting>, FetchError> {
    let selector = |css: &'static str| Selector::parse(css).map_err(|_| FetchError::Shape("selector"));
    let posting_sel = selector("div.posting")?;
    let title_sel = selector("h5, h4, .posting-title")?;
    let link_sel = selector("a.posting-title, a[href]")?;
    let base = Url::parse(BOARD_HOST).map_err(|_| FetchError::Shape("lever host"))?;

    let document = Html::parse_document(html);
    let postings: Vec<RawPosting> = document
        .select(&posting_sel)
        .map(|posting| {
            let title = posting
                .select(&title_sel)
                .next()
                .map(|el| text_of(el))
                .unwrap_or_default();
            let url = posting
                .select(&link_sel)
                .find_map(|el| el.value().attr("href"))
                .and_then(|href| resolve_url(&base, href))
                .unwrap_or_default();

            RawPosting::new(title, url).with_location(html_location(posting))
        })
        .collect();

    if postings.is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(postings)
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `span.sort-by-location` when present, else the first category span that
/// reads like a place, else every category joined.
fn html_location(posting: ElementRef<'_>) -> String {
    if let Ok(sel) = Selector::parse("span.sort-by-location")
        && let Some(el) = posting.select(&sel).next()
    {
        let text = text_of(el);
        if !text.is_empty() {
            return text;
        }
    }

    let Ok(sel) = Selector::parse("div.posting-categories span") else {
        return String::new();
    };
    let categories: Vec<String> = posting
        .select(&sel)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();

    categories
        .iter()
        .find(|t| t.to_lowercase().contains("remote") || t.contains(',') || COUNTRYISH.is_match(t))
        .cloned()
        .unwrap_or_else(|| categories.join(" • "))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn api_postings() {
        let payload = json!([{
            "text": "Graduate Software Engineer",
            "hostedUrl": "https://jobs.lever.co/acme/abc-123",
            "categories": {"location": "Toronto, ON", "allLocations": ["Toronto, ON", "Remote - Canada"]},
            "createdAt": 1714564800000_i64
        }]);

        let raws = parse_postings(&payload).unwrap();
        assert_eq!(raws[0].title, "Graduate Software Engineer");
        assert_eq!(raws[0].locations, vec!["Toronto, ON", "Remote - Canada"]);
        assert_eq!(raws[0].posted, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn html_board_with_category_heuristic() {
        let html = r#"
            <div class="posting">
              <a class="posting-title" href="/acme/1"><h5>Software Engineer I</h5></a>
              <div class="posting-categories"><span>Engineering</span><span>Austin, TX</span></div>
            </div>
            <div class="posting">
              <a class="posting-title" href="https://jobs.lever.co/acme/2"><h5>Backend Engineer</h5></a>
              <span class="sort-by-location">Remote - US</span>
            </div>"#;

        let raws = parse_board_html(html).unwrap();
        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].url, "https://jobs.lever.co/acme/1");
        assert_eq!(raws[0].locations, vec!["Austin, TX"]);
        assert_eq!(raws[1].locations, vec!["Remote - US"]);
    }

    #[test]
    fn empty_html_board_is_empty() {
        assert!(matches!(parse_board_html("<html></html>"), Err(FetchError::Empty)));
    }
}
