use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use serde_json::Value;
use url::Url;

use super::{
    fields::{first_str, location_strings},
    http::{FetchError, HttpClient, Request},
    sift_and_log,
};
use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::config::Config;

const SEARCH_API: &str = "https://careers.google.com/api/v3/search/";
const QUERIES: [&str; 2] = ["university graduate", "early career"];
const MAX_PAGES: usize = 40;

pub struct GoogleScraper {
    config: Config,
    client: HttpClient,
}

impl GoogleScraper {
    pub fn new(config: Config, client: HttpClient) -> Self {
        GoogleScraper { config, client }
    }

    pub async fn scrape(&self) -> Vec<JobRecord> {
        info!("scraping google careers");
        let mut raws = Vec::new();

        for query in QUERIES {
            for page in 1..=MAX_PAGES {
                match self.fetch_page(query, page).await {
                    Ok(found) if found.is_empty() => break,
                    Ok(found) => {
                        debug!("google '{query}' page {page}: {} postings", found.len());
                        raws.extend(found);
                    }
                    Err(e) => {
                        warn!("google '{query}' page {page} failed: {e}");
                        break;
                    }
                }
                let jitter = rand::thread_rng().gen_range(200..600);
                tokio::time::sleep(Duration::from_millis(jitter)).await;
            }
        }

        if raws.is_empty() {
            warn!("google search returned nothing");
            return Vec::new();
        }
        sift_and_log(&self.config, Target::Google, "Google", raws, None)
    }

    async fn fetch_page(&self, query: &str, page: usize) -> Result<Vec<RawPosting>, FetchError> {
        let url = search_url(query, page)?;
        let payload: Value = self.client.json(&Request::get(url)).await?;
        parse_page(&payload)
    }
}

fn search_url(query: &str, page: usize) -> Result<String, FetchError> {
    let mut url = Url::parse(SEARCH_API).map_err(|_| FetchError::Shape("google search url"))?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("page", &page.to_string());
    Ok(url.into())
}

/// One page of the v3 search API. An empty `jobs` list ends pagination.
pub fn parse_page(payload: &Value) -> Result<Vec<RawPosting>, FetchError> {
    let jobs = payload
        .get("jobs")
        .and_then(Value::as_array)
        .ok_or(FetchError::Shape("google page without jobs"))?;

    Ok(jobs
        .iter()
        .filter_map(Value::as_object)
        .map(|job| {
            let id = first_str(job, &["id"]).unwrap_or_default();
            let id = id.rsplit('/').next().unwrap_or_default();
            let url = if id.is_empty() {
                String::new()
            } else {
                format!("https://careers.google.com/jobs/results/{id}/")
            };
            let locations = job
                .get("locations")
                .map(location_strings)
                .unwrap_or_default();

            RawPosting::new(first_str(job, &["title"]).unwrap_or_default(), url)
                .with_locations(locations)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn page_builds_result_urls_and_locations() {
        let payload = json!({"jobs": [
            {"id": "jobs/123456", "title": "Software Engineer, University Graduate",
             "locations": [{"display": "Mountain View, CA, USA"}, {"display": "Toronto, ON, Canada"}]},
            {"title": "No id here", "locations": []}
        ]});

        let raws = parse_page(&payload).unwrap();
        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].url, "https://careers.google.com/jobs/results/123456/");
        assert_eq!(
            raws[0].locations,
            vec!["Mountain View, CA, USA", "Toronto, ON, Canada"]
        );
        assert!(raws[1].url.is_empty());
    }

    #[test]
    fn empty_page_is_empty_not_error() {
        assert!(parse_page(&json!({"jobs": []})).unwrap().is_empty());
        assert!(parse_page(&json!({"count": 0})).is_err());
    }

    #[test]
    fn query_is_form_encoded() {
        assert_eq!(
            search_url("early career", 2).unwrap(),
            "https://careers.google.com/api/v3/search/?q=early+career&page=2"
        );
    }
}
