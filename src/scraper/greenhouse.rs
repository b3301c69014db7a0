use log::info;
use serde_json::Value;

use super::{
    fields::{first_str, first_value, location_strings, parse_posted},
    http::{FetchError, HttpClient, Request},
    Fallback, sift_and_log,
};
use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::config::Config;

const BOARD_URLS: [&str; 2] = [
    "https://boards-api.greenhouse.io/v1/boards/{token}/jobs?content=true",
    "https://api.greenhouse.io/v1/boards/{token}/jobs?content=true",
];

pub struct GreenhouseScraper {
    config: Config,
    client: HttpClient,
}

impl GreenhouseScraper {
    pub fn new(config: Config, client: HttpClient) -> Self {
        GreenhouseScraper { config, client }
    }

    pub async fn scrape(&self, company: &str, token: &str) -> Vec<JobRecord> {
        info!("scraping {company} (greenhouse)");

        let mut chain = Fallback::default();
        for template in BOARD_URLS {
            let url = template.replace("{token}", token);
            let result = self.fetch(&url).await;
            if let Some(raws) = chain.settle(&format!("greenhouse {url}"), result) {
                return sift_and_log(&self.config, Target::Greenhouse, company, raws, None);
            }
        }

        chain.give_up("greenhouse", company);
        Vec::new()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<RawPosting>, FetchError> {
        let payload: Value = self.client.json(&Request::get(url)).await?;
        parse_board(&payload)
    }
}

/// Parses a boards-api `jobs` payload. Locations come from `location.name`
/// and every office; the posted date prefers `updated_at`.
pub fn parse_board(payload: &Value) -> Result<Vec<RawPosting>, FetchError> {
    let jobs = payload
        .get("jobs")
        .and_then(Value::as_array)
        .ok_or(FetchError::Shape("greenhouse board without jobs"))?;

    Ok(jobs
        .iter()
        .filter_map(Value::as_object)
        .map(|job| {
            let mut locations = job.get("location").map(location_strings).unwrap_or_default();
            if let Some(offices) = job.get("offices") {
                locations.extend(location_strings(offices));
            }

            let posted = first_value(job, &["updated_at"])
                .and_then(parse_posted)
                .or_else(|| first_value(job, &["created_at"]).and_then(parse_posted));

            RawPosting::new(
                first_str(job, &["title"]).unwrap_or_default(),
                first_str(job, &["absolute_url"]).unwrap_or_default(),
            )
            .with_locations(locations)
            .with_posted(posted)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn board_payload_with_offices() {
        let payload = json!({"jobs": [{
            "id": 1,
            "title": "Software Engineer, New Grad",
            "absolute_url": "https://boards.greenhouse.io/acme/jobs/1",
            "location": {"name": "Remote"},
            "offices": [{"name": "New York"}, {"location": {"name": "Toronto, ON"}}, {"name": "Remote"}],
            "updated_at": "2024-05-01T12:00:00-04:00",
            "created_at": "2024-01-01T00:00:00Z"
        }]});

        let raws = parse_board(&payload).unwrap();
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].locations, vec!["Remote", "New York", "Toronto, ON"]);
        assert_eq!(raws[0].posted, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn missing_jobs_key_is_a_shape_error() {
        assert!(matches!(
            parse_board(&json!({"error": "not found"})),
            Err(FetchError::Shape(_))
        ));
    }
}
