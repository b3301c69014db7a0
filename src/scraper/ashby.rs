use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use serde_json::{Map, Value, json};
use url::Url;

use super::{
    fields::{JobShape, Synonyms},
    http::{FetchError, HttpClient, Request},
    Fallback, sift_and_log,
    slugs::board_candidates,
};
use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::config::Config;

pub const BOARD_HOST: &str = "https://jobs.ashbyhq.com";
const POSTING_API: &str = "https://api.ashbyhq.com/posting-api/job-board";
const GRAPHQL_PATH: &str = "/api/non-user-graphql?op=JobBoardWithOpenings";

const JOB_LISTS: [&str; 2] = ["jobs", "jobPostings"];
const GROUP_LISTS: [&str; 5] = ["groups", "sections", "departments", "teams", "categories"];

const ASHBY_FIELDS: Synonyms = Synonyms {
    title: &["title", "jobTitle", "postingTitle"],
    url: &["jobPostUrl", "jobPostingUrl", "jobUrl", "applyUrl", "url"],
    location: &["location", "primaryLocation", "office", "locationName"],
    country: &[],
    posted: &[
        "createdAt",
        "publishedAt",
        "postedAt",
        "openDate",
        "openedAt",
        "updatedAt",
    ],
    id: &["id"],
};

static NEXT_DATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+id="__NEXT_DATA__"[^>]*>(\{.*?\})</script>"#)
        .expect("valid regex")
});

pub struct AshbyScraper {
    config: Config,
    client: HttpClient,
}

impl AshbyScraper {
    pub fn new(config: Config, client: HttpClient) -> Self {
        AshbyScraper { config, client }
    }

    pub async fn scrape(&self, company: &str, slug: &str) -> Vec<JobRecord> {
        info!("scraping {company} (ashby)");

        let mut chain = Fallback::default();
        for candidate in board_candidates(slug, company) {
            debug!("ashby: trying slug '{candidate}'");
            if let Some(raws) = self.fetch_for_slug(&candidate, &mut chain).await {
                if candidate != slug {
                    info!("{company}: fetched using candidate slug '{candidate}'");
                }
                return sift_and_log(&self.config, Target::Ashby, company, raws, None);
            }
        }

        chain.give_up("ashby", company);
        Vec::new()
    }

    /// GET posting API, POST posting API, global GraphQL, per-org GraphQL,
    /// then `__NEXT_DATA__` on the public board pages.
    async fn fetch_for_slug(&self, slug: &str, chain: &mut Fallback) -> Option<Vec<RawPosting>> {
        let board = format!("{BOARD_HOST}/{slug}");
        let org_host = format!("https://{slug}.ashbyhq.com");

        let requests = [
            (
                "ashby get",
                Request::get(format!("{POSTING_API}/{slug}?includeCompensation=true"))
                    .board_origin(BOARD_HOST, &board),
            ),
            (
                "ashby post",
                Request::post_json(POSTING_API, json!({ "organizationSlug": slug }))
                    .board_origin(BOARD_HOST, &board),
            ),
            (
                "ashby graphql",
                Request::post_json(format!("{BOARD_HOST}{GRAPHQL_PATH}"), graphql_payload(slug))
                    .board_origin(BOARD_HOST, &board),
            ),
            (
                "ashby org graphql",
                Request::post_json(format!("{org_host}{GRAPHQL_PATH}"), graphql_payload(slug))
                    .board_origin(&org_host, &format!("{org_host}/{slug}")),
            ),
        ];

        for (label, request) in &requests {
            if let Some(raws) = chain.settle(label, self.fetch_json(request, slug).await) {
                return Some(raws);
            }
        }

        for page in [board.clone(), org_host, format!("{board}/jobs")] {
            let request = Request::get(&page).board_origin(BOARD_HOST, &board);
            if let Some(raws) = chain.settle(&format!("ashby html {page}"), self.fetch_html(&request, slug).await) {
                return Some(raws);
            }
        }

        None
    }

    async fn fetch_json(&self, request: &Request, slug: &str) -> Result<Vec<RawPosting>, FetchError> {
        let payload: Value = self.client.json(request).await?;
        Ok(normalize(&payload, slug))
    }

    async fn fetch_html(&self, request: &Request, slug: &str) -> Result<Vec<RawPosting>, FetchError> {
        let html = self.client.text(request).await?;
        let data = next_data(&html).ok_or(FetchError::Shape("no __NEXT_DATA__"))?;
        let page = data.pointer("/props/pageProps").unwrap_or(&data);
        Ok(normalize(page, slug))
    }
}

pub fn graphql_payload(slug: &str) -> Value {
    json!({
        "operationName": "JobBoardWithOpenings",
        "variables": { "organizationSlug": slug },
        "query": concat!(
            "query JobBoardWithOpenings($organizationSlug: String!) {",
            "  jobBoard(organizationSlug: $organizationSlug) {",
            "    jobs { id title createdAt jobPostUrl location { name } }",
            "    jobPostings { id title createdAt jobPostUrl location { name } }",
            "    groups { name openings { id title createdAt jobPostUrl location { name } } }",
            "  }",
            "}"
        ),
    })
}

/// The Next.js hydration payload of a public board page.
pub fn next_data(html: &str) -> Option<Value> {
    let caps = NEXT_DATA.captures(html)?;
    serde_json::from_str(caps.get(1)?.as_str()).ok()
}

/// Number of jobs across `sections[].jobs` of a hydrated board, `None` when
/// the payload carries no board at all.
pub fn board_job_count(data: &Value) -> Option<usize> {
    let board = data
        .pointer("/props/pageProps/jobBoard")
        .or_else(|| data.get("jobBoard"))
        .filter(|b| b.is_object())?;

    Some(
        board
            .get("sections")
            .and_then(Value::as_array)
            .map(|sections| {
                sections
                    .iter()
                    .filter_map(|s| s.get("jobs").and_then(Value::as_array))
                    .map(Vec::len)
                    .sum()
            })
            .unwrap_or_default(),
    )
}

fn collect_board<'a>(board: &'a Map<String, Value>, out: &mut Vec<&'a Map<String, Value>>) {
    for key in JOB_LISTS {
        if let Some(Value::Array(items)) = board.get(key) {
            out.extend(items.iter().filter_map(Value::as_object));
        }
    }
    for key in GROUP_LISTS {
        let Some(Value::Array(groups)) = board.get(key) else {
            continue;
        };
        for group in groups {
            for inner in ["openings", "jobs"] {
                if let Some(Value::Array(items)) = group.get(inner) {
                    out.extend(items.iter().filter_map(Value::as_object));
                }
            }
        }
    }
}

/// Maps the response shapes Ashby is known to return (posting API, GraphQL,
/// hydrated page props) onto raw postings. Deliberately not recursive.
pub fn normalize(data: &Value, slug: &str) -> Vec<RawPosting> {
    let Some(root) = data.as_object() else {
        return Vec::new();
    };
    let Ok(base) = Url::parse(BOARD_HOST) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for key in JOB_LISTS {
        if let Some(Value::Array(list)) = root.get(key) {
            items.extend(list.iter().filter_map(Value::as_object));
        }
    }
    for key in ["jobBoard", "board"] {
        if let Some(Value::Object(board)) = root.get(key) {
            collect_board(board, &mut items);
        }
    }
    if let Some(Value::Object(board)) = data.pointer("/data/jobBoard") {
        collect_board(board, &mut items);
    }

    let shape = JobShape::new(ASHBY_FIELDS, base).id_template(Some(&format!("/{slug}/{{id}}")));
    items.into_iter().filter_map(|obj| shape.extract(obj)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posting_api_shape() {
        let payload = json!({"jobs": [{
            "title": "Software Engineer, New Grad",
            "jobUrl": "https://jobs.ashbyhq.com/acme/1",
            "location": "San Francisco, CA",
            "publishedAt": "2024-02-01T00:00:00.000+00:00"
        }]});
        let raws = normalize(&payload, "acme");
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].locations, vec!["San Francisco, CA"]);
        assert!(raws[0].posted.is_some());
    }

    #[test]
    fn graphql_groups_and_id_links() {
        let payload = json!({"data": {"jobBoard": {
            "jobs": [],
            "groups": [{"name": "Eng", "openings": [
                {"id": "abc", "title": "Backend Engineer", "location": {"name": "Remote - US"}}
            ]}]
        }}});
        let raws = normalize(&payload, "acme");
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].url, "https://jobs.ashbyhq.com/acme/abc");
        assert_eq!(raws[0].locations, vec!["Remote - US"]);
    }

    #[test]
    fn hydrated_page_and_job_count() {
        let html = r#"<html><script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"jobBoard":{"sections":[{"jobs":[{"title":"A","jobUrl":"/acme/a"},{"title":"B","jobUrl":"/acme/b"}]},{"jobs":[]}]}}}}</script></html>"#;
        let data = next_data(html).unwrap();
        assert_eq!(board_job_count(&data), Some(2));

        let page = data.pointer("/props/pageProps").unwrap();
        let raws = normalize(page, "acme");
        assert_eq!(raws.len(), 2);
        assert_eq!(raws[1].url, "https://jobs.ashbyhq.com/acme/b");
    }

    #[test]
    fn no_board_means_no_count() {
        assert_eq!(board_job_count(&json!({"props": {"pageProps": {}}})), None);
        assert!(normalize(&json!("oops"), "acme").is_empty());
    }
}
