//! Guesses which ATS hosts a company when its configured board yields
//! nothing. Every probe is a single short request; the answer is provisional.

use std::{sync::LazyLock, time::Duration};

use log::{debug, info};
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::{
    ashby::{BOARD_HOST, board_job_count, next_data},
    http::{HttpClient, Probe, Request},
    slugs::resolver_variants,
};
use crate::models::target::Target;
use crate::utils::config::Config;

static SUBDOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));

/// What a probe learned about a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Missing,
    Jobs(usize),
    /// The board answered but its job count could not be read.
    Unknown,
}

impl Presence {
    pub fn exists(self) -> bool {
        self != Presence::Missing
    }

    fn has_jobs(self) -> bool {
        matches!(self, Presence::Jobs(n) if n > 0)
    }
}

pub fn greenhouse_presence(probe: &Probe) -> Presence {
    if probe.status != 200 {
        return Presence::Missing;
    }
    let jobs = serde_json::from_str::<Value>(&probe.body)
        .ok()
        .and_then(|data| data.get("jobs").and_then(Value::as_array).map(Vec::len))
        .unwrap_or_default();
    Presence::Jobs(jobs)
}

/// A hydrated Ashby page gives a count; a bare 200 shell counts as
/// `Unknown` only when `treat_200_as_exists` is set.
pub fn ashby_page_presence(probe: &Probe, treat_200_as_exists: bool) -> Presence {
    if probe.status != 200 {
        return Presence::Missing;
    }
    match next_data(&probe.body).as_ref().and_then(board_job_count) {
        Some(jobs) => Presence::Jobs(jobs),
        None if treat_200_as_exists => Presence::Unknown,
        None => Presence::Missing,
    }
}

pub fn posting_api_presence(probe: &Probe) -> Presence {
    if probe.status != 200 {
        return Presence::Missing;
    }
    let Ok(data) = serde_json::from_str::<Value>(&probe.body) else {
        return Presence::Missing;
    };
    board_job_count(&data)
        .or_else(|| data.get("jobs").and_then(Value::as_array).map(Vec::len))
        .map_or(Presence::Missing, Presence::Jobs)
}

/// Lever boards only count when they list at least one posting.
pub fn lever_presence(probe: &Probe) -> Presence {
    if probe.status != 200 {
        return Presence::Missing;
    }
    match serde_json::from_str::<Value>(&probe.body) {
        Ok(Value::Array(postings)) if !postings.is_empty() => Presence::Jobs(postings.len()),
        _ => Presence::Missing,
    }
}

/// Greenhouse with jobs, then Ashby with jobs or an unknown count, then an
/// empty Greenhouse board.
pub fn pick(greenhouse: Presence, ashby: Presence) -> Option<Target> {
    if greenhouse.has_jobs() {
        Some(Target::Greenhouse)
    } else if ashby.has_jobs() || ashby == Presence::Unknown {
        Some(Target::Ashby)
    } else if greenhouse.exists() {
        Some(Target::Greenhouse)
    } else {
        None
    }
}

pub struct Resolver {
    config: Config,
    client: HttpClient,
}

impl Resolver {
    pub fn new(config: Config, client: HttpClient) -> Self {
        Resolver { config, client }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.selfheal.probe_timeout_secs)
    }

    async fn get(&self, url: &str) -> Option<Probe> {
        match self.client.probe(&Request::get(url).timeout(self.timeout())).await {
            Ok(probe) => {
                debug!("probe {url}: {}", probe.status);
                Some(probe)
            }
            Err(e) => {
                debug!("probe {url} failed: {e}");
                None
            }
        }
    }

    async fn greenhouse(&self, slug: &str) -> Presence {
        for host in ["boards-api.greenhouse.io", "api.greenhouse.io"] {
            let url = format!("https://{host}/v1/boards/{slug}/jobs?content=true");
            if let Some(probe) = self.get(&url).await {
                let presence = greenhouse_presence(&probe);
                if presence.exists() {
                    return presence;
                }
            }
        }
        Presence::Missing
    }

    async fn ashby_light(&self, slug: &str) -> Presence {
        let Ok(mut board) = Url::parse(BOARD_HOST) else {
            return Presence::Missing;
        };
        if let Ok(mut segments) = board.path_segments_mut() {
            segments.push(slug);
        }
        let board = board.to_string();

        let mut answered = false;
        for url in [board.clone(), format!("{board}/jobs")] {
            let Some(probe) = self.get(&url).await else {
                continue;
            };
            answered |= probe.status == 200;
            if let presence @ Presence::Jobs(_) = ashby_page_presence(&probe, false) {
                return presence;
            }
        }

        if answered && self.config.selfheal.ashby_200_ok {
            Presence::Unknown
        } else {
            Presence::Missing
        }
    }

    async fn ashby_subdomain(&self, slug: &str) -> Presence {
        let slug = slug.to_lowercase();
        if !SUBDOMAIN.is_match(&slug) {
            return Presence::Missing;
        }
        let host = format!("{slug}.ashbyhq.com");
        if tokio::net::lookup_host((host.as_str(), 443)).await.is_err() {
            debug!("no dns record for {host}");
            return Presence::Missing;
        }
        match self.get(&format!("https://{host}")).await {
            Some(probe) => ashby_page_presence(&probe, self.config.selfheal.ashby_200_ok),
            None => Presence::Missing,
        }
    }

    async fn posting_api(&self, slug: &str) -> Presence {
        let url = format!("https://api.ashbyhq.com/posting-api/job-board/{slug}?includeCompensation=true");
        self.get(&url)
            .await
            .map_or(Presence::Missing, |probe| posting_api_presence(&probe))
    }

    async fn lever(&self, slug: &str) -> Presence {
        let url = format!("https://api.lever.co/v0/postings/{slug}?mode=json");
        self.get(&url)
            .await
            .map_or(Presence::Missing, |probe| lever_presence(&probe))
    }

    /// Provider and slug to scrape `company` with, if any probe answers.
    pub async fn resolve(&self, company: &str, slug: &str) -> Option<(Target, String)> {
        let settings = &self.config.selfheal;

        for candidate in resolver_variants(company, slug) {
            let greenhouse = self.greenhouse(&candidate).await;
            let mut ashby = self.ashby_light(&candidate).await;
            if !ashby.exists() {
                ashby = self.ashby_subdomain(&candidate).await;
            }

            if let Some(target) = pick(greenhouse, ashby) {
                info!("self-heal {company}: {target} (slug={candidate}, greenhouse={greenhouse:?}, ashby={ashby:?})");
                return Some((target, candidate));
            }

            if settings.use_posting_api && self.posting_api(&candidate).await.exists() {
                info!("self-heal {company}: ashby via posting api (slug={candidate})");
                return Some((Target::Ashby, candidate));
            }

            if settings.try_lever {
                let lever = self.lever(&candidate).await;
                if lever.exists() {
                    info!("self-heal {company}: lever (slug={candidate}, {lever:?})");
                    return Some((Target::Lever, candidate));
                }
            }
        }

        info!("self-heal {company}: no ats found for slug={slug}");
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn probe(status: u16, body: &str) -> Probe {
        Probe {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn selection_priority() {
        use Presence::*;
        assert_eq!(pick(Jobs(3), Jobs(9)), Some(Target::Greenhouse));
        assert_eq!(pick(Jobs(0), Jobs(2)), Some(Target::Ashby));
        assert_eq!(pick(Jobs(0), Unknown), Some(Target::Ashby));
        assert_eq!(pick(Jobs(0), Jobs(0)), Some(Target::Greenhouse));
        assert_eq!(pick(Missing, Jobs(0)), None);
        assert_eq!(pick(Missing, Missing), None);
    }

    #[test]
    fn greenhouse_counts_jobs_on_200_only() {
        assert_eq!(greenhouse_presence(&probe(200, r#"{"jobs": [{}, {}]}"#)), Presence::Jobs(2));
        assert_eq!(greenhouse_presence(&probe(200, "not json")), Presence::Jobs(0));
        assert_eq!(greenhouse_presence(&probe(404, "")), Presence::Missing);
    }

    #[test]
    fn ashby_shell_pages() {
        let hydrated = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"jobBoard":{"sections":[{"jobs":[{},{}]}]}}}}</script>"#;
        assert_eq!(ashby_page_presence(&probe(200, hydrated), false), Presence::Jobs(2));
        assert_eq!(ashby_page_presence(&probe(200, "<div id=root>"), true), Presence::Unknown);
        assert_eq!(ashby_page_presence(&probe(200, "<div id=root>"), false), Presence::Missing);
        assert_eq!(ashby_page_presence(&probe(404, hydrated), true), Presence::Missing);
    }

    #[test]
    fn lever_needs_postings() {
        assert_eq!(lever_presence(&probe(200, "[{}]")), Presence::Jobs(1));
        assert_eq!(lever_presence(&probe(200, "[]")), Presence::Missing);
        assert_eq!(lever_presence(&probe(200, r#"{"ok":false}"#)), Presence::Missing);
    }

    #[test]
    fn posting_api_accepts_either_shape() {
        assert_eq!(posting_api_presence(&probe(200, r#"{"jobs":[{}]}"#)), Presence::Jobs(1));
        assert_eq!(
            posting_api_presence(&probe(200, r#"{"jobBoard":{"sections":[]}}"#)),
            Presence::Jobs(0)
        );
        assert_eq!(posting_api_presence(&probe(200, "{}")), Presence::Missing);
    }
}
