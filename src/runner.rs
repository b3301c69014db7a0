//! Drives one pass: every enabled adapter in a fixed order, the optional
//! self-heal pass, then reconciliation against the seen-set.

use std::{collections::BTreeSet, path::PathBuf};

use eyre::Result;
use log::{info, warn};

use crate::models::{
    job::JobRecord,
    target::{Target, TargetSelection},
};
use crate::report::{Notifier, ReportSink};
use crate::scraper::{
    amazon, apple, ashby::AshbyScraper, google::GoogleScraper, greenhouse::GreenhouseScraper,
    http::HttpClient, lever::LeverScraper, meta, microsoft, selfheal::Resolver, shopify,
    workday::WorkdayScraper,
};
use crate::utils::{
    config::Config,
    state::{load_seen, save_seen},
};

/// The run's jobs split against the previous seen-set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Jobs whose URL was not seen last run, in discovery order.
    pub new_jobs: Vec<JobRecord>,
    /// Every URL found this run; becomes the next seen-set.
    pub current_urls: BTreeSet<String>,
}

/// Partitions `jobs` into new and already seen. A URL reported by more than
/// one adapter is kept once.
pub fn reconcile(seen: &BTreeSet<String>, jobs: Vec<JobRecord>) -> Reconciled {
    let mut reconciled = Reconciled::default();

    for job in jobs {
        let url = job.url.trim();
        if url.is_empty() || !reconciled.current_urls.insert(url.to_string()) {
            continue;
        }
        if !seen.contains(url) {
            reconciled.new_jobs.push(job);
        }
    }

    reconciled
}

#[derive(Debug)]
pub struct RunSummary {
    pub current: usize,
    pub new_jobs: Vec<JobRecord>,
    pub report: Option<PathBuf>,
}

pub struct Runner {
    config: Config,
    selection: TargetSelection,
}

impl Runner {
    pub fn new(config: Config, selection: TargetSelection) -> Self {
        Runner { config, selection }
    }

    pub async fn run(&self, sink: &dyn ReportSink, notifier: &dyn Notifier) -> Result<RunSummary> {
        let seen = load_seen(&self.config.state_file)?;
        info!("loaded {} previously seen jobs", seen.len());

        let jobs = self.collect().await?;
        self.conclude(&seen, jobs, sink, notifier)
    }

    /// Hands the new jobs to the collaborators and overwrites the seen-set
    /// with this run's URLs. Collaborator failures are logged, not fatal.
    pub fn conclude(
        &self,
        seen: &BTreeSet<String>,
        jobs: Vec<JobRecord>,
        sink: &dyn ReportSink,
        notifier: &dyn Notifier,
    ) -> Result<RunSummary> {
        if jobs.is_empty() {
            warn!("no jobs found at all during this run");
        }

        let reconciled = reconcile(seen, jobs);
        info!("scraping complete, found {} new jobs", reconciled.new_jobs.len());

        if let Err(e) = notifier.notify(&reconciled.new_jobs) {
            warn!("failed to send notification: {e}");
        }
        let report = sink.write(&reconciled.new_jobs).unwrap_or_else(|e| {
            warn!("failed to write report: {e}");
            None
        });

        save_seen(&self.config.state_file, &reconciled.current_urls)?;
        info!(
            "updated state file with {} current jobs for next run",
            reconciled.current_urls.len()
        );

        Ok(RunSummary {
            current: reconciled.current_urls.len(),
            new_jobs: reconciled.new_jobs,
            report,
        })
    }

    async fn collect(&self) -> Result<Vec<JobRecord>> {
        let client = HttpClient::new(&self.config.http)?;
        let companies = &self.config.companies;
        let run = |target: Target| self.selection.should_run(target);
        let mut jobs = Vec::new();

        if run(Target::Greenhouse) && !companies.greenhouse.is_empty() {
            info!("starting greenhouse scrape");
            let scraper = GreenhouseScraper::new(self.config.clone(), client.clone());
            for (company, token) in &companies.greenhouse {
                jobs.extend(scraper.scrape(company, token).await);
            }
        }

        if run(Target::Ashby) && !companies.ashby.is_empty() {
            info!("starting ashby scrape");
            let scraper = AshbyScraper::new(self.config.clone(), client.clone());
            for (company, slug) in &companies.ashby {
                jobs.extend(scraper.scrape(company, slug).await);
            }
        }

        if run(Target::Lever) && !companies.lever.is_empty() {
            info!("starting lever scrape");
            let scraper = LeverScraper::new(self.config.clone(), client.clone());
            for (company, token) in &companies.lever {
                jobs.extend(scraper.scrape(company, token).await);
            }
        }

        if (run(Target::Greenhouse) || run(Target::Ashby))
            && jobs.is_empty()
            && self.config.selfheal.enabled
        {
            jobs.extend(self.self_heal(&client).await);
        }

        if run(Target::Workday) && !companies.workday.is_empty() {
            info!("starting workday scrape");
            let scraper = WorkdayScraper::new(self.config.clone(), client.clone());
            for (company, portal) in &companies.workday {
                jobs.extend(scraper.scrape(company, portal).await);
            }
        }

        info!("starting custom scrapes");
        if run(Target::Google) {
            jobs.extend(GoogleScraper::new(self.config.clone(), client.clone()).scrape().await);
        }
        if run(Target::Shopify) {
            jobs.extend(shopify::scrape(self.config.clone()).await);
        }
        if run(Target::Microsoft) {
            jobs.extend(microsoft::scrape(self.config.clone()).await);
        }
        if run(Target::Meta) {
            jobs.extend(meta::scrape(self.config.clone()).await);
        }
        if run(Target::Apple) {
            jobs.extend(apple::scrape(self.config.clone()).await);
        }
        if run(Target::Amazon) {
            jobs.extend(amazon::scrape(self.config.clone()).await);
        }

        Ok(jobs)
    }

    /// Re-resolves every Greenhouse/Ashby company through the resolver and
    /// scrapes whichever provider it picks.
    async fn self_heal(&self, client: &HttpClient) -> Vec<JobRecord> {
        let companies = &self.config.companies;
        let names: BTreeSet<&String> = companies
            .greenhouse
            .keys()
            .chain(companies.ashby.keys())
            .collect();
        if names.is_empty() {
            return Vec::new();
        }

        info!("self-healing ats detection for {} companies", names.len());
        let resolver = Resolver::new(self.config.clone(), client.clone());
        let mut jobs = Vec::new();

        for company in names {
            let mut slugs: Vec<&String> = Vec::new();
            for slug in [companies.greenhouse.get(company), companies.ashby.get(company)]
                .into_iter()
                .flatten()
            {
                if !slugs.contains(&slug) {
                    slugs.push(slug);
                }
            }

            let mut resolved = None;
            for slug in slugs {
                resolved = resolver.resolve(company, slug).await;
                if resolved.is_some() {
                    break;
                }
            }

            let found = match resolved {
                Some((Target::Greenhouse, slug)) => {
                    GreenhouseScraper::new(self.config.clone(), client.clone())
                        .scrape(company, &slug)
                        .await
                }
                Some((Target::Ashby, slug)) => {
                    AshbyScraper::new(self.config.clone(), client.clone())
                        .scrape(company, &slug)
                        .await
                }
                Some((Target::Lever, slug)) => {
                    LeverScraper::new(self.config.clone(), client.clone())
                        .scrape(company, &slug)
                        .await
                }
                _ => {
                    info!("{company}: no valid ats found, skipping");
                    Vec::new()
                }
            };
            jobs.extend(found);
        }

        jobs
    }
}
