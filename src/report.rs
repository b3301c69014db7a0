//! Collaborators that consume the new jobs of a run: a report writer and a
//! notifier. Both are traits so the runner can be driven with test doubles.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use eyre::{Result, WrapErr};
use log::info;
use serde::Serialize;

use crate::models::job::JobRecord;

pub trait ReportSink {
    /// Persists the new jobs, returning where they went. Nothing is written
    /// when `jobs` is empty.
    fn write(&self, jobs: &[JobRecord]) -> Result<Option<PathBuf>>;
}

pub trait Notifier {
    fn notify(&self, jobs: &[JobRecord]) -> Result<()>;
}

/// One row per company: the first new job seen for it and its search links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkingRow {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Relevant Job Example")]
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Entry Level SE Search")]
    pub entry_level_search: String,
    #[serde(rename = "General Role Search")]
    pub general_role_search: String,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    #[serde(rename = "Networking To-Do")]
    networking: Vec<NetworkingRow>,
    #[serde(rename = "New Jobs")]
    jobs: Vec<&'a JobRecord>,
}

pub fn networking_rows(jobs: &[JobRecord]) -> Vec<NetworkingRow> {
    let mut by_company: BTreeMap<String, &JobRecord> = BTreeMap::new();
    for job in jobs {
        let company = job.company.trim();
        if company.is_empty() {
            continue;
        }
        by_company.entry(company.to_lowercase()).or_insert(job);
    }

    by_company
        .into_values()
        .map(|job| NetworkingRow {
            company: job.company.trim().to_string(),
            title: job.title.clone(),
            url: job.url.clone(),
            entry_level_search: job.links.entry_level_search.clone(),
            general_role_search: job.links.general_role_search.clone(),
        })
        .collect()
}

/// Jobs grouped by company, newest posting first; undated jobs last.
pub fn sorted_for_report(jobs: &[JobRecord]) -> Vec<&JobRecord> {
    let mut sorted: Vec<&JobRecord> = jobs.iter().collect();
    sorted.sort_by(|a, b| {
        a.company
            .to_lowercase()
            .cmp(&b.company.to_lowercase())
            .then_with(|| match (a.posted, b.posted) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });
    sorted
}

/// Writes `{output_dir}/NEW_jobs_report_{date}.json`.
pub struct JsonReport {
    output_dir: PathBuf,
    date: NaiveDate,
}

impl JsonReport {
    pub fn new(output_dir: impl AsRef<Path>, date: NaiveDate) -> Self {
        JsonReport {
            output_dir: output_dir.as_ref().to_path_buf(),
            date,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir
            .join(format!("NEW_jobs_report_{}.json", self.date.format("%Y-%m-%d")))
    }
}

impl ReportSink for JsonReport {
    fn write(&self, jobs: &[JobRecord]) -> Result<Option<PathBuf>> {
        if jobs.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.output_dir)
            .wrap_err_with(|| format!("failed to create {}", self.output_dir.display()))?;

        let report = Report {
            networking: networking_rows(jobs),
            jobs: sorted_for_report(jobs),
        };
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&report)?)
            .wrap_err_with(|| format!("failed to write report {}", path.display()))?;

        info!("saved report to {}", path.display());
        Ok(Some(path))
    }
}

/// Logs an email-style summary of the new jobs.
pub struct LogNotifier;

impl LogNotifier {
    pub fn body(jobs: &[JobRecord]) -> String {
        let mut lines = vec!["here are the new jobs found today".to_string(), String::new()];
        for job in jobs {
            lines.push(format!("- {} at {}", job.title, job.company));
            lines.push(format!("  location: {}", job.location));
            lines.push(format!("  link: {}", job.url));
            if let Some(posted) = job.posted {
                lines.push(format!("  posted: {posted}"));
            }
        }
        lines.join("\n")
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, jobs: &[JobRecord]) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        info!("found {} new job postings\n{}", jobs.len(), Self::body(jobs));
        Ok(())
    }
}
