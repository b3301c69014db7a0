use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use log::{debug, info};
use regex::Regex;
use url::Url;

use crate::classify::{FilterPolicy, TitleVerdict};
use crate::models::job::{JobRecord, RawPosting};
use crate::utils::links::networking_links;

const SAMPLE_CAP: usize = 12;

/// Link labels that say nothing about the role.
const GENERIC_LABELS: [&str; 9] = [
    "apply",
    "apply now",
    "learn more",
    "view job",
    "view details",
    "see details",
    "read more",
    "details",
    "job details",
];

/// Path segments that are routing, never a title.
const ROUTE_SEGMENTS: [&str; 10] = [
    "jobs", "job", "details", "careers", "search", "apply", "en", "en-us", "us", "results",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    NoUrl,
    Duplicate,
    Untitled,
    Location,
    Title(TitleVerdict),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoUrl => f.write_str("no_url"),
            DropReason::Duplicate => f.write_str("duplicate"),
            DropReason::Untitled => f.write_str("untitled"),
            DropReason::Location => f.write_str("location"),
            DropReason::Title(verdict) => write!(f, "{verdict}"),
        }
    }
}

/// Keep/drop counters plus a bounded sample of what was dropped. Logged, never
/// returned to the runner.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DropAudit {
    pub kept: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    pub samples: Vec<String>,
}

impl DropAudit {
    fn record(&mut self, reason: DropReason, what: impl FnOnce() -> String) {
        *self.dropped.entry(reason).or_default() += 1;
        if self.samples.len() < SAMPLE_CAP {
            self.samples.push(format!("{reason}: {}", what()));
        }
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn log(&self, company: &str) {
        info!(
            "{company}: keep audit kept={} dropped={}",
            self.kept,
            self.total_dropped()
        );
        if !self.dropped.is_empty() {
            let reasons = self
                .dropped
                .iter()
                .map(|(reason, n)| format!("{reason}={n}"))
                .collect::<Vec<_>>()
                .join(" ");
            debug!("{company}: drop reasons {reasons}");
        }
        for sample in &self.samples {
            debug!("{company}: dropped {sample}");
        }
    }
}

#[derive(Debug, Default)]
pub struct Sifted {
    pub jobs: Vec<JobRecord>,
    pub audit: DropAudit,
}

/// Turns raw postings into emitted records: drop records without a URL, merge
/// duplicates, back-fill titles, then apply the location and title gates.
pub struct Sieve<'a> {
    company: &'a str,
    policy: &'a FilterPolicy,
    keywords: &'a [String],
    native_id: Option<&'a Regex>,
}

impl<'a> Sieve<'a> {
    pub fn new(company: &'a str, policy: &'a FilterPolicy, keywords: &'a [String]) -> Self {
        Sieve {
            company,
            policy,
            keywords,
            native_id: None,
        }
    }

    /// Regex whose first capture group is the provider's job id within a URL.
    pub fn native_id(mut self, pattern: Option<&'a Regex>) -> Self {
        self.native_id = pattern;
        self
    }

    fn dedupe_key(&self, url: &str) -> String {
        if let Some(re) = self.native_id
            && let Some(id) = re.captures(url).and_then(|c| c.get(1))
        {
            return format!("id:{}", id.as_str());
        }
        url.trim_end_matches('/').to_string()
    }

    pub fn sift(&self, raws: impl IntoIterator<Item = RawPosting>) -> Sifted {
        let mut audit = DropAudit::default();

        let mut merged: Vec<RawPosting> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for raw in raws {
            if raw.url.is_empty() {
                audit.record(DropReason::NoUrl, || raw.title.clone());
                continue;
            }
            let key = self.dedupe_key(&raw.url);
            match index.get(&key) {
                Some(&at) => {
                    audit.record(DropReason::Duplicate, || raw.url.clone());
                    merged[at].absorb(raw);
                }
                None => {
                    index.insert(key, merged.len());
                    merged.push(raw);
                }
            }
        }

        let mut emitted_urls = HashSet::new();
        let mut jobs = Vec::new();
        for mut raw in merged {
            if is_generic_label(&raw.title) {
                raw.title.clear();
            }
            if raw.title.is_empty() {
                match title_from_url(&raw.url) {
                    Some(title) => raw.title = title,
                    None => {
                        audit.record(DropReason::Untitled, || raw.url.clone());
                        continue;
                    }
                }
            }

            if !self.policy.admits_location(&raw.countries, &raw.locations) {
                audit.record(DropReason::Location, || {
                    format!("{} @ {}", raw.title, raw.display_location())
                });
                continue;
            }

            let verdict = self.policy.judge_title(&raw.title, self.keywords);
            if verdict != TitleVerdict::Keep {
                audit.record(DropReason::Title(verdict), || raw.title.clone());
                continue;
            }

            if !emitted_urls.insert(raw.url.clone()) {
                audit.record(DropReason::Duplicate, || raw.url.clone());
                continue;
            }

            jobs.push(JobRecord {
                company: self.company.to_string(),
                location: raw.display_location(),
                links: networking_links(self.company, &raw.title),
                title: raw.title,
                url: raw.url,
                posted: raw.posted,
            });
        }

        audit.kept = jobs.len();
        Sifted { jobs, audit }
    }
}

pub fn is_generic_label(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    GENERIC_LABELS.contains(&lower.as_str())
}

/// Best-effort title from the last descriptive path segment, e.g.
/// `/en/jobs/2856331/software-development-engineer` → `Software Development Engineer`.
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

    segments.iter().rev().find_map(|segment| {
        let words: Vec<String> = segment
            .split('_')
            .filter(|part| !part.chars().any(|c| c.is_ascii_digit()))
            .flat_map(|part| part.split(['-', '+']))
            .filter(|w| !w.is_empty())
            .map(|w| {
                let lower = w.to_lowercase();
                let mut chars = lower.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                    .unwrap_or_default()
            })
            .collect();

        let letters = words.iter().map(|w| w.chars().count()).sum::<usize>();
        let route = ROUTE_SEGMENTS.contains(&segment.to_lowercase().as_str());
        (!route && letters >= 3).then(|| words.join(" "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        vec!["software engineer".to_string()]
    }

    #[test]
    fn url_slug_titles() {
        assert_eq!(
            title_from_url("https://www.amazon.jobs/en/jobs/2856331/software-development-engineer")
                .as_deref(),
            Some("Software Development Engineer")
        );
        assert_eq!(
            title_from_url("https://acme.wd5.myworkdayjobs.com/en-US/External/job/Austin-TX/Software-Engineer_JR12345")
                .as_deref(),
            Some("Software Engineer")
        );
        assert_eq!(title_from_url("https://x.test/jobs/12345"), None);
    }

    #[test]
    fn generic_labels_are_replaced_from_the_url() {
        let policy = FilterPolicy::default();
        let keywords = keywords();
        let sifted = Sieve::new("Amazon", &policy, &keywords).sift([RawPosting::new(
            "Apply Now",
            "https://www.amazon.jobs/en/jobs/1/software-engineer-new-grad",
        )
        .with_location("Seattle, WA")]);

        assert_eq!(sifted.jobs.len(), 1);
        assert_eq!(sifted.jobs[0].title, "Software Engineer New Grad");
    }

    #[test]
    fn native_ids_collapse_differing_urls() {
        let policy = FilterPolicy::default();
        let keywords = keywords();
        let id = Regex::new(r"/details/(\d+)").unwrap();
        let sifted = Sieve::new("Apple", &policy, &keywords)
            .native_id(Some(&id))
            .sift([
                RawPosting::new("Software Engineer", "https://jobs.apple.com/en-us/details/200/software-engineer"),
                RawPosting::new("", "https://jobs.apple.com/en-us/details/200?team=SFTWR")
                    .with_location("Cupertino, CA"),
            ]);

        assert_eq!(sifted.jobs.len(), 1);
        assert_eq!(sifted.jobs[0].location, "Cupertino, CA");
        assert_eq!(sifted.audit.dropped[&DropReason::Duplicate], 1);
    }

    #[test]
    fn audit_counts_every_reason_and_caps_samples() {
        let policy = FilterPolicy {
            keep_unknown: false,
            ..FilterPolicy::default()
        };
        let keywords = keywords();
        let mut raws = vec![
            RawPosting::new("Software Engineer", ""),
            RawPosting::new("Software Engineer", "https://x.test/jobs/a").with_location("London, UK"),
            RawPosting::new("Staff Software Engineer", "https://x.test/jobs/b").with_location("Austin, TX"),
        ];
        for n in 0..20 {
            raws.push(RawPosting::new("Recruiter", format!("https://x.test/jobs/r{n}")).with_location("NYC, NY"));
        }

        let sifted = Sieve::new("X", &policy, &keywords).sift(raws);
        assert!(sifted.jobs.is_empty());
        assert_eq!(sifted.audit.dropped[&DropReason::NoUrl], 1);
        assert_eq!(sifted.audit.dropped[&DropReason::Location], 1);
        assert_eq!(sifted.audit.dropped[&DropReason::Title(TitleVerdict::Senior)], 1);
        assert_eq!(
            sifted.audit.dropped[&DropReason::Title(TitleVerdict::NotEngineering)],
            20
        );
        assert_eq!(sifted.audit.total_dropped(), 23);
        assert_eq!(sifted.audit.samples.len(), SAMPLE_CAP);
    }
}
