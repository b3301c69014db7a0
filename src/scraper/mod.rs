//! Source adapters and the machinery they share. Every adapter tries its
//! retrieval strategies in priority order, stops at the first one that yields
//! postings, and hands the raw postings to the sieve.

pub mod amazon;
pub mod apple;
pub mod ashby;
pub mod browser;
pub mod career_site;
pub mod fields;
pub mod google;
pub mod greenhouse;
pub mod http;
pub mod lever;
pub mod meta;
pub mod microsoft;
pub mod selfheal;
pub mod shopify;
pub mod sieve;
pub mod slugs;
pub mod workday;

use log::{debug, info, warn};
use regex::Regex;

use crate::models::{
    job::{JobRecord, RawPosting},
    target::Target,
};
use crate::utils::config::ConfigInner;
use http::FetchError;
use sieve::Sieve;

/// Logs a strategy outcome and keeps it only when it produced postings.
pub(crate) fn settle(
    label: &str,
    result: Result<Vec<RawPosting>, FetchError>,
) -> Option<Vec<RawPosting>> {
    match result {
        Ok(raws) if !raws.is_empty() => {
            debug!("{label}: {} raw postings", raws.len());
            Some(raws)
        }
        Ok(_) => {
            debug!("{label}: empty");
            None
        }
        Err(e) => {
            debug!("{label}: {e}");
            None
        }
    }
}

/// Settles a chain of strategies while remembering whether any of them
/// reached the board and got an empty answer back.
#[derive(Debug, Default)]
pub(crate) struct Fallback {
    answered_empty: bool,
}

impl Fallback {
    pub(crate) fn settle(
        &mut self,
        label: &str,
        result: Result<Vec<RawPosting>, FetchError>,
    ) -> Option<Vec<RawPosting>> {
        self.answered_empty |= matches!(&result, Ok(raws) if raws.is_empty());
        settle(label, result)
    }

    pub(crate) fn answered_empty(&self) -> bool {
        self.answered_empty
    }

    /// Logs the end of a chain that produced nothing. An empty board is
    /// routine; a board nobody could reach is worth a warning.
    pub(crate) fn give_up(&self, provider: &str, company: &str) {
        if self.answered_empty {
            info!("no {provider} postings for {company}");
        } else {
            warn!("could not fetch {provider} jobs for {company}");
        }
    }
}

/// Runs raw postings through the target's filter policy, logs the audit and
/// returns what survived.
pub(crate) fn sift_and_log(
    config: &ConfigInner,
    target: Target,
    company: &str,
    raws: Vec<RawPosting>,
    native_id: Option<&Regex>,
) -> Vec<JobRecord> {
    let policy = config.policy(target);
    let sifted = Sieve::new(company, &policy, &config.keywords)
        .native_id(native_id)
        .sift(raws);

    sifted.audit.log(company);
    info!("found {} relevant {company} jobs", sifted.jobs.len());
    sifted.jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answers_are_told_apart_from_failures() {
        let mut failed = Fallback::default();
        assert!(failed.settle("api", Err(FetchError::Status(404))).is_none());
        assert!(failed.settle("html", Err(FetchError::Empty)).is_none());
        assert!(!failed.answered_empty());

        let mut empty = Fallback::default();
        assert!(empty.settle("api", Err(FetchError::Status(503))).is_none());
        assert!(empty.settle("mirror", Ok(Vec::new())).is_none());
        assert!(empty.answered_empty());
    }

    #[test]
    fn postings_pass_through_the_chain() {
        let mut chain = Fallback::default();
        let raws = vec![RawPosting::new("Software Engineer", "https://x.test/jobs/1")];
        let kept = chain.settle("api", Ok(raws.clone()));
        assert_eq!(kept, Some(raws));
        assert!(!chain.answered_empty());
    }
}
