//! Aggregates early-career engineering postings from ATS boards and employer
//! career portals into one de-duplicated list, with run-over-run change
//! detection against a persisted seen-set.

pub mod classify;
pub mod models;
pub mod report;
pub mod runner;
pub mod scraper;
pub mod utils;

pub use models::job::{JobRecord, RawPosting};
pub use models::target::{Target, TargetSelection};
pub use runner::{Reconciled, RunSummary, Runner, reconcile};
