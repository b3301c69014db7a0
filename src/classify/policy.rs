use std::fmt;

use super::{
    location::{self, CountryFilter},
    title,
};
use crate::models::target::Target;

/// How the base keep-rule of the title policy is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordMode {
    /// Title must contain one of the configured keywords; with no keywords
    /// configured the engineering heuristic stands in.
    Keywords,
    /// Keyword match or the engineering heuristic, whichever hits.
    KeywordsOrEngineering,
}

/// Outcome of the composed title policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TitleVerdict {
    Keep,
    Internship,
    Manager,
    Senior,
    NotEngineering,
    NotEarlyCareer,
}

impl fmt::Display for TitleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TitleVerdict::Keep => "keep",
            TitleVerdict::Internship => "intern",
            TitleVerdict::Manager => "manager",
            TitleVerdict::Senior => "senior_trim",
            TitleVerdict::NotEngineering => "not_eng",
            TitleVerdict::NotEarlyCareer => "early_only",
        })
    }
}

/// The per-adapter filter settings. Built once from configuration and passed
/// into each adapter call; adapters never consult the environment themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    pub countries: CountryFilter,
    pub keep_unknown: bool,
    pub newgrad_only: bool,
    pub include_interns: bool,
    pub seniority_trim: bool,
    pub manager_trim: bool,
    pub keyword_mode: KeywordMode,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            countries: CountryFilter::default(),
            keep_unknown: true,
            newgrad_only: false,
            include_interns: false,
            seniority_trim: true,
            manager_trim: true,
            keyword_mode: KeywordMode::Keywords,
        }
    }
}

impl FilterPolicy {
    /// Built-in defaults for each adapter before configuration overrides.
    pub fn for_target(target: Target) -> Self {
        let base = FilterPolicy::default();
        match target {
            Target::Ashby => FilterPolicy {
                keep_unknown: false,
                newgrad_only: true,
                ..base
            },
            Target::Workday => FilterPolicy {
                keep_unknown: false,
                keyword_mode: KeywordMode::KeywordsOrEngineering,
                ..base
            },
            Target::Apple | Target::Amazon => FilterPolicy {
                include_interns: true,
                keyword_mode: KeywordMode::KeywordsOrEngineering,
                ..base
            },
            Target::Greenhouse
            | Target::Lever
            | Target::Google
            | Target::Meta
            | Target::Microsoft
            | Target::Shopify => base,
        }
    }

    /// Location gate. Structured country fields, when a source has them,
    /// decide before any free-text inference.
    pub fn admits_location<S: AsRef<str>>(&self, countries: &[S], locations: &[S]) -> bool {
        if self.countries == CountryFilter::Any {
            return true;
        }

        let codes: Vec<String> = countries
            .iter()
            .filter_map(|c| location::normalize_country(c.as_ref()))
            .collect();
        if !codes.is_empty() {
            return codes.iter().any(|c| self.countries.permits(c));
        }

        location::is_allowed(locations, &self.countries, self.keep_unknown)
    }

    /// Composed title policy. An early-career marker always beats the
    /// manager and seniority trims.
    pub fn judge_title<S: AsRef<str>>(&self, job_title: &str, keywords: &[S]) -> TitleVerdict {
        let early = title::is_early_career(job_title);

        if !self.include_interns && title::is_internship(job_title) {
            return TitleVerdict::Internship;
        }
        if self.manager_trim && title::is_manager_track(job_title) && !early {
            return TitleVerdict::Manager;
        }
        if self.seniority_trim && title::is_senior(job_title) && !early {
            return TitleVerdict::Senior;
        }

        let base = match self.keyword_mode {
            KeywordMode::Keywords if keywords.is_empty() => title::looks_engineering(job_title),
            KeywordMode::Keywords => title::matches_keywords(job_title, keywords),
            KeywordMode::KeywordsOrEngineering => {
                (!keywords.is_empty() && title::matches_keywords(job_title, keywords))
                    || title::looks_engineering(job_title)
            }
        };
        if !base {
            return TitleVerdict::NotEngineering;
        }

        if self.newgrad_only && !early {
            return TitleVerdict::NotEarlyCareer;
        }

        TitleVerdict::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWE: [&str; 1] = ["software engineer"];

    #[test]
    fn senior_without_early_marker_is_trimmed() {
        let policy = FilterPolicy::default();
        assert_eq!(
            policy.judge_title("Senior Software Engineer", &SWE),
            TitleVerdict::Senior
        );
        assert_eq!(
            policy.judge_title("New Grad Software Engineer II", &SWE),
            TitleVerdict::Keep
        );
    }

    #[test]
    fn trims_can_be_disabled() {
        let policy = FilterPolicy {
            seniority_trim: false,
            manager_trim: false,
            ..FilterPolicy::default()
        };
        assert_eq!(policy.judge_title("Staff Software Engineer", &SWE), TitleVerdict::Keep);
        assert_eq!(
            policy.judge_title("Software Engineer Manager", &SWE),
            TitleVerdict::Keep
        );
    }

    #[test]
    fn interns_follow_the_toggle() {
        let title = "Software Engineer Intern";
        assert_eq!(
            FilterPolicy::default().judge_title(title, &SWE),
            TitleVerdict::Internship
        );
        assert_eq!(
            FilterPolicy::for_target(Target::Apple).judge_title(title, &SWE),
            TitleVerdict::Keep
        );
    }

    #[test]
    fn keyword_modes() {
        let keywords = FilterPolicy::default();
        let widened = FilterPolicy::for_target(Target::Workday);
        assert_eq!(
            keywords.judge_title("Backend Developer", &SWE),
            TitleVerdict::NotEngineering
        );
        assert_eq!(widened.judge_title("Backend Developer", &SWE), TitleVerdict::Keep);
        assert_eq!(
            keywords.judge_title::<&str>("Backend Developer", &[]),
            TitleVerdict::Keep
        );
    }

    #[test]
    fn newgrad_only_requires_early_marker() {
        let ashby = FilterPolicy::for_target(Target::Ashby);
        assert_eq!(
            ashby.judge_title("Software Engineer", &SWE),
            TitleVerdict::NotEarlyCareer
        );
        assert_eq!(
            ashby.judge_title("Software Engineer, University Grad", &SWE),
            TitleVerdict::Keep
        );
    }

    #[test]
    fn structured_countries_decide_first() {
        let policy = FilterPolicy::default();
        assert!(policy.admits_location(&["United States of America"], &["Remote"]));
        assert!(!policy.admits_location(&["DE"], &["Austin, TX"]));
        assert!(policy.admits_location(&[], &["Austin, TX"]));
        assert!(!FilterPolicy::for_target(Target::Ashby).admits_location::<&str>(&[], &["Remote"]));
    }
}
