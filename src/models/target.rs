use std::{collections::BTreeSet, fmt, str::FromStr};

use log::warn;
use thiserror::Error;

/// Every source family the runner knows how to scrape, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Greenhouse,
    Ashby,
    Lever,
    Workday,
    Google,
    Shopify,
    Microsoft,
    Meta,
    Apple,
    Amazon,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown target '{0}'")]
pub struct UnknownTarget(pub String);

impl Target {
    pub const ALL: [Target; 10] = [
        Target::Greenhouse,
        Target::Ashby,
        Target::Lever,
        Target::Workday,
        Target::Google,
        Target::Shopify,
        Target::Microsoft,
        Target::Meta,
        Target::Apple,
        Target::Amazon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Target::Greenhouse => "greenhouse",
            Target::Ashby => "ashby",
            Target::Lever => "lever",
            Target::Workday => "workday",
            Target::Google => "google",
            Target::Shopify => "shopify",
            Target::Microsoft => "microsoft",
            Target::Meta => "meta",
            Target::Apple => "apple",
            Target::Amazon => "amazon",
        }
    }

    /// Prefix of the per-target environment overrides, e.g. `GH_ALLOWED_COUNTRIES`.
    pub fn env_prefix(self) -> &'static str {
        match self {
            Target::Greenhouse => "GH",
            Target::Ashby => "ASHBY",
            Target::Lever => "LEVER",
            Target::Workday => "WORKDAY",
            Target::Google => "GOOGLE",
            Target::Shopify => "SHOPIFY",
            Target::Microsoft => "MSFT",
            Target::Meta => "META",
            Target::Apple => "APPLE",
            Target::Amazon => "AMZN",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Target::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or(UnknownTarget(wanted))
    }
}

/// `--only` / `--skip` resolved into a predicate over targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSelection {
    /// `None` runs every target.
    only: Option<BTreeSet<Target>>,
    skip: BTreeSet<Target>,
}

impl TargetSelection {
    /// Parses comma-separated lists. An empty `only` list or one naming `all`
    /// runs every target. Unknown names are warned about and ignored, so an
    /// `only` list made entirely of unknown names runs nothing.
    pub fn parse(only: &str, skip: &str) -> Self {
        let names: Vec<&str> = only
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let run_all = names.is_empty() || names.iter().any(|t| t.eq_ignore_ascii_case("all"));

        TargetSelection {
            only: (!run_all).then(|| Self::parse_list(only)),
            skip: Self::parse_list(skip),
        }
    }

    fn parse_list(list: &str) -> BTreeSet<Target> {
        list.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .filter_map(|t| match t.parse::<Target>() {
                Ok(target) => Some(target),
                Err(e) => {
                    warn!("{e}, ignoring it");
                    None
                }
            })
            .collect()
    }

    pub fn should_run(&self, target: Target) -> bool {
        if self.skip.contains(&target) {
            return false;
        }
        self.only.as_ref().is_none_or(|only| only.contains(&target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for target in Target::ALL {
            assert_eq!(target.name().parse::<Target>(), Ok(target));
        }
        assert_eq!(
            "Workday ".parse::<Target>(),
            Ok(Target::Workday),
            "parsing is case and whitespace insensitive"
        );
        assert!("monster".parse::<Target>().is_err());
    }

    #[test]
    fn skip_wins_over_only() {
        let selection = TargetSelection::parse("greenhouse,lever", "lever");
        assert!(selection.should_run(Target::Greenhouse));
        assert!(!selection.should_run(Target::Lever));
        assert!(!selection.should_run(Target::Apple));
    }

    #[test]
    fn unknown_only_names_run_nothing() {
        let typo = TargetSelection::parse("gogle", "");
        let mixed = TargetSelection::parse("gogle, google", "");
        for target in Target::ALL {
            assert!(!typo.should_run(target));
            assert_eq!(mixed.should_run(target), target == Target::Google);
        }
    }

    #[test]
    fn empty_or_all_runs_everything() {
        let everything = TargetSelection::parse(" , ", "");
        let all = TargetSelection::parse("all", "meta");
        for target in Target::ALL {
            assert!(everything.should_run(target));
            assert!(TargetSelection::default().should_run(target));
            assert_eq!(all.should_run(target), target != Target::Meta);
        }
    }
}
