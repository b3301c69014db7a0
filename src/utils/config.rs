use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use easy_config_store::ConfigStore;
use eyre::{Result, bail};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::classify::{CountryFilter, FilterPolicy};
use crate::models::target::Target;

pub type Config = Arc<ConfigInner>;

pub fn config(path: PathBuf) -> Result<Config> {
    if !path.is_file() {
        bail!("configuration file not found at {}", path.display());
    }

    let config_store = ConfigStore::<ConfigInner>::read(path, "config".to_string())?;
    let mut inner = (*config_store).clone();
    inner.apply_env(|key| std::env::var(key).ok());

    info!("config parsing successful");
    debug!("loaded configuration:\n{}", toml::to_string_pretty(&inner)?);

    Ok(Arc::new(inner))
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigInner {
    /// Lowercase substrings a title must contain (see `KeywordMode`).
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub fast_mode: bool,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub selfheal: SelfHealConfig,
    #[serde(default)]
    pub workday: WorkdayConfig,
    /// Filter-policy overrides keyed by target name (`greenhouse`, `apple`, ...).
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyOverride>,
    #[serde(default)]
    pub companies: Companies,
}

/// Company display name → provider identifier (board token, org slug, or
/// Workday portal URL).
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct Companies {
    #[serde(default)]
    pub greenhouse: BTreeMap<String, String>,
    #[serde(default)]
    pub ashby: BTreeMap<String, String>,
    #[serde(default)]
    pub lever: BTreeMap<String, String>,
    #[serde(default)]
    pub workday: BTreeMap<String, String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
    #[serde(default = "default_scroll_loops")]
    pub scroll_loops: usize,
    #[serde(default = "default_fast_scroll_loops")]
    pub fast_scroll_loops: usize,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SelfHealConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub try_lever: bool,
    /// Treat an Ashby board that answers 200 without a parsable count as existing.
    #[serde(default = "default_true")]
    pub ashby_200_ok: bool,
    #[serde(default)]
    pub use_posting_api: bool,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct WorkdayConfig {
    /// Tenants (lowercase) that are never scraped.
    #[serde(default)]
    pub skip_tenants: Vec<String>,
    /// Search text typed into the portal when the browser fallback runs.
    #[serde(default = "default_force_query")]
    pub force_query: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    #[serde(default = "default_fast_cap")]
    pub fast_cap: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// Optional per-target overrides of the built-in `FilterPolicy` defaults.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Clone)]
pub struct PolicyOverride {
    pub allowed_countries: Option<String>,
    pub keep_unknown: Option<bool>,
    pub newgrad_only: Option<bool>,
    pub include_interns: Option<bool>,
    pub seniority_trim: Option<bool>,
    pub manager_trim: Option<bool>,
}

impl PolicyOverride {
    fn apply(&self, policy: &mut FilterPolicy) {
        if let Some(countries) = &self.allowed_countries {
            policy.countries = CountryFilter::parse(countries);
        }
        if let Some(v) = self.keep_unknown {
            policy.keep_unknown = v;
        }
        if let Some(v) = self.newgrad_only {
            policy.newgrad_only = v;
        }
        if let Some(v) = self.include_interns {
            policy.include_interns = v;
        }
        if let Some(v) = self.seniority_trim {
            policy.seniority_trim = v;
        }
        if let Some(v) = self.manager_trim {
            policy.manager_trim = v;
        }
    }
}

impl ConfigInner {
    /// Effective filter policy for `target`: built-in defaults, then the
    /// `[policies.<target>]` section.
    pub fn policy(&self, target: Target) -> FilterPolicy {
        let mut policy = FilterPolicy::for_target(target);
        if let Some(over) = self.policies.get(target.name()) {
            over.apply(&mut policy);
        }
        policy
    }

    /// Folds recognized environment variables into the configuration. Called
    /// once at load time; `lookup` is `std::env::var` outside of tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).and_then(|v| parse_flag(key, &v));

        if let Some(v) = flag("FAST_MODE") {
            self.fast_mode = v;
        }

        for target in Target::ALL {
            let prefix = target.env_prefix();
            let countries = lookup(&format!("{prefix}_ALLOWED_COUNTRIES"));
            let keep_unknown = flag(&format!("{prefix}_KEEP_UNKNOWN_COUNTRY"));
            let newgrad_only = flag(&format!("{prefix}_NEWGRAD_ONLY"));
            let include_interns = flag(&format!("{prefix}_INCLUDE_INTERNS"));
            let seniority_trim = flag(&format!("{prefix}_SENIORITY_TRIM"));

            if countries.is_none()
                && keep_unknown.is_none()
                && newgrad_only.is_none()
                && include_interns.is_none()
                && seniority_trim.is_none()
            {
                continue;
            }

            let over = self.policies.entry(target.name().to_string()).or_default();
            over.allowed_countries = countries.or(over.allowed_countries.take());
            over.keep_unknown = keep_unknown.or(over.keep_unknown);
            over.newgrad_only = newgrad_only.or(over.newgrad_only);
            over.include_interns = include_interns.or(over.include_interns);
            over.seniority_trim = seniority_trim.or(over.seniority_trim);
        }

        if let Some(tenants) = lookup("WD_SKIP_TENANTS") {
            self.workday.skip_tenants = tenants
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Some(query) = lookup("WORKDAY_FORCE_QUERY").filter(|q| !q.trim().is_empty()) {
            self.workday.force_query = query.trim().to_string();
        }
        // `WD_HEADLESS=0` shows the browser window.
        if let Some(v) = flag("WD_HEADLESS") {
            self.browser.headless = v;
        }
        if let Some(v) = flag("SELFHEAL_TRY_LEVER") {
            self.selfheal.try_lever = v;
        }
        if let Some(v) = flag("SELFHEAL_USE_POSTING_API") {
            self.selfheal.use_posting_api = v;
        }
        if let Some(v) = flag("SELFHEAL_ASHBY_200_OK") {
            self.selfheal.ashby_200_ok = v;
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        other => {
            warn!("ignoring {key}={other}, expected a boolean");
            None
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_state_file() -> PathBuf {
    PathBuf::from("seen_jobs.txt")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_settle_millis() -> u64 {
    1500
}

fn default_scroll_loops() -> usize {
    45
}

fn default_fast_scroll_loops() -> usize {
    12
}

fn default_probe_timeout_secs() -> u64 {
    8
}

fn default_force_query() -> String {
    "engineer".to_string()
}

fn default_page_limit() -> usize {
    50
}

fn default_fast_cap() -> usize {
    300
}

fn default_max_pages() -> usize {
    40
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            headless: true,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_millis: default_settle_millis(),
            scroll_loops: default_scroll_loops(),
            fast_scroll_loops: default_fast_scroll_loops(),
        }
    }
}

impl Default for SelfHealConfig {
    fn default() -> Self {
        SelfHealConfig {
            enabled: true,
            try_lever: true,
            ashby_200_ok: true,
            use_posting_api: false,
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        WorkdayConfig {
            skip_tenants: Vec::new(),
            force_query: default_force_query(),
            page_limit: default_page_limit(),
            fast_cap: default_fast_cap(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for ConfigInner {
    fn default() -> Self {
        let cfg = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.default.toml",));

        toml::from_str(cfg).expect("bundled config.default.toml is valid")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn bundled_default_parses() {
        let config = ConfigInner::default();
        assert_eq!(config.http.max_retries, 3);
        assert!(config.selfheal.enabled);
        assert!(!config.keywords.is_empty());
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let config: ConfigInner = toml::from_str(
            r#"
            keywords = ["software engineer"]

            [companies.greenhouse]
            "Acme" = "acme"
            "#,
        )
        .unwrap();
        assert_eq!(config.companies.greenhouse["Acme"], "acme");
        assert_eq!(config.workday, WorkdayConfig::default());
        assert_eq!(config.policy(Target::Ashby), FilterPolicy::for_target(Target::Ashby));
    }

    #[test]
    fn file_overrides_then_env_overrides() {
        let mut config: ConfigInner = toml::from_str(
            r#"
            [policies.greenhouse]
            keep_unknown = false
            newgrad_only = true
            "#,
        )
        .unwrap();

        config.apply_env(env(&[
            ("GH_ALLOWED_COUNTRIES", "ALL"),
            ("GH_NEWGRAD_ONLY", "0"),
            ("AMZN_SENIORITY_TRIM", "false"),
            ("WD_SKIP_TENANTS", " Acme, beta ,"),
            ("WD_HEADLESS", "0"),
            ("FAST_MODE", "yes"),
        ]));

        let gh = config.policy(Target::Greenhouse);
        assert_eq!(gh.countries, CountryFilter::Any);
        assert!(!gh.keep_unknown);
        assert!(!gh.newgrad_only);
        assert!(!config.policy(Target::Amazon).seniority_trim);
        assert!(config.policy(Target::Apple).seniority_trim);
        assert_eq!(config.workday.skip_tenants, vec!["acme", "beta"]);
        assert!(!config.browser.headless);
        assert!(config.fast_mode);
    }

    #[test]
    fn unparsable_flags_are_ignored() {
        let mut config = ConfigInner::default();
        config.apply_env(env(&[("SELFHEAL_TRY_LEVER", "maybe")]));
        assert!(config.selfheal.try_lever);
    }
}
