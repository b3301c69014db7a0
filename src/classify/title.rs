use std::sync::LazyLock;

use regex::Regex;

static SENIOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:sr|senior|staff|principal|lead|architect|fellow|distinguished)\b",
        // Roman tiers only count right after a role word.
        r"|\b(?:engineer|developer|programmer|scientist|swe|sde)\s+(?:iii|iv|v)\b",
    ))
    .expect("valid regex")
});

static EARLY_CAREER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:new\s*grad(?:uate)?|university|graduate|early[\s-]*career|entry[\s-]*level|junior|jr|assoc|associate|intern|internship|apprentice(?:ship)?|co-?op|(?:engineer|developer|swe)\s*(?:i|1))\b",
    )
    .expect("valid regex")
});

static MANAGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:manager|director|tpm|pm|head of|vp|vice president)\b").expect("valid regex")
});

static INTERNSHIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:intern|internship|co[-\s]?op)\b").expect("valid regex"));

static SHORT_ENGINEERING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:ml|ai|qa|sre|sde|swe|sdet|ios)\b").expect("valid regex")
});

const ENGINEERING_TERMS: [&str; 22] = [
    "engineer",
    "developer",
    "software",
    "programmer",
    "reliability",
    "security",
    "platform",
    "systems",
    "machine learning",
    "devops",
    "backend",
    "back end",
    "frontend",
    "front end",
    "full stack",
    "fullstack",
    "data engineer",
    "compiler",
    "kernel",
    "graphics",
    "infrastructure",
    "android",
];

/// Engineering-family role by substring (`engineer`, `developer`, ...) or by a
/// short standalone token (`SDE`, `ML`, `iOS`, ...).
pub fn looks_engineering(title: &str) -> bool {
    let lower = title.to_lowercase();
    ENGINEERING_TERMS.iter().any(|term| lower.contains(term)) || SHORT_ENGINEERING.is_match(title)
}

pub fn is_senior(title: &str) -> bool {
    SENIOR.is_match(title)
}

pub fn is_early_career(title: &str) -> bool {
    EARLY_CAREER.is_match(title)
}

pub fn is_manager_track(title: &str) -> bool {
    MANAGER.is_match(title)
}

pub fn is_internship(title: &str) -> bool {
    INTERNSHIP.is_match(title)
}

/// Case-insensitive substring match against any keyword. No keywords means
/// no constraint.
pub fn matches_keywords<S: AsRef<str>>(title: &str, keywords: &[S]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lower = title.to_lowercase();
    keywords
        .iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .any(|k| !k.is_empty() && lower.contains(&k))
}
