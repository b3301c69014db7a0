use std::sync::LazyLock;

use regex::Regex;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("valid regex"));

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// `"Jane Street Capital"` → `jane-street-capital`.
pub fn dashy(text: &str) -> String {
    NON_ALNUM
        .replace_all(&text.trim().to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// The configured slug first, then derivations of the display name:
/// hyphenated without parentheticals, no separator, first word only.
pub fn board_candidates(configured: &str, company: &str) -> Vec<String> {
    let mut out = Vec::new();
    push_unique(&mut out, configured.trim().to_string());

    let base = dashy(&PARENTHETICAL.replace_all(&company.to_lowercase(), ""));
    push_unique(&mut out, base.clone());
    push_unique(&mut out, base.replace('-', ""));
    if let Some(first) = base.split('-').find(|p| !p.is_empty()) {
        push_unique(&mut out, first.to_string());
    }

    out
}

/// Variants probed by the self-heal resolver, in order: for the slug and then
/// the display name, the original text, lowercase, hyphenated and
/// separator-free forms, followed by the same forms of any parenthetical
/// alias (`"Arc (JoinArc)"` → `joinarc`).
pub fn resolver_variants(company: &str, slug: &str) -> Vec<String> {
    let mut out = Vec::new();

    for source in [slug, company] {
        let source = source.trim();
        if source.is_empty() {
            continue;
        }
        for variant in text_variants(source) {
            push_unique(&mut out, variant);
        }
        for caps in PARENTHETICAL.captures_iter(source) {
            if let Some(inner) = caps.get(1) {
                for variant in text_variants(inner.as_str()) {
                    push_unique(&mut out, variant);
                }
            }
        }
    }

    out
}

fn text_variants(text: &str) -> [String; 4] {
    let text = text.trim();
    let lower = text.to_lowercase();
    let dashy = dashy(text);
    let nodash = dashy.replace('-', "");
    [text.to_string(), lower, dashy, nodash]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_candidates_drop_parentheticals() {
        assert_eq!(
            board_candidates("", "Jane Street (JS) Capital"),
            vec!["jane-street-capital", "janestreetcapital", "jane"]
        );
        assert_eq!(board_candidates("ramp", "Ramp"), vec!["ramp"]);
    }

    #[test]
    fn resolver_variants_keep_order_and_aliases() {
        assert_eq!(
            resolver_variants("Arc (JoinArc)", "Arc"),
            vec![
                "Arc",
                "arc",
                "Arc (JoinArc)",
                "arc (joinarc)",
                "arc-joinarc",
                "arcjoinarc",
                "JoinArc",
                "joinarc"
            ]
        );
    }
}
