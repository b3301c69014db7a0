use pretty_assertions::assert_eq;

use jobwatch::Target;
use jobwatch::classify::{CountryFilter, FilterPolicy, TitleVerdict, infer_countries, is_allowed};

fn codes(text: &str) -> Vec<String> {
    infer_countries(text).into_iter().collect()
}

#[test]
fn north_american_locations() {
    assert_eq!(codes("Austin, TX"), vec!["US"]);
    assert_eq!(codes("Remote - US"), vec!["US"]);
    assert_eq!(codes("Vancouver, British Columbia"), vec!["CA"]);
    assert_eq!(codes("Toronto, ON, Canada"), vec!["CA"]);
    assert_eq!(codes("New York or Toronto, Canada"), vec!["CA", "US"]);
    assert!(codes("Remote").is_empty());
    assert!(codes("Berlin, Germany").is_empty());
}

#[test]
fn unknown_locations_follow_keep_unknown() {
    let filter = CountryFilter::default();
    assert!(is_allowed(&["Remote"], &filter, true));
    assert!(!is_allowed(&["Remote"], &filter, false));
    assert!(!is_allowed(&["Seattle, WA"], &CountryFilter::parse("CA"), true));
    assert!(is_allowed(&["Zurich, Switzerland"], &CountryFilter::parse("ALL"), false));
}

#[test]
fn first_matching_candidate_wins() {
    let filter = CountryFilter::parse("US");
    assert!(is_allowed(&["Bangalore, India", "San Jose, California"], &filter, false));
}

#[test]
fn seniority_and_management_are_trimmed() {
    let policy = FilterPolicy::for_target(Target::Greenhouse);
    let keywords = vec!["software engineer".to_string()];

    assert_eq!(policy.judge_title("Senior Software Engineer", &keywords), TitleVerdict::Senior);
    assert_eq!(policy.judge_title("Staff Software Engineer", &keywords), TitleVerdict::Senior);
    assert_eq!(
        policy.judge_title("Software Engineering Manager", &keywords),
        TitleVerdict::Manager
    );
    assert_eq!(policy.judge_title("Software Engineer Intern", &keywords), TitleVerdict::Internship);
    assert_eq!(policy.judge_title("Product Designer", &keywords), TitleVerdict::NotEngineering);
}

#[test]
fn early_career_markers_beat_the_trims() {
    let policy = FilterPolicy::for_target(Target::Greenhouse);
    let keywords = vec!["software engineer".to_string()];

    assert_eq!(policy.judge_title("New Grad Software Engineer II", &keywords), TitleVerdict::Keep);
    assert_eq!(policy.judge_title("Software Engineer I", &keywords), TitleVerdict::Keep);
}

#[test]
fn broad_adapters_accept_engineering_titles_and_interns() {
    let policy = FilterPolicy::for_target(Target::Amazon);
    let keywords = vec!["software engineer".to_string()];

    assert_eq!(policy.judge_title("Systems Development Engineer", &keywords), TitleVerdict::Keep);
    assert_eq!(policy.judge_title("SDE Intern", &keywords), TitleVerdict::Keep);
}

#[test]
fn ashby_is_new_grad_only() {
    let policy = FilterPolicy::for_target(Target::Ashby);
    let keywords: Vec<String> = Vec::new();

    assert_eq!(policy.judge_title("Backend Engineer", &keywords), TitleVerdict::NotEarlyCareer);
    assert_eq!(policy.judge_title("Backend Engineer, New Grad", &keywords), TitleVerdict::Keep);
    assert!(!policy.keep_unknown);
}
