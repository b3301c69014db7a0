use serde::{Deserialize, Serialize};
use url::form_urlencoded;

const PEOPLE_SEARCH: &str = "https://www.linkedin.com/search/results/people/?keywords=";
const EXCLUDE_SENIOR: &str = "NOT Senior NOT Staff NOT Principal NOT Manager";

/// People-search URLs attached to every emitted job, derived only from the
/// company and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkingLinks {
    #[serde(rename = "Entry_Level_SE_Search")]
    pub entry_level_search: String,
    #[serde(rename = "General_Role_Search")]
    pub general_role_search: String,
    #[serde(rename = "Alumni_Search_URL")]
    pub alumni_search: String,
}

pub fn quote_plus(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

fn people_search(keywords: &str) -> String {
    format!("{PEOPLE_SEARCH}{}", quote_plus(keywords))
}

pub fn networking_links(company: &str, title: &str) -> NetworkingLinks {
    let company = company.trim();
    let title = title.trim();

    NetworkingLinks {
        entry_level_search: people_search(&format!(
            "\"{company}\" \"Software Engineer\" {EXCLUDE_SENIOR}"
        )),
        general_role_search: people_search(&format!("\"{title}\" \"{company}\"")),
        alumni_search: people_search(&format!("\"{company}\" alumni")),
    }
}
