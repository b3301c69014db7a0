//! Synonym-driven field extraction shared by every adapter that reads
//! provider JSON. Providers rename fields across versions and tenants, so each
//! canonical field is probed through an ordered list of candidate keys.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use url::Url;

use crate::models::job::RawPosting;

/// Ordered candidate keys for each canonical field. Keys match
/// case-insensitively; the first non-empty hit wins.
#[derive(Debug, Clone, Copy)]
pub struct Synonyms {
    pub title: &'static [&'static str],
    pub url: &'static [&'static str],
    pub location: &'static [&'static str],
    pub country: &'static [&'static str],
    pub posted: &'static [&'static str],
    pub id: &'static [&'static str],
}

pub const DEFAULT_SYNONYMS: Synonyms = Synonyms {
    title: &["title", "jobTitle", "name", "text", "postingTitle", "positionTitle"],
    url: &[
        "absolute_url",
        "hostedUrl",
        "jobUrl",
        "applyUrl",
        "url",
        "externalPath",
        "canonicalUrl",
        "detailUrl",
        "link",
        "href",
    ],
    location: &[
        "location",
        "locations",
        "locationName",
        "locationsText",
        "primaryLocation",
        "normalizedLocation",
        "city",
        "offices",
    ],
    country: &["country", "countryCode", "country_code", "countryName"],
    posted: &[
        "publishedAt",
        "publishedDate",
        "postedDate",
        "postingDate",
        "datePosted",
        "updated_at",
        "created_at",
        "createdAt",
        "updatedAt",
    ],
    id: &["id", "jobId", "job_id", "positionId", "reqId", "requisitionId"],
};

/// Value under the first synonym present in `obj`, compared case-insensitively.
pub fn first_value<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|wanted| {
        obj.iter()
            .find(|(key, value)| key.eq_ignore_ascii_case(wanted) && !is_blank(value))
            .map(|(_, value)| value)
    })
}

/// Wrapper objects some search APIs tuck per-job details into.
const DETAIL_WRAPPERS: [&str; 1] = ["properties"];

/// Like [`first_value`], but falls back to the job's detail wrapper objects
/// when the top level has none of the keys.
pub fn first_value_nested<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    first_value(obj, keys).or_else(|| {
        DETAIL_WRAPPERS.iter().find_map(|wrapper| match obj.get(*wrapper) {
            Some(Value::Object(inner)) => first_value(inner, keys),
            _ => None,
        })
    })
}

/// First synonym holding a non-empty string (numbers are stringified).
pub fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|wanted| {
        obj.iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .find_map(|(_, value)| scalar_string(value))
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flattens a location field into display strings. Handles plain strings,
/// objects with a name-like key, and lists of either.
pub fn location_strings(value: &Value) -> Vec<String> {
    const NAME_KEYS: [&str; 6] = ["name", "location", "displayName", "display", "text", "city"];

    let mut out = Vec::new();
    let mut push = |s: String| {
        if !out.contains(&s) {
            out.push(s);
        }
    };

    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(obj) => {
                        if let Some(name) = first_str(obj, &NAME_KEYS) {
                            push(name);
                        } else if let Some(Value::Object(inner)) = first_value(obj, &["location"])
                            && let Some(name) = first_str(inner, &NAME_KEYS)
                        {
                            push(name);
                        }
                    }
                    other => {
                        if let Some(s) = scalar_string(other) {
                            push(s);
                        }
                    }
                }
            }
        }
        Value::Object(obj) => {
            if let Some(name) = first_str(obj, &NAME_KEYS) {
                push(name);
            }
        }
        other => {
            if let Some(s) = scalar_string(other) {
                push(s);
            }
        }
    }

    out
}

/// Normalizes ISO-8601 timestamps, bare dates, epoch seconds and epoch
/// milliseconds into a calendar date.
pub fn parse_posted(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<NaiveDate> {
    let secs = if raw > 10_000_000_000 { raw / 1000 } else { raw };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(epoch) = raw.parse::<i64>() {
        return from_epoch(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Resolves a possibly relative or scheme-less link against the source host.
pub fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.starts_with("javascript:") {
        return None;
    }
    if raw.starts_with("//") {
        return Url::parse(&format!("https:{raw}")).ok().map(String::from);
    }
    base.join(raw).ok().map(String::from)
}

/// Maps one provider JSON object onto a `RawPosting` using a synonym table.
#[derive(Debug, Clone)]
pub struct JobShape {
    synonyms: Synonyms,
    base: Url,
    /// Path fragment a detail URL must contain, e.g. `/details/`.
    detail_fragment: Option<&'static str>,
    /// Detail URL template with an `{id}` placeholder, used when the object
    /// carries an id but no link.
    id_template: Option<String>,
}

impl JobShape {
    pub fn new(synonyms: Synonyms, base: Url) -> Self {
        JobShape {
            synonyms,
            base,
            detail_fragment: None,
            id_template: None,
        }
    }

    pub fn detail_fragment(mut self, fragment: &'static str) -> Self {
        self.detail_fragment = Some(fragment);
        self
    }

    pub fn id_template(mut self, template: Option<&str>) -> Self {
        self.id_template = template.map(String::from);
        self
    }

    fn link(&self, obj: &Map<String, Value>) -> Option<String> {
        let from_link = first_str(obj, self.synonyms.url)
            .and_then(|raw| resolve_url(&self.base, &raw))
            .filter(|url| self.detail_fragment.is_none_or(|frag| url.contains(frag)));

        from_link.or_else(|| {
            let template = self.id_template.as_deref()?;
            let id = first_str(obj, self.synonyms.id)?;
            resolve_url(&self.base, &template.replace("{id}", &id))
        })
    }

    /// `Some` when the object has both a title and a resolvable detail link.
    pub fn extract(&self, obj: &Map<String, Value>) -> Option<RawPosting> {
        let title = first_str(obj, self.synonyms.title)?;
        let url = self.link(obj)?;

        let locations = first_value_nested(obj, self.synonyms.location)
            .map(location_strings)
            .unwrap_or_default();
        let posted = self
            .synonyms
            .posted
            .iter()
            .filter_map(|key| first_value(obj, &[*key]))
            .find_map(parse_posted);

        let mut raw = RawPosting::new(title, url)
            .with_locations(locations)
            .with_posted(posted);
        if let Some(country) = first_str(obj, self.synonyms.country) {
            raw = raw.with_country(country);
        }
        Some(raw)
    }

    /// Depth-first walk over an arbitrary payload, collecting every object
    /// that looks like a job. Objects that match are not descended into.
    pub fn walk(&self, value: &Value) -> Vec<RawPosting> {
        let mut out = Vec::new();
        self.walk_into(value, &mut out, 0);
        out
    }

    fn walk_into(&self, value: &Value, out: &mut Vec<RawPosting>, depth: usize) {
        if depth > 24 {
            return;
        }
        match value {
            Value::Object(obj) => {
                if let Some(raw) = self.extract(obj) {
                    out.push(raw);
                    return;
                }
                for child in obj.values() {
                    self.walk_into(child, out, depth + 1);
                }
            }
            Value::Array(items) => {
                for child in items {
                    self.walk_into(child, out, depth + 1);
                }
            }
            _ => {}
        }
    }
}
