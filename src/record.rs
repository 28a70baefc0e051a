//! The institution record produced by the crawler

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static STATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]{2,}").expect("state token pattern is valid"));

/// One school as listed by the directory
///
/// Field order matches the output columns. `state` is derived from the
/// address and is not written to the results file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "URL")]
    pub url: String,

    #[serde(rename = "NAME")]
    pub name: String,

    #[serde(rename = "ADDRESS")]
    pub address: String,

    #[serde(rename = "CITY")]
    pub city: String,

    #[serde(skip)]
    pub state: String,

    #[serde(rename = "SCHOOL TYPE")]
    pub category: String,

    #[serde(rename = "LEVEL CODE")]
    pub level_code: String,
}

/// Column headers of the results file, in order
pub const COLUMNS: [&str; 7] = [
    "ID",
    "URL",
    "NAME",
    "ADDRESS",
    "CITY",
    "SCHOOL TYPE",
    "LEVEL CODE",
];

/// Returns the first run of two or more uppercase letters, taken as the
/// state abbreviation
pub fn find_state(address: &str) -> Option<&str> {
    STATE_TOKEN.find(address).map(|m| m.as_str())
}

/// Splits a raw listing address around its state abbreviation
///
/// Returns `(city, state, address)` where `city` is the text before the
/// first state token and `address` is rebuilt as `<city>, <STATE>, <rest>`
/// with empty parts dropped. Parts are trimmed of whitespace and commas.
pub fn split_address(raw: &str) -> Option<(String, String, String)> {
    let state = find_state(raw)?;

    let mut parts: Vec<&str> = raw.split(state).map(clean_part).collect();
    let city = parts.first().copied().unwrap_or_default().to_string();

    parts.retain(|part| !part.is_empty());
    parts.insert(parts.len().min(1), state);

    Some((city, state.to_string(), parts.join(", ")))
}

fn clean_part(part: &str) -> &str {
    part.trim().trim_matches(',').trim()
}
