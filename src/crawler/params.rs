//! Query parameters for listing requests
//!
//! The site filters by opaque numeric ids that only appear on the landing
//! page's filter controls. Each pass derives its own [`ParamSet`] from the
//! landing page it fetched; sets are never shared or mutated across passes.

use crate::config::FilterConfig;
use crate::crawler::fetcher::Document;
use crate::{ParseError, ParseResult};
use scraper::{Html, Selector};
use std::collections::HashSet;

const SECTOR_INPUTS: &str = r#"input[name="sector_ids[]"]"#;
const LEVEL_INPUTS: &str = r#"input[name="school_level_ids[]"]"#;

/// An immutable set of query parameters for one pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamSet {
    pairs: Vec<(String, String)>,
}

impl ParamSet {
    /// Base parameters every listing request carries
    pub fn base(distance: Option<&str>) -> Self {
        let mut pairs = vec![("keywords".to_string(), String::new())];
        if let Some(distance) = distance {
            pairs.push(("distance".to_string(), distance.to_string()));
        }
        Self { pairs }
    }

    /// Returns a new set with `key=value` appended
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut pairs = self.pairs.clone();
        pairs.push((key.into(), value.into()));
        Self { pairs }
    }

    /// Query pairs for the given listing page
    pub fn with_page(&self, page: u32) -> Vec<(String, String)> {
        let mut pairs = self.pairs.clone();
        pairs.push(("page".to_string(), page.to_string()));
        pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Derives filter parameters from the landing page's controls
///
/// Every control whose `data-url-part` contains (case-insensitively) the
/// keyword of a configured code contributes one indexed entry:
/// `sector_ids[i]` or `school_level_ids[i]`. A control value seen twice is
/// only considered once.
pub fn build_params(landing: &Document, filter: &FilterConfig, base: &ParamSet) -> ParseResult<ParamSet> {
    let html = landing.html();

    let sector_keywords: Vec<&str> = filter.sectors.iter().map(|code| code.keyword()).collect();
    let level_keywords: Vec<&str> = filter.levels.iter().map(|code| code.keyword()).collect();

    let mut params = base.clone();
    for (key, value) in matching_controls(&html, SECTOR_INPUTS, "sector_ids", &sector_keywords)? {
        params = params.with(key, value);
    }
    for (key, value) in matching_controls(&html, LEVEL_INPUTS, "school_level_ids", &level_keywords)? {
        params = params.with(key, value);
    }

    tracing::debug!(
        "Derived {} filter parameters from {}",
        params.len() - base.len(),
        landing.url
    );

    Ok(params)
}

fn matching_controls(
    html: &Html,
    css: &'static str,
    name: &str,
    keywords: &[&str],
) -> ParseResult<Vec<(String, String)>> {
    let selector = Selector::parse(css).map_err(|_| ParseError::Selector(css.to_string()))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for input in html.select(&selector) {
        let Some(value) = input.value().attr("value") else {
            continue;
        };
        if !seen.insert(value) {
            continue;
        }

        let url_part = input
            .value()
            .attr("data-url-part")
            .unwrap_or_default()
            .to_lowercase();

        for keyword in keywords {
            if url_part.contains(keyword) {
                entries.push((format!("{}[{}]", name, entries.len()), value.to_string()));
            }
        }
    }

    Ok(entries)
}
