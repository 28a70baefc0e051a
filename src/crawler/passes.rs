//! Pass planning
//!
//! Turns the filter configuration into the ordered list of URL slugs the
//! crawl walks, one pass per slug.

use crate::config::{Config, FilterConfig, SectorCode, Variant};

const JOINER: &str = "-and-";

/// One full crawl over a single level/sector slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    pub slug: String,
}

impl Pass {
    fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }

    /// Search URL for this pass under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.slug)
    }

    /// Human-readable description for log lines
    pub fn label(&self) -> String {
        self.slug.replace(['-', '/'], " ")
    }
}

/// Plans the passes for a crawl
pub fn plan_passes(config: &Config) -> Vec<Pass> {
    match config.variant {
        Variant::SectorLevel => plan_sector_level(&config.filter),
        Variant::SingleSector => plan_single_sector(&config.filter),
    }
}

fn level_slug(filter: &FilterConfig) -> Option<String> {
    join_keywords(filter.levels.iter().map(|level| level.keyword()))
}

fn join_keywords<'a>(keywords: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = keywords.collect::<Vec<_>>().join(JOINER);
    (!joined.is_empty()).then_some(joined)
}

fn with_level(prefix: &str, level: Option<&str>) -> String {
    match level {
        Some(level) => format!("{}/{}", prefix, level),
        None => prefix.to_string(),
    }
}

/// Catholic schools live under their own slug, so they get a pass of their own
fn plan_sector_level(filter: &FilterConfig) -> Vec<Pass> {
    let levels = level_slug(filter);
    let sectors = join_keywords(
        filter
            .sectors
            .iter()
            .filter(|sector| **sector != SectorCode::Catholic)
            .map(|sector| sector.keyword()),
    );

    let mut passes = Vec::new();

    match (&sectors, &levels) {
        (Some(sectors), levels) => passes.push(Pass::new(with_level(sectors, levels.as_deref()))),
        (None, Some(levels)) if filter.sectors.is_empty() => passes.push(Pass::new(levels.clone())),
        _ => {}
    }

    if filter.sectors.contains(&SectorCode::Catholic) {
        passes.push(Pass::new(with_level(
            SectorCode::Catholic.keyword(),
            levels.as_deref(),
        )));
    }

    passes
}

fn plan_single_sector(filter: &FilterConfig) -> Vec<Pass> {
    let levels = level_slug(filter);
    let sectors = join_keywords(filter.sectors.iter().map(|sector| sector.keyword()));

    let slug = match (sectors, levels) {
        (Some(sectors), levels) => with_level(&sectors, levels.as_deref()),
        (None, Some(levels)) => levels,
        (None, None) => return Vec::new(),
    };

    vec![Pass::new(slug)]
}
