use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Number of workers in each pool
    #[serde(default = "default_thread_num")]
    pub thread_num: usize,

    /// Fetch each record's detail page to replace the short address
    #[serde(default)]
    pub full_address: bool,

    /// Which crawl flavour to run
    #[serde(default)]
    pub variant: Variant,

    /// How records are identified for deduplication
    #[serde(default)]
    pub dedup: DedupIdentity,

    /// Level codes to drop (single-sector variant)
    #[serde(default)]
    pub level_code_blacklist: HashSet<String>,

    /// School types to drop (single-sector variant)
    #[serde(default)]
    pub school_type_blacklist: HashSet<String>,

    pub filter: FilterConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl flavour
///
/// `SectorLevel` combines level and sector slugs, runs catholic schools as a
/// separate pass, reduces level codes to their initial and checkpoints
/// periodically. `SingleSector` runs one pass, sends a `distance` parameter
/// and filters records against the configured blacklists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    #[default]
    SectorLevel,
    SingleSector,
}

/// Record identity used by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupIdentity {
    /// Two records are the same when every field matches
    #[default]
    FullRecord,
    /// Two records are the same when their ids match
    Id,
}

/// Schooling level filter codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum LevelCode {
    #[serde(rename = "p")]
    Primary,
    #[serde(rename = "s")]
    Secondary,
    #[serde(rename = "c")]
    Combined,
}

impl LevelCode {
    /// Keyword used both in URL slugs and to match filter controls
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Combined => "combined",
        }
    }
}

/// Sector filter codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum SectorCode {
    #[serde(rename = "g")]
    Government,
    #[serde(rename = "i")]
    Independent,
    #[serde(rename = "c")]
    Catholic,
}

impl SectorCode {
    /// Keyword used both in URL slugs and to match filter controls
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Independent => "independent",
            Self::Catholic => "catholic",
        }
    }
}

/// Level and sector selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub levels: BTreeSet<LevelCode>,

    #[serde(default)]
    pub sectors: BTreeSet<SectorCode>,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Search root; pass slugs are appended as path segments
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search radius sent by the single-sector variant
    #[serde(default)]
    pub distance: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            distance: None,
        }
    }
}

/// Retry strategy for failed requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryMode {
    /// Retry until the request succeeds
    Unlimited,
    /// Give up after `max_attempts`
    #[default]
    Bounded,
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub retry: RetryMode,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds); doubles on each retry
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Upper bound for the retry delay (milliseconds)
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Header overrides merged over the built-in browser header set
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry: RetryMode::default(),
            max_attempts: default_max_attempts(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the dated results file
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Write a checkpoint every this many records (0 disables)
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Directory receiving per-state files
    #[serde(default = "default_states_dir")]
    pub states_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            checkpoint_interval: default_checkpoint_interval(),
            states_dir: default_states_dir(),
        }
    }
}

fn default_thread_num() -> usize {
    8
}

fn default_base_url() -> String {
    "https://www.goodschools.com.au/compare-schools/search".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_checkpoint_interval() -> usize {
    300
}

fn default_states_dir() -> PathBuf {
    PathBuf::from("./data/states")
}
