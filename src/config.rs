use crate::anonymise::{DEFAULT_ALLOWED_HANDLE, DEFAULT_PLACEHOLDER};
use crate::api::DEFAULT_USER_AGENT;
use crate::query::SearchQuery;
use crate::tsv::DEFAULT_WRITE_BUFFER;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
pub const DEFAULT_LOOKUP_URL: &str = "https://api.twitter.com/1.1/statuses/lookup.json";
pub const DEFAULT_TARGET_USER_ID: &str = "219275799";
pub const DEFAULT_SAVE_LOCATION: &str = "../data/tweets.tsv";

/// When the request counter reaches `request_ceiling`, the rate-limit policy
/// decides between sleeping `cooldown` and stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitCfg {
    pub request_ceiling: u32,
    pub cooldown: Duration,
}

impl Default for RateLimitCfg {
    fn default() -> Self {
        Self { request_ceiling: 450, cooldown: Duration::from_secs(15 * 60) }
    }
}

/// Batch lookup shape for the reconciliation sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupCfg {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for LookupCfg {
    fn default() -> Self {
        Self { batch_size: 100, batch_delay: Duration::from_secs(1) }
    }
}

/// Dataset size floor: below `low` survivors, advise collecting `high - survivors`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Floor {
    pub low: usize,
    pub high: usize,
}

impl Default for Floor {
    fn default() -> Self {
        Self { low: 3600, high: 4500 }
    }
}

impl Floor {
    /// Replenishment target when `surviving` is below the floor.
    pub fn replenish_target(&self, surviving: usize) -> Option<usize> {
        (surviving < self.low).then(|| self.high.saturating_sub(surviving))
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct EtlOptions {
    pub search_url: String,
    pub lookup_url: String,
    pub query: SearchQuery,
    pub target_user_id: String,
    pub allowed_handle: String,
    pub placeholder: String,
    pub total_to_collect: usize,
    pub save_location: PathBuf,
    pub sync_output: Option<PathBuf>, // None: overwrite save_location
    pub rate_limit: RateLimitCfg,
    pub lookup: LookupCfg,
    pub floor: Floor,
    pub user_agent: String,
    pub progress: bool,
    pub write_buffer_bytes: usize,
    /// Let `synchronise` rewrite a file even though some rows could not be parsed
    /// (those rows are dropped from the output).
    pub allow_skipped_rows: bool,
}

impl Default for EtlOptions {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
            query: SearchQuery::default(),
            target_user_id: DEFAULT_TARGET_USER_ID.to_string(),
            allowed_handle: DEFAULT_ALLOWED_HANDLE.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            total_to_collect: 2000,
            save_location: PathBuf::from(DEFAULT_SAVE_LOCATION),
            sync_output: None,
            rate_limit: RateLimitCfg::default(),
            lookup: LookupCfg::default(),
            floor: Floor::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            progress: true,
            write_buffer_bytes: DEFAULT_WRITE_BUFFER,
            allow_skipped_rows: false,
        }
    }
}

impl EtlOptions {
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }
    pub fn with_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.lookup_url = url.into();
        self
    }
    pub fn with_query(mut self, query: SearchQuery) -> Self {
        self.query = query.normalize();
        self
    }
    pub fn with_target_user_id(mut self, id: impl AsRef<str>) -> Self {
        self.target_user_id = id.as_ref().trim().to_string();
        self
    }
    pub fn with_allowed_handle(mut self, handle: impl Into<String>) -> Self {
        self.allowed_handle = handle.into();
        self
    }
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
    pub fn with_total_to_collect(mut self, n: usize) -> Self {
        self.total_to_collect = n.max(1);
        self
    }
    pub fn with_save_location(mut self, path: impl AsRef<Path>) -> Self {
        self.save_location = path.as_ref().to_path_buf();
        self
    }
    pub fn with_sync_output(mut self, path: impl AsRef<Path>) -> Self {
        self.sync_output = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_rate_limit(mut self, request_ceiling: u32, cooldown: Duration) -> Self {
        self.rate_limit = RateLimitCfg { request_ceiling: request_ceiling.max(1), cooldown };
        self
    }
    pub fn with_lookup(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.lookup = LookupCfg { batch_size: batch_size.max(1), batch_delay };
        self
    }
    pub fn with_floor(mut self, low: usize, high: usize) -> Self {
        self.floor = Floor { low, high: high.max(low) };
        self
    }
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_allow_skipped_rows(mut self, yes: bool) -> Self {
        self.allow_skipped_rows = yes;
        self
    }
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    /// Destination of `synchronise`.
    pub fn sync_destination(&self) -> &Path {
        self.sync_output.as_deref().unwrap_or(&self.save_location)
    }

    /// Apply overrides from the environment:
    /// - TETL_REQUEST_CEILING: requests before the rate-limit policy is consulted
    /// - TETL_COOLDOWN_SECS: cooldown after a Continue decision
    /// - TETL_BATCH_DELAY_MS: pause between lookup batches
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(mut self) -> Self {
        fn read<T: std::str::FromStr>(var: &str) -> Option<T> {
            let raw = std::env::var(var).ok()?;
            match raw.trim().parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("{} is set but cannot be parsed: {:?}", var, raw);
                    None
                }
            }
        }
        if let Some(n) = read::<u32>("TETL_REQUEST_CEILING") {
            self.rate_limit.request_ceiling = n.max(1);
        }
        if let Some(s) = read::<u64>("TETL_COOLDOWN_SECS") {
            self.rate_limit.cooldown = Duration::from_secs(s);
        }
        if let Some(ms) = read::<u64>("TETL_BATCH_DELAY_MS") {
            self.lookup.batch_delay = Duration::from_millis(ms);
        }
        self
    }
}
