use search_core::CrawlScope;
use serde::{Deserialize, Serialize};

pub const DEFAULT_USER_AGENT: &str = "topic-rank-bot/0.1 (+https://example.com/bot)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub seeds: Vec<String>,
    /// Hard cap on visited URLs, failures included.
    pub max_pages: usize,
    pub scope: CrawlScope,
    /// Number of fetch workers.
    pub concurrency: usize,
    /// Per-fetch deadline; an expired fetch is skipped, not retried.
    pub timeout_secs: u64,
    pub user_agent: String,
    pub respect_robots: bool,
    pub max_body_bytes: usize,
    /// Snapshot the corpus after this many completed pages; 0 disables.
    pub checkpoint_every: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            max_pages: 1000,
            scope: CrawlScope::default(),
            concurrency: 8,
            timeout_secs: 12,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            respect_robots: true,
            max_body_bytes: 2 * 1024 * 1024,
            checkpoint_every: 100,
        }
    }
}
