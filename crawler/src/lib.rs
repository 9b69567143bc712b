pub mod config;
pub mod crawl;
pub mod fetch;
pub mod robots;

pub use config::CrawlConfig;
pub use crawl::{CrawlReport, CrawlStats, Crawler};
pub use fetch::{FetchError, FetchedPage, Fetcher, HttpFetcher, ParseError};
