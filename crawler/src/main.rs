use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use crawler::{CrawlConfig, Crawler, HttpFetcher};
use search_core::persist::IndexPaths;
use search_core::{CrawlScope, Extractor, Stoplist};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Breadth-first crawl of one domain into a corpus snapshot")]
struct Cli {
    /// Seed URL; may be repeated
    #[arg(long = "seed")]
    seeds: Vec<String>,
    /// File with additional seed URLs (one per line, `#` comments)
    #[arg(long)]
    seeds_file: Option<PathBuf>,
    /// Directory the corpus snapshot is written to
    #[arg(long, default_value = "./data")]
    output: PathBuf,
    /// Maximum number of pages to visit (failures count)
    #[arg(long, default_value_t = 1000)]
    max_pages: usize,
    /// Only follow links whose host is this domain or one of its subdomains
    #[arg(long)]
    allowed_domain: Option<String>,
    /// Boilerplate phrases, one per line
    #[arg(long)]
    stoplist: Option<PathBuf>,
    /// Number of fetch workers
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// User-Agent string for robots.txt and page requests
    #[arg(long, default_value = crawler::config::DEFAULT_USER_AGENT)]
    user_agent: String,
    /// Honor robots.txt Allow/Disallow and Crawl-delay
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    respect_robots: bool,
    /// Write a snapshot after this many pages (0 = only at the end)
    #[arg(long, default_value_t = 100)]
    checkpoint_every: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let mut seeds = args.seeds.clone();
    if let Some(path) = &args.seeds_file {
        let f = File::open(path).with_context(|| format!("opening seeds file {}", path.display()))?;
        for line in BufReader::new(f).lines() {
            let s = line?.trim().to_string();
            if s.is_empty() || s.starts_with('#') {
                continue;
            }
            seeds.push(s);
        }
    }
    if seeds.is_empty() {
        return Err(anyhow!("no seeds given (use --seed or --seeds-file)"));
    }

    let scope = match &args.allowed_domain {
        Some(domain) => CrawlScope::for_domain(domain),
        None => CrawlScope::default(),
    };
    let stoplist = match &args.stoplist {
        Some(path) => Stoplist::from_file(path)?,
        None => Stoplist::default(),
    };
    tracing::info!(phrases = stoplist.len(), "stoplist loaded");

    let config = CrawlConfig {
        seeds,
        max_pages: args.max_pages,
        scope,
        concurrency: args.concurrency,
        timeout_secs: args.timeout_secs,
        user_agent: args.user_agent.clone(),
        respect_robots: args.respect_robots,
        checkpoint_every: args.checkpoint_every,
        ..CrawlConfig::default()
    };

    let fetcher = HttpFetcher::new(&config)?;
    let report = Crawler::new(config, fetcher, Extractor::new(stoplist))
        .with_checkpoints(IndexPaths::new(&args.output))
        .run()
        .await?;

    tracing::info!(
        output = %args.output.display(),
        documents = report.corpus.len(),
        visited = report.visit_order.len(),
        failed = report.stats.failed,
        "corpus snapshot written"
    );
    Ok(())
}
