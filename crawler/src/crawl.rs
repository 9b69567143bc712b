//! The crawl loop. One owner task holds the frontier and the corpus; a fixed
//! pool of workers asks it for URLs, fetches and extracts off the owner, and
//! hands back the extraction. Only the owner canonicalizes, dedups and
//! enqueues, so no URL is ever handed out twice.

use crate::config::CrawlConfig;
use crate::fetch::{FetchError, Fetcher};
use anyhow::{bail, Result};
use search_core::persist::{save_corpus, IndexPaths};
use search_core::{canonicalize, CanonicalUrl, Corpus, Extraction, Extractor, Frontier, PageRecord};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use url::Url;

enum WorkerMsg {
    /// The worker is idle; `None` on the reply channel tells it to stop.
    Ready(oneshot::Sender<Option<CanonicalUrl>>),
    Done(PageOutcome),
}

struct PageOutcome {
    url: CanonicalUrl,
    base: Option<Url>,
    result: Result<Extraction, FetchError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub fetched: usize,
    pub failed: usize,
    pub duplicates: usize,
    pub links_discarded: usize,
}

pub struct CrawlReport {
    pub corpus: Corpus,
    /// URLs in the order they were handed to workers.
    pub visit_order: Vec<CanonicalUrl>,
    pub stats: CrawlStats,
}

pub struct Crawler<F: Fetcher> {
    config: CrawlConfig,
    fetcher: Arc<F>,
    extractor: Arc<Extractor>,
    checkpoint: Option<IndexPaths>,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(config: CrawlConfig, fetcher: F, extractor: Extractor) -> Self {
        Self { config, fetcher: Arc::new(fetcher), extractor: Arc::new(extractor), checkpoint: None }
    }

    /// Periodically write the corpus snapshot to `paths`.
    pub fn with_checkpoints(mut self, paths: IndexPaths) -> Self {
        self.checkpoint = Some(paths);
        self
    }

    pub async fn run(self) -> Result<CrawlReport> {
        let mut owner = Owner {
            frontier: Frontier::new(self.config.max_pages),
            corpus: Corpus::new(),
            stats: CrawlStats::default(),
            waiting: VecDeque::new(),
            in_flight: 0,
            since_checkpoint: 0,
            config: &self.config,
            checkpoint: self.checkpoint.as_ref(),
        };
        for raw in &self.config.seeds {
            match canonicalize(raw, None) {
                Ok(seed) => {
                    owner.corpus.resolve(&seed);
                    owner.frontier.enqueue(seed);
                }
                Err(e) => tracing::warn!(seed = %raw, error = %e, "ignoring seed"),
            }
        }
        if owner.frontier.pending() == 0 {
            bail!("no valid seeds");
        }
        tracing::info!(
            seeds = owner.frontier.pending(),
            max_pages = self.config.max_pages,
            concurrency = self.config.concurrency,
            "crawl starting"
        );

        let workers = self.config.concurrency.max(1);
        let (tx, mut rx) = mpsc::channel::<WorkerMsg>(workers * 2);
        let fetch_timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(tokio::spawn(worker(
                tx.clone(),
                self.fetcher.clone(),
                self.extractor.clone(),
                fetch_timeout,
            )));
        }
        drop(tx);

        // ends once every worker has been told to stop and dropped its sender
        while let Some(msg) = rx.recv().await {
            match msg {
                WorkerMsg::Ready(reply) => owner.waiting.push_back(reply),
                WorkerMsg::Done(outcome) => {
                    owner.in_flight -= 1;
                    owner.absorb(outcome);
                    owner.maybe_checkpoint();
                }
            }
            owner.hand_out();
        }
        for h in handles {
            if let Err(e) = h.await {
                tracing::error!(error = %e, "crawl worker panicked");
            }
        }

        let stats = owner.stats;
        let visit_order = owner.frontier.visit_order().to_vec();
        let corpus = owner.corpus;
        if let Some(paths) = &self.checkpoint {
            save_corpus(paths, &corpus)?;
        }
        tracing::info!(
            visited = visit_order.len(),
            fetched = stats.fetched,
            failed = stats.failed,
            duplicates = stats.duplicates,
            documents = corpus.len(),
            edges = corpus.graph().len(),
            "crawl finished"
        );
        Ok(CrawlReport { corpus, visit_order, stats })
    }
}

struct Owner<'a> {
    frontier: Frontier,
    corpus: Corpus,
    stats: CrawlStats,
    waiting: VecDeque<oneshot::Sender<Option<CanonicalUrl>>>,
    in_flight: usize,
    since_checkpoint: usize,
    config: &'a CrawlConfig,
    checkpoint: Option<&'a IndexPaths>,
}

impl Owner<'_> {
    /// Gives queued URLs to idle workers. Idle workers are released only when
    /// nothing is in flight, since an in-flight page may still add links.
    fn hand_out(&mut self) {
        while let Some(reply) = self.waiting.pop_front() {
            if let Some(url) = self.frontier.dispatch() {
                tracing::debug!(%url, visited = self.frontier.visited_count(), "dispatching");
                match reply.send(Some(url)) {
                    Ok(()) => self.in_flight += 1,
                    Err(Some(url)) => {
                        self.stats.failed += 1;
                        tracing::warn!(%url, "worker went away before taking its url");
                    }
                    Err(None) => {}
                }
            } else if self.in_flight == 0 {
                let _ = reply.send(None);
            } else {
                self.waiting.push_front(reply);
                break;
            }
        }
    }

    fn absorb(&mut self, outcome: PageOutcome) {
        let PageOutcome { url, base, result } = outcome;
        let extraction = match result {
            Ok(extraction) => extraction,
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!(%url, error = %e, "fetch failed, skipping");
                return;
            }
        };

        let id = self.corpus.resolve(&url);
        let body = extraction.body_text();
        if let PageRecord::Duplicate { of } =
            self.corpus.record_page(id, extraction.title, body, extraction.fingerprint)
        {
            self.stats.duplicates += 1;
            tracing::info!(%url, original = of, "duplicate content, not following links");
            return;
        }
        self.stats.fetched += 1;

        let base = match base.or_else(|| url.to_url()) {
            Some(base) => base,
            None => return,
        };
        for anchor in extraction.anchors {
            let child = match canonicalize(&anchor.href, Some(&base)) {
                Ok(child) => child,
                Err(e) => {
                    self.stats.links_discarded += 1;
                    tracing::trace!(href = %anchor.href, error = %e, "discarding link");
                    continue;
                }
            };
            if !self.config.scope.admits(&child) {
                self.stats.links_discarded += 1;
                continue;
            }
            let (_, child_id, _) = self.corpus.add_link(&url, &child);
            self.corpus.add_anchor_text(child_id, &anchor.text);
            self.frontier.enqueue(child);
        }
        if self.frontier.visited_count() % 100 == 0 {
            tracing::info!(
                visited = self.frontier.visited_count(),
                frontier = self.frontier.pending(),
                documents = self.corpus.len(),
                "progress"
            );
        }
    }

    fn maybe_checkpoint(&mut self) {
        let Some(paths) = self.checkpoint else { return };
        if self.config.checkpoint_every == 0 {
            return;
        }
        self.since_checkpoint += 1;
        if self.since_checkpoint < self.config.checkpoint_every {
            return;
        }
        self.since_checkpoint = 0;
        match save_corpus(paths, &self.corpus) {
            Ok(()) => tracing::info!(documents = self.corpus.len(), root = %paths.root.display(), "checkpoint written"),
            Err(e) => tracing::warn!(error = %e, "checkpoint failed"),
        }
    }
}

async fn worker<F: Fetcher>(
    tx: mpsc::Sender<WorkerMsg>,
    fetcher: Arc<F>,
    extractor: Arc<Extractor>,
    fetch_timeout: Duration,
) {
    loop {
        let (reply_tx, reply_rx) = oneshot::channel();
        if tx.send(WorkerMsg::Ready(reply_tx)).await.is_err() {
            break;
        }
        let url = match reply_rx.await {
            Ok(Some(url)) => url,
            _ => break,
        };
        let outcome = process(url, fetcher.as_ref(), &extractor, fetch_timeout).await;
        if tx.send(WorkerMsg::Done(outcome)).await.is_err() {
            break;
        }
    }
}

async fn process<F: Fetcher>(url: CanonicalUrl, fetcher: &F, extractor: &Extractor, fetch_timeout: Duration) -> PageOutcome {
    // a long crawl delay must not eat into the request deadline
    if let Err(e) = fetcher.prepare(&url).await {
        return PageOutcome { url, base: None, result: Err(e) };
    }
    let page = match timeout(fetch_timeout, fetcher.fetch(&url)).await {
        Ok(Ok(page)) => page,
        Ok(Err(e)) => return PageOutcome { url, base: None, result: Err(e) },
        Err(_) => return PageOutcome { url, base: None, result: Err(FetchError::Timeout) },
    };
    let extraction = match page.markup() {
        Ok(markup) => extractor.extract(&markup),
        Err(e) => {
            tracing::warn!(%url, error = %e, "unparseable page, keeping it without content");
            Extraction::default()
        }
    };
    PageOutcome { url, base: page.final_url, result: Ok(extraction) }
}
