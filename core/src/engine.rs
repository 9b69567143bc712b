//! Query serving: lexical shortlist, relevance personalization, PageRank
//! rerank and truncation over one immutable index generation.

use crate::corpus::Corpus;
use crate::index::{IdfMode, InvertedIndex, SearchError};
use crate::pagerank::{TopicPageRank, DEFAULT_ALPHA, DEFAULT_ITERATIONS};
use crate::scorer::{Scorer, TfIdfScorer, WeightedBlend};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_RESULT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    pub alpha: f64,
    pub iterations: usize,
    /// Upper bound on the lexical shortlist handed to PageRank.
    pub max_candidates: usize,
    pub anchor_weight: f64,
    pub body_weight: f64,
    pub idf_mode: IdfMode,
    pub tokenizer: Tokenizer,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            iterations: DEFAULT_ITERATIONS,
            max_candidates: 200,
            anchor_weight: 0.8,
            body_weight: 0.2,
            idf_mode: IdfMode::Plain,
            tokenizer: Tokenizer::default(),
        }
    }
}

impl RankConfig {
    pub fn pagerank(&self) -> TopicPageRank {
        TopicPageRank::new(self.alpha, self.iterations)
    }
}

/// A crawl corpus together with the two field indexes built from it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub corpus: Corpus,
    pub anchor: Arc<InvertedIndex>,
    pub body: Arc<InvertedIndex>,
}

impl Generation {
    /// Ingests every non-duplicate document into the anchor and body indexes
    /// and finalizes both against the full corpus size.
    pub fn build(corpus: Corpus, config: &RankConfig) -> Self {
        let mut anchor = InvertedIndex::with_idf_mode(config.idf_mode);
        let mut body = InvertedIndex::with_idf_mode(config.idf_mode);
        let mut num_docs = 0u32;
        for doc in corpus.indexable() {
            anchor.ingest(doc.id, config.tokenizer.tokenize(&doc.anchor_field()));
            body.ingest(doc.id, config.tokenizer.tokenize(&doc.body_text));
            num_docs += 1;
        }
        anchor.finalize(num_docs);
        body.finalize(num_docs);
        tracing::info!(
            num_docs,
            anchor_terms = anchor.num_terms(),
            body_terms = body.num_terms(),
            edges = corpus.graph().len(),
            "generation built"
        );
        Self { corpus, anchor: Arc::new(anchor), body: Arc::new(body) }
    }

    pub fn num_indexed(&self) -> u32 {
        self.body.num_docs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub title: String,
    pub url: String,
    /// Personalized PageRank score.
    pub score: f64,
}

pub struct SearchEngine {
    generation: Arc<Generation>,
    scorer: Box<dyn Scorer>,
    pagerank: TopicPageRank,
    max_candidates: usize,
    tokenizer: Tokenizer,
}

impl SearchEngine {
    /// Anchor/body TF-IDF blend weighted by `config`.
    pub fn new(generation: Generation, config: &RankConfig) -> Self {
        let scorer = WeightedBlend::new()
            .with(config.anchor_weight, TfIdfScorer::new(generation.anchor.clone(), config.tokenizer))
            .with(config.body_weight, TfIdfScorer::new(generation.body.clone(), config.tokenizer));
        Self::with_scorer(generation, scorer, config)
    }

    /// Uses any other lexical or semantic scorer for the shortlist.
    pub fn with_scorer(generation: Generation, scorer: impl Scorer + 'static, config: &RankConfig) -> Self {
        Self {
            generation: Arc::new(generation),
            scorer: Box::new(scorer),
            pagerank: config.pagerank(),
            max_candidates: config.max_candidates.max(1),
            tokenizer: config.tokenizer,
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Ranked `(title, url)` hits. Blank queries give an empty list; the only
    /// error is querying an index that was never finalized.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self.hits(self.rank(query)?, limit))
    }

    /// Resolves the first `limit` entries of a ranking to titles and URLs.
    pub fn hits(&self, ranked: Vec<(DocId, f64)>, limit: usize) -> Vec<SearchHit> {
        let corpus = &self.generation.corpus;
        ranked
            .into_iter()
            .take(limit)
            .filter_map(|(doc_id, score)| {
                let doc = corpus.get(doc_id)?;
                Some(SearchHit { doc_id, title: doc.title.clone(), url: doc.url.to_string(), score })
            })
            .collect()
    }

    /// Full PageRank ordering of the shortlist, before truncation.
    pub fn rank(&self, query: &str) -> Result<Vec<(DocId, f64)>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut shortlist = self.scorer.score(query)?;
        shortlist.truncate(self.max_candidates);
        let total: f64 = shortlist.iter().map(|(_, s)| *s).sum();
        if total <= 0.0 {
            return Ok(Vec::new());
        }
        for entry in shortlist.iter_mut() {
            entry.1 /= total;
        }
        tracing::debug!(query, candidates = shortlist.len(), "reranking shortlist");
        Ok(self.pagerank.rerank(self.generation.corpus.graph(), &shortlist))
    }
}

/// The generation queries currently read from. Readers clone an `Arc` and
/// never see a half-built index; `replace` swaps in a new one atomically.
pub struct LiveEngine {
    current: RwLock<Arc<SearchEngine>>,
}

impl LiveEngine {
    pub fn new(engine: SearchEngine) -> Self {
        Self { current: RwLock::new(Arc::new(engine)) }
    }

    pub fn current(&self) -> Arc<SearchEngine> {
        self.current.read().clone()
    }

    /// Installs `engine` and returns the one it replaced.
    pub fn replace(&self, engine: SearchEngine) -> Arc<SearchEngine> {
        let next = Arc::new(engine);
        std::mem::replace(&mut *self.current.write(), next)
    }

    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.current().search(query, limit)
    }
}
