//! Lexical scoring strategies. Anything that maps a query to ranked
//! `(doc_id, score)` pairs can feed the PageRank stage, e.g. an embedding
//! similarity scorer living outside this crate.

use crate::index::{sort_ranked, InvertedIndex, SearchError};
use crate::tokenizer::Tokenizer;
use crate::DocId;
use std::collections::HashMap;
use std::sync::Arc;

pub trait Scorer: Send + Sync {
    /// Ranked descending by score, ties by ascending doc id.
    fn score(&self, query: &str) -> Result<Vec<(DocId, f64)>, SearchError>;
}

/// Cosine TF-IDF over a single indexed field.
#[derive(Debug, Clone)]
pub struct TfIdfScorer {
    index: Arc<InvertedIndex>,
    tokenizer: Tokenizer,
}

impl TfIdfScorer {
    pub fn new(index: Arc<InvertedIndex>, tokenizer: Tokenizer) -> Self {
        Self { index, tokenizer }
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }
}

impl Scorer for TfIdfScorer {
    fn score(&self, query: &str) -> Result<Vec<(DocId, f64)>, SearchError> {
        let tokens = self.tokenizer.tokenize(query);
        self.index.query(&tokens)
    }
}

/// Weighted average of independent scorers. A document missing from one
/// scorer's list counts as zero there.
pub struct WeightedBlend {
    parts: Vec<(f64, Box<dyn Scorer>)>,
}

impl WeightedBlend {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn with(mut self, weight: f64, scorer: impl Scorer + 'static) -> Self {
        self.parts.push((weight, Box::new(scorer)));
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for WeightedBlend {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for WeightedBlend {
    fn score(&self, query: &str) -> Result<Vec<(DocId, f64)>, SearchError> {
        let total_weight: f64 = self.parts.iter().map(|(w, _)| w.max(0.0)).sum();
        if total_weight <= 0.0 {
            return Ok(Vec::new());
        }
        let mut blended: HashMap<DocId, f64> = HashMap::new();
        for (weight, scorer) in &self.parts {
            if *weight <= 0.0 {
                continue;
            }
            for (doc, s) in scorer.score(query)? {
                *blended.entry(doc).or_insert(0.0) += weight * s;
            }
        }
        let mut ranked: Vec<(DocId, f64)> = blended
            .into_iter()
            .map(|(doc, s)| (doc, s / total_weight))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        sort_ranked(&mut ranked);
        Ok(ranked)
    }
}
