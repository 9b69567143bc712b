use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub type TermId = u32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("index not ready: finalize() has not run since the last ingest")]
    IndexNotReady,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdfMode {
    /// `ln(N / df)`
    #[default]
    Plain,
    /// `ln(1 + N / df)`
    Smoothed,
}

impl IdfMode {
    pub fn idf(self, num_docs: u32, df: u32) -> f64 {
        let ratio = num_docs as f64 / df.max(1) as f64;
        match self {
            IdfMode::Plain => ratio.ln(),
            IdfMode::Smoothed => (1.0 + ratio).ln(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Raw in-document term count.
    pub tf: u32,
    /// `tf * idf`, filled by finalize.
    pub weight: f64,
}

/// TF-IDF inverted index. Ingest accumulates raw counts; `finalize` is the
/// single full-corpus pass that assigns idf, posting weights and document norms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    pub dictionary: HashMap<String, TermId>,
    pub df: Vec<u32>,
    pub idf: Vec<f64>,
    pub postings: Vec<Vec<Posting>>, // indexed by term id, sorted by doc_id
    /// Sum of squared tf-idf weights per document id.
    pub norms: Vec<f64>,
    pub num_docs: u32,
    pub idf_mode: IdfMode,
    finalized: bool,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idf_mode(idf_mode: IdfMode) -> Self {
        Self { idf_mode, ..Self::default() }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    /// Adds raw term counts for one document. Re-ingesting a document adds to its counts.
    pub fn ingest<I, S>(&mut self, doc_id: DocId, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
        for token in tokens {
            let tid = self.term_id_or_insert(token.as_ref());
            *counts.entry(tid).or_insert(0) += 1;
        }
        for (tid, tf) in counts {
            let plist = &mut self.postings[tid as usize];
            match plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
                Ok(pos) => plist[pos].tf += tf,
                Err(pos) => {
                    plist.insert(pos, Posting { doc_id, tf, weight: 0.0 });
                    self.df[tid as usize] += 1;
                }
            }
        }
        self.finalized = false;
    }

    fn term_id_or_insert(&mut self, term: &str) -> TermId {
        if let Some(&tid) = self.dictionary.get(term) {
            return tid;
        }
        let tid = self.postings.len() as TermId;
        self.dictionary.insert(term.to_string(), tid);
        self.postings.push(Vec::new());
        self.df.push(0);
        tid
    }

    /// Computes idf for every term against corpus size `num_docs`, posting
    /// weights and document norms. Always recomputes from the raw counts.
    pub fn finalize(&mut self, num_docs: u32) {
        self.num_docs = num_docs;
        let max_doc = self
            .postings
            .iter()
            .flat_map(|plist| plist.iter().map(|p| p.doc_id as usize + 1))
            .max()
            .unwrap_or(0);
        self.norms = vec![0.0; max_doc.max(num_docs as usize)];
        self.idf = self.df.iter().map(|&df| self.idf_mode.idf(num_docs, df)).collect();

        for (tid, plist) in self.postings.iter_mut().enumerate() {
            let idf = self.idf[tid];
            for p in plist.iter_mut() {
                p.weight = p.tf as f64 * idf;
                self.norms[p.doc_id as usize] += p.weight * p.weight;
            }
        }
        self.finalized = true;
        tracing::debug!(num_docs, num_terms = self.dictionary.len(), "index finalized");
    }

    pub fn idf_of(&self, term: &str) -> Option<f64> {
        let tid = *self.dictionary.get(term)?;
        self.idf.get(tid as usize).copied()
    }

    pub fn df_of(&self, term: &str) -> u32 {
        self.dictionary.get(term).map(|&tid| self.df[tid as usize]).unwrap_or(0)
    }

    pub fn postings_of(&self, term: &str) -> &[Posting] {
        self.dictionary
            .get(term)
            .map(|&tid| self.postings[tid as usize].as_slice())
            .unwrap_or(&[])
    }

    /// Cosine similarity between the query and every document sharing a term
    /// with it, descending by score, ties by ascending doc id. Documents whose
    /// similarity is not positive are left out.
    pub fn query<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<(DocId, f64)>, SearchError> {
        if !self.finalized {
            return Err(SearchError::IndexNotReady);
        }
        let mut query_tf: BTreeMap<TermId, u32> = BTreeMap::new();
        for t in tokens {
            if let Some(&tid) = self.dictionary.get(t.as_ref()) {
                *query_tf.entry(tid).or_insert(0) += 1;
            }
        }

        let mut query_length = 0.0f64;
        let mut scores: HashMap<DocId, f64> = HashMap::new();
        for (tid, count) in query_tf {
            let q_weight = count as f64 * self.idf[tid as usize];
            query_length += q_weight * q_weight;
            for p in &self.postings[tid as usize] {
                *scores.entry(p.doc_id).or_insert(0.0) += q_weight * p.weight;
            }
        }

        let mut ranked: Vec<(DocId, f64)> = scores
            .into_iter()
            .filter_map(|(doc_id, dot)| {
                let norm = self.norms.get(doc_id as usize).copied().unwrap_or(0.0);
                let denom = (query_length * norm).sqrt();
                let score = if denom > 0.0 { dot / denom } else { 0.0 };
                (score > 0.0 && score.is_finite()).then_some((doc_id, score))
            })
            .collect();
        sort_ranked(&mut ranked);
        Ok(ranked)
    }
}

/// Descending by score, ties broken by ascending doc id.
pub fn sort_ranked(ranked: &mut [(DocId, f64)]) {
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    fn cat_dog() -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        idx.ingest(0, toks("cat dog cat"));
        idx.ingest(1, toks("dog bird"));
        idx.finalize(2);
        idx
    }

    #[test]
    fn query_before_finalize_fails_fast() {
        let mut idx = InvertedIndex::new();
        idx.ingest(0, toks("cat"));
        assert_eq!(idx.query(&["cat"]), Err(SearchError::IndexNotReady));
    }

    #[test]
    fn idf_and_weights() {
        let idx = cat_dog();
        assert_eq!(idx.idf_of("dog"), Some(0.0));
        let ln2 = 2f64.ln();
        assert!((idx.idf_of("cat").unwrap() - ln2).abs() < 1e-12);
        assert!((idx.postings_of("cat")[0].weight - 2.0 * ln2).abs() < 1e-12);
        assert!((idx.norms[0] - 4.0 * ln2 * ln2).abs() < 1e-12);
    }

    #[test]
    fn refinalize_is_stable() {
        let mut idx = cat_dog();
        let before = idx.norms.clone();
        idx.finalize(2);
        assert_eq!(idx.norms, before);
    }

    #[test]
    fn unknown_and_empty_queries() {
        let idx = cat_dog();
        assert!(idx.query(&["zebra"]).unwrap().is_empty());
        assert!(idx.query::<&str>(&[]).unwrap().is_empty());
        // dog has idf 0, so nothing is similar
        assert!(idx.query(&["dog"]).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_doc_id() {
        let mut idx = InvertedIndex::new();
        idx.ingest(2, toks("apple"));
        idx.ingest(0, toks("apple"));
        idx.ingest(1, toks("pear"));
        idx.finalize(3);
        let ranked = idx.query(&["apple"]).unwrap();
        assert_eq!(ranked.iter().map(|r| r.0).collect::<Vec<_>>(), vec![0, 2]);
    }
}
