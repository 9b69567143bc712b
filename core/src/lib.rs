pub mod canonical;
pub mod corpus;
pub mod engine;
pub mod extract;
pub mod frontier;
pub mod graph;
pub mod index;
pub mod pagerank;
pub mod persist;
pub mod scorer;
pub mod text;
pub mod tokenizer;

/// Stable document identity, assigned in first-sight order.
pub type DocId = u32;

pub use canonical::{canonicalize, CanonicalUrl, CanonicalizationError};
pub use corpus::{Corpus, Document, PageRecord};
pub use engine::{Generation, LiveEngine, RankConfig, SearchEngine, SearchHit};
pub use extract::{Anchor, Extraction, Extractor};
pub use frontier::{CrawlScope, Frontier};
pub use graph::{LinkEdge, LinkGraph};
pub use index::{IdfMode, InvertedIndex, Posting, SearchError, TermId};
pub use pagerank::TopicPageRank;
pub use scorer::{Scorer, TfIdfScorer, WeightedBlend};
pub use text::Stoplist;
pub use tokenizer::Tokenizer;
