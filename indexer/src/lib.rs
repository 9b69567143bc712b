pub mod import;

use anyhow::{Context, Result};
use search_core::persist::{load_corpus, open_engine, save_corpus, save_generation, IndexPaths, MetaFile};
use search_core::{Corpus, Generation, IdfMode, RankConfig, SearchHit};
use std::path::Path;

pub use import::{import_path, ImportStats};

/// Builds the anchor and body indexes for the corpus snapshot in `corpus_dir`
/// and writes a servable index directory to `output`.
pub fn build_index(corpus_dir: &Path, output: &Path, idf_mode: IdfMode) -> Result<MetaFile> {
    let corpus = load_corpus(&IndexPaths::new(corpus_dir))
        .with_context(|| format!("loading corpus snapshot from {}", corpus_dir.display()))?;
    tracing::info!(documents = corpus.len(), edges = corpus.graph().len(), "corpus loaded");

    let config = RankConfig { idf_mode, ..RankConfig::default() };
    let generation = Generation::build(corpus, &config);
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    let meta = MetaFile::describe(&generation, config.tokenizer, created_at);

    save_generation(&IndexPaths::new(output), &generation, &meta)?;
    tracing::info!(output = %output.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(meta)
}

/// Reads document dumps under `input` into a fresh corpus snapshot at `output`.
pub fn import_corpus(input: &Path, output: &Path) -> Result<(Corpus, ImportStats)> {
    let mut corpus = Corpus::new();
    let stats = import_path(input, &mut corpus)?;
    save_corpus(&IndexPaths::new(output), &corpus)?;
    tracing::info!(
        files = stats.files,
        records = stats.records,
        skipped = stats.skipped,
        documents = corpus.len(),
        "corpus snapshot written"
    );
    Ok((corpus, stats))
}

pub fn query_index(index_dir: &Path, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let engine = open_engine(&IndexPaths::new(index_dir), &RankConfig::default())?;
    Ok(engine.search(query, limit)?)
}
