use crate::corpus::Corpus;
use crate::engine::{Generation, RankConfig, SearchEngine};
use crate::index::{IdfMode, InvertedIndex};
use crate::tokenizer::Tokenizer;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub num_edges: usize,
    pub created_at: String,
    pub version: u32,
    pub idf_mode: IdfMode,
    pub tokenizer: Tokenizer,
    /// Stamp shared by every artifact written alongside this meta file.
    #[serde(default)]
    pub generation: u64,
}

impl MetaFile {
    /// Summary of `generation` as written next to its artifacts.
    pub fn describe(generation: &Generation, tokenizer: Tokenizer, created_at: String) -> Self {
        Self {
            num_docs: generation.num_indexed(),
            num_terms: generation.body.num_terms(),
            num_edges: generation.corpus.graph().len(),
            created_at,
            version: FORMAT_VERSION,
            idf_mode: generation.body.idf_mode,
            tokenizer,
            generation: generation_stamp(),
        }
    }
}

fn generation_stamp() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0).max(1)
}

/// File layout of a crawl snapshot or an index directory. An index directory
/// carries its own copy of the corpus so it can be served on its own.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self) -> PathBuf { self.root.join("corpus.bin") }
    fn anchor_index(&self) -> PathBuf { self.root.join("anchor_index.bin") }
    fn body_index(&self) -> PathBuf { self.root.join("body_index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Each artifact is prefixed with the generation stamp it was written for, so
/// a directory caught halfway through a rewrite is detected on load.
fn save_bin<T: Serialize>(path: &Path, stamp: u64, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    // write-then-rename so readers never pick up a truncated file
    let tmp = path.with_extension("bin.tmp");
    {
        let mut f = BufWriter::new(File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?);
        bincode::serialize_into(&mut f, &(stamp, value))?;
        f.flush()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<(u64, T)> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let stamped = bincode::deserialize_from(BufReader::new(f)).with_context(|| format!("decoding {}", path.display()))?;
    Ok(stamped)
}

fn load_stamped<T: DeserializeOwned>(path: &Path, expected: u64) -> Result<T> {
    let (stamp, value) = load_bin(path)?;
    if stamp != expected {
        bail!("{} belongs to generation {stamp}, meta.json to {expected}; index directory is being rewritten", path.display());
    }
    Ok(value)
}

/// Crawl snapshots are not tied to a meta file and carry stamp 0.
pub fn save_corpus(paths: &IndexPaths, corpus: &Corpus) -> Result<()> {
    save_bin(&paths.corpus(), 0, corpus)
}

pub fn load_corpus(paths: &IndexPaths) -> Result<Corpus> {
    let (_, corpus) = load_bin(&paths.corpus())?;
    Ok(corpus)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Persists corpus, both field indexes and `meta`. The meta file goes last
/// and marks the directory as complete; every artifact carries
/// `meta.generation` so a reader racing the rewrite sees a mismatch instead of
/// a mixed index.
pub fn save_generation(paths: &IndexPaths, generation: &Generation, meta: &MetaFile) -> Result<()> {
    if !generation.anchor.is_finalized() || !generation.body.is_finalized() {
        bail!("refusing to persist an index that was not finalized");
    }
    save_bin(&paths.corpus(), meta.generation, &generation.corpus)?;
    save_bin(&paths.anchor_index(), meta.generation, generation.anchor.as_ref())?;
    save_bin(&paths.body_index(), meta.generation, generation.body.as_ref())?;
    save_meta(paths, meta)?;
    Ok(())
}

pub fn load_generation(paths: &IndexPaths) -> Result<(Generation, MetaFile)> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        bail!("index format version {} is not supported (expected {})", meta.version, FORMAT_VERSION);
    }
    let corpus: Corpus = load_stamped(&paths.corpus(), meta.generation)?;
    let anchor: InvertedIndex = load_stamped(&paths.anchor_index(), meta.generation)?;
    let body: InvertedIndex = load_stamped(&paths.body_index(), meta.generation)?;
    Ok((Generation { corpus, anchor: Arc::new(anchor), body: Arc::new(body) }, meta))
}

/// Loads an index directory into a ready-to-serve engine. The tokenizer and
/// idf mode recorded at build time override `config`.
pub fn open_engine(paths: &IndexPaths, config: &RankConfig) -> Result<SearchEngine> {
    let (generation, meta) = load_generation(paths)?;
    let config = RankConfig { tokenizer: meta.tokenizer, idf_mode: meta.idf_mode, ..config.clone() };
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, created_at = %meta.created_at, "index loaded");
    Ok(SearchEngine::new(generation, &config))
}
