//! Loads JSON/JSONL document dumps into a corpus snapshot.
//!
//! Three shapes are accepted:
//! - a JSON object keyed by URL, `{"<url>": {"title", "body", "atext"}}`
//! - a JSON array of records
//! - JSONL, one record per line
//!
//! where a record is `{"url", "title", "body", "atext"?, "links"?}`.

use anyhow::{Context, Result};
use search_core::corpus::FRAGMENT_SEPARATOR;
use search_core::{canonicalize, Corpus};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default, Deserialize)]
struct DumpEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    /// Anchor phrases joined with the fragment separator.
    #[serde(default)]
    atext: String,
}

#[derive(Debug, Deserialize)]
struct ImportRecord {
    url: String,
    #[serde(flatten)]
    entry: DumpEntry,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub records: usize,
    pub skipped: usize,
}

/// Every `.json`/`.jsonl` file under `input` (or `input` itself), sorted so
/// document ids do not depend on directory iteration order.
pub fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("input path {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file())
        .filter(|p| matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")))
        .collect();
    files.sort();
    Ok(files)
}

pub fn import_path(input: &Path, corpus: &mut Corpus) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    for file in input_files(input)? {
        let before = stats.records;
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            import_jsonl(&file, corpus, &mut stats)?;
        } else {
            import_json(&file, corpus, &mut stats)?;
        }
        stats.files += 1;
        tracing::info!(file = %file.display(), records = stats.records - before, "imported");
    }
    Ok(stats)
}

fn import_jsonl(file: &Path, corpus: &mut Corpus, stats: &mut ImportStats) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord =
            serde_json::from_str(&line).with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        add_record(record, corpus, stats);
    }
    Ok(())
}

fn import_json(file: &Path, corpus: &mut Corpus, stats: &mut ImportStats) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let json: serde_json::Value =
        serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parsing {}", file.display()))?;
    let single_record = json.get("url").is_some_and(serde_json::Value::is_string);
    match json {
        serde_json::Value::Array(items) => {
            for item in items {
                add_record(serde_json::from_value(item)?, corpus, stats);
            }
        }
        serde_json::Value::Object(_) if single_record => {
            add_record(serde_json::from_value(json)?, corpus, stats);
        }
        serde_json::Value::Object(_) => {
            // BTreeMap keeps id assignment stable across runs
            let dump: BTreeMap<String, DumpEntry> = serde_json::from_value(json)?;
            for (url, entry) in dump {
                add_record(ImportRecord { url, entry, links: Vec::new() }, corpus, stats);
            }
        }
        _ => tracing::warn!(file = %file.display(), "expected a JSON object or array, skipping"),
    }
    Ok(())
}

fn add_record(record: ImportRecord, corpus: &mut Corpus, stats: &mut ImportStats) {
    let url = match canonicalize(&record.url, None) {
        Ok(url) => url,
        Err(e) => {
            stats.skipped += 1;
            tracing::warn!(url = %record.url, error = %e, "skipping record");
            return;
        }
    };
    let id = corpus.resolve(&url);
    let DumpEntry { title, body, atext } = record.entry;
    if !title.is_empty() || !body.is_empty() {
        corpus.record_page(id, title, body, None);
    }
    for phrase in atext.split(FRAGMENT_SEPARATOR) {
        corpus.add_anchor_text(id, phrase.trim());
    }
    let base = url.to_url();
    for href in &record.links {
        match canonicalize(href, base.as_ref()) {
            Ok(child) => {
                corpus.add_link(&url, &child);
            }
            Err(e) => tracing::debug!(%href, error = %e, "discarding link"),
        }
    }
    stats.records += 1;
}
