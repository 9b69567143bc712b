//! Text cleaning and boilerplate filtering shared by page bodies, anchors and queries.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

/// Fragments with at least this many words survive a partial stoplist match.
pub const SHORT_FRAGMENT_WORDS: usize = 20;

lazy_static! {
    // ` -,` is a range: space through comma
    static ref DISALLOWED: Regex = Regex::new(r#"[^a-z0-9 -,.&"%$@()]"#).expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref SKIP_TO_CONTENT: Regex = Regex::new(r"^skip\sto\s.*content").expect("valid regex");
}

/// Lowercase, replace everything outside the allowed character set, collapse whitespace, trim.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let replaced = DISALLOWED.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&replaced, " ").trim().to_string()
}

/// Boilerplate phrases ("skip to main content", footer links, cookie banners...).
#[derive(Debug, Clone, Default)]
pub struct Stoplist {
    phrases: Vec<String>,
}

impl Stoplist {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = Vec::new();
        for phrase in phrases {
            let c = clean_text(phrase.as_ref());
            if !c.is_empty() && !cleaned.contains(&c) {
                cleaned.push(c);
            }
        }
        Self { phrases: cleaned }
    }

    /// Newline-delimited phrases; blank lines are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading stoplist {}", path.display()))?;
        Ok(Self::new(raw.lines()))
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Body rule: exact matches and "skip to ... content" always go; a
    /// containment match either way only drops short fragments.
    pub fn rejects_body(&self, fragment: &str) -> bool {
        if fragment.is_empty() || SKIP_TO_CONTENT.is_match(fragment) {
            return true;
        }
        let short = fragment.split_whitespace().count() < SHORT_FRAGMENT_WORDS;
        self.phrases.iter().any(|phrase| {
            phrase == fragment || (short && (fragment.contains(phrase.as_str()) || phrase.contains(fragment)))
        })
    }

    /// Anchor rule: no length-gated containment, only equality and the skip pattern.
    pub fn rejects_anchor(&self, fragment: &str) -> bool {
        fragment.is_empty() || SKIP_TO_CONTENT.is_match(fragment) || self.phrases.iter().any(|p| p == fragment)
    }
}
