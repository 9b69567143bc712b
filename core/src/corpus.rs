//! Crawl-time document table, url -> id map and link graph.

use crate::canonical::CanonicalUrl;
use crate::graph::LinkGraph;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Separator used when joining extracted fragments into one field.
pub const FRAGMENT_SEPARATOR: &str = " . ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub url: CanonicalUrl,
    pub title: String,
    /// How other pages describe this one.
    pub anchor_text: BTreeSet<String>,
    pub body_text: String,
    /// SHA-1 of the page's visible text, set once fetched.
    pub fingerprint: Option<String>,
    /// Earlier document with identical content; duplicates are not indexed.
    pub duplicate_of: Option<DocId>,
}

impl Document {
    fn new(id: DocId, url: CanonicalUrl) -> Self {
        Self {
            id,
            url,
            title: String::new(),
            anchor_text: BTreeSet::new(),
            body_text: String::new(),
            fingerprint: None,
            duplicate_of: None,
        }
    }

    pub fn anchor_field(&self) -> String {
        self.anchor_text.iter().map(String::as_str).collect::<Vec<_>>().join(FRAGMENT_SEPARATOR)
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }
}

/// Outcome of attaching fetched content to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRecord {
    Fresh,
    Duplicate { of: DocId },
}

/// One crawl generation: every document is owned here and ids are handed out
/// in first-sight order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    docs: Vec<Document>,
    ids: HashMap<CanonicalUrl, DocId>,
    graph: LinkGraph,
    fingerprints: HashMap<String, DocId>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `url`, creating the document on first sight.
    pub fn resolve(&mut self, url: &CanonicalUrl) -> DocId {
        if let Some(&id) = self.ids.get(url) {
            return id;
        }
        let id = self.docs.len() as DocId;
        self.docs.push(Document::new(id, url.clone()));
        self.ids.insert(url.clone(), id);
        id
    }

    pub fn lookup(&self, url: &CanonicalUrl) -> Option<DocId> {
        self.ids.get(url).copied()
    }

    pub fn get(&self, id: DocId) -> Option<&Document> {
        self.docs.get(id as usize)
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    /// Documents that take part in indexing (duplicates excluded).
    pub fn indexable(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter().filter(|d| !d.is_duplicate())
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn graph(&self) -> &LinkGraph {
        &self.graph
    }

    /// Records `parent -> child`, creating either document if needed.
    /// Returns `(parent_id, child_id, inserted)`.
    pub fn add_link(&mut self, parent: &CanonicalUrl, child: &CanonicalUrl) -> (DocId, DocId, bool) {
        let p = self.resolve(parent);
        let c = self.resolve(child);
        let inserted = self.graph.add_edge(p, c);
        (p, c, inserted)
    }

    /// Attributes cleaned anchor text to the link target.
    pub fn add_anchor_text(&mut self, id: DocId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(doc) = self.docs.get_mut(id as usize) {
            doc.anchor_text.insert(text.to_string());
        }
    }

    /// Attaches fetched content. A non-empty fingerprint already owned by
    /// another document marks this one as its duplicate and leaves the body empty.
    pub fn record_page(&mut self, id: DocId, title: String, body_text: String, fingerprint: Option<String>) -> PageRecord {
        let original = fingerprint
            .as_ref()
            .and_then(|fp| self.fingerprints.get(fp).copied())
            .filter(|&of| of != id);
        let Some(doc) = self.docs.get_mut(id as usize) else {
            return PageRecord::Fresh;
        };
        doc.title = title;
        doc.fingerprint = fingerprint.clone();
        if let Some(of) = original {
            doc.duplicate_of = Some(of);
            return PageRecord::Duplicate { of };
        }
        doc.body_text = body_text;
        if let Some(fp) = fingerprint {
            self.fingerprints.insert(fp, id);
        }
        PageRecord::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::parse(s).unwrap()
    }

    #[test]
    fn equivalent_urls_share_an_id() {
        let mut corpus = Corpus::new();
        let a = corpus.resolve(&url("HTTP://Example.edu/a/?b=1&a=2"));
        let b = corpus.resolve(&url("http://example.edu/a?a=2&b=1#x"));
        assert_eq!(a, b);
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn links_create_documents_in_first_sight_order() {
        let mut corpus = Corpus::new();
        let (p, c, new) = corpus.add_link(&url("http://example.edu/"), &url("http://example.edu/x"));
        assert_eq!((p, c, new), (0, 1, true));
        let (_, _, again) = corpus.add_link(&url("http://example.edu/"), &url("http://example.edu/x"));
        assert!(!again);
        assert_eq!(corpus.graph().len(), 1);
    }

    #[test]
    fn duplicate_content_points_at_original() {
        let mut corpus = Corpus::new();
        let a = corpus.resolve(&url("http://example.edu/a"));
        let b = corpus.resolve(&url("http://example.edu/b"));
        let fp = Some("abc".to_string());
        assert_eq!(corpus.record_page(a, "A".into(), "body".into(), fp.clone()), PageRecord::Fresh);
        assert_eq!(corpus.record_page(b, "B".into(), "body".into(), fp), PageRecord::Duplicate { of: a });
        assert_eq!(corpus.indexable().count(), 1);
        assert!(corpus.get(b).unwrap().body_text.is_empty());
    }

    #[test]
    fn anchor_text_is_a_set() {
        let mut corpus = Corpus::new();
        let id = corpus.resolve(&url("http://example.edu/courses"));
        corpus.add_anchor_text(id, "courses");
        corpus.add_anchor_text(id, "courses");
        corpus.add_anchor_text(id, "all classes");
        assert_eq!(corpus.get(id).unwrap().anchor_field(), "all classes . courses");
    }
}
