//! Breadth-first crawl frontier: the to-visit queue, the visited set and the
//! predicates that decide which links are worth queueing at all.

use crate::canonical::CanonicalUrl;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Extensions of non-HTML resources that are never queued.
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[
    // images
    ".mng", ".pct", ".bmp", ".gif", ".jpg", ".jpeg", ".png", ".pst", ".psp", ".tif",
    ".tiff", ".ai", ".drw", ".dxf", ".eps", ".ps", ".svg",
    // audio
    ".mp3", ".wma", ".ogg", ".wav", ".ra", ".aac", ".mid", ".au", ".aiff",
    // video
    ".3gp", ".asf", ".asx", ".avi", ".mov", ".mp4", ".mpg", ".qt", ".rm", ".swf", ".wmv",
    ".m4a",
    // other
    ".css", ".pdf", ".doc", ".exe", ".bin", ".rss", ".zip", ".rar",
];

/// Which canonical URLs belong to the crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlScope {
    /// Host suffix, matched on a label boundary (`example.edu` admits `cs.example.edu`).
    /// `None` admits every host.
    pub allowed_domain: Option<String>,
    pub ignored_extensions: Vec<String>,
}

impl Default for CrawlScope {
    fn default() -> Self {
        Self {
            allowed_domain: None,
            ignored_extensions: DEFAULT_IGNORED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl CrawlScope {
    pub fn for_domain(domain: &str) -> Self {
        Self {
            allowed_domain: Some(domain.trim().trim_start_matches('.').to_lowercase()),
            ..Self::default()
        }
    }

    pub fn in_domain(&self, url: &CanonicalUrl) -> bool {
        let Some(host) = url.host() else { return false };
        match &self.allowed_domain {
            None => true,
            Some(suffix) => host == *suffix || host.ends_with(&format!(".{suffix}")),
        }
    }

    pub fn is_ignored_file(&self, url: &CanonicalUrl) -> bool {
        let path = url.path().to_lowercase();
        self.ignored_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
    }

    pub fn admits(&self, url: &CanonicalUrl) -> bool {
        self.in_domain(url) && !self.is_ignored_file(url)
    }
}

/// FIFO frontier. A URL is queued at most once over the frontier's lifetime
/// and the visited count never passes `max_pages`.
#[derive(Debug, Clone)]
pub struct Frontier {
    queue: VecDeque<CanonicalUrl>,
    queued: HashSet<CanonicalUrl>,
    visited: HashSet<CanonicalUrl>,
    visit_order: Vec<CanonicalUrl>,
    max_pages: usize,
}

impl Frontier {
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            visit_order: Vec::new(),
            max_pages,
        }
    }

    /// Appends to the tail unless the URL was already visited or queued.
    pub fn enqueue(&mut self, url: CanonicalUrl) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Pops the queue head. The URL stays in the seen set, so it can never be queued again.
    pub fn next(&mut self) -> Option<CanonicalUrl> {
        self.queue.pop_front()
    }

    pub fn mark_visited(&mut self, url: CanonicalUrl) {
        if self.visited.insert(url.clone()) {
            self.visit_order.push(url);
        }
    }

    /// Pops the next URL and marks it visited, unless the page budget is spent.
    pub fn dispatch(&mut self) -> Option<CanonicalUrl> {
        if self.budget_spent() {
            return None;
        }
        while let Some(url) = self.next() {
            if self.visited.contains(&url) {
                continue;
            }
            self.mark_visited(url.clone());
            return Some(url);
        }
        None
    }

    pub fn budget_spent(&self) -> bool {
        self.visited.len() >= self.max_pages
    }

    /// Either terminal condition: nothing left to visit or the budget is spent.
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty() || self.budget_spent()
    }

    pub fn is_visited(&self, url: &CanonicalUrl) -> bool {
        self.visited.contains(url)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Visited URLs in the order they were handed out.
    pub fn visit_order(&self) -> &[CanonicalUrl] {
        &self.visit_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::parse(s).unwrap()
    }

    #[test]
    fn never_queues_twice() {
        let mut f = Frontier::new(10);
        assert!(f.enqueue(url("http://a.edu/x")));
        assert!(!f.enqueue(url("http://A.edu/x/#frag")));
        let popped = f.dispatch().unwrap();
        assert!(!f.enqueue(popped));
        assert_eq!(f.pending(), 0);
    }

    #[test]
    fn budget_caps_visits() {
        let mut f = Frontier::new(2);
        for p in ["a", "b", "c"] {
            f.enqueue(url(&format!("http://a.edu/{p}")));
        }
        assert!(f.dispatch().is_some());
        assert!(f.dispatch().is_some());
        assert!(f.dispatch().is_none());
        assert_eq!(f.visited_count(), 2);
        assert!(f.is_exhausted());
    }

    #[test]
    fn scope_matches_label_boundary_and_extensions() {
        let scope = CrawlScope::for_domain("uic.edu");
        assert!(scope.admits(&url("https://cs.uic.edu/people")));
        assert!(scope.admits(&url("https://uic.edu/")));
        assert!(!scope.admits(&url("https://notuic.edu/")));
        assert!(!scope.admits(&url("https://cs.uic.edu/syllabus.PDF")));
        assert!(CrawlScope::default().admits(&url("https://anything.org/page")));
    }
}
