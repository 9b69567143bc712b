//! Turns fetched markup into a title, deduplicated body fragments and outgoing anchors.

use crate::corpus::FRAGMENT_SEPARATOR;
use crate::text::{clean_text, Stoplist};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha1::{Digest, Sha1};
use std::collections::HashSet;

lazy_static! {
    static ref CONTENT_CLASS: Regex =
        Regex::new("(title|description|text|quote|course|intro|content)").expect("valid regex");
    static ref SEL_TITLE: Selector = Selector::parse("title").expect("valid selector");
    static ref SEL_HEADINGS: [Selector; 3] = [
        Selector::parse("h1").expect("valid selector"),
        Selector::parse("h2").expect("valid selector"),
        Selector::parse("h3").expect("valid selector"),
    ];
    static ref SEL_CONTAINERS: [Selector; 3] = [
        Selector::parse("div").expect("valid selector"),
        Selector::parse("section").expect("valid selector"),
        Selector::parse("span").expect("valid selector"),
    ];
    static ref SEL_INNER: Selector = Selector::parse("h1, h2, h3, title, p").expect("valid selector");
    static ref SEL_P: Selector = Selector::parse("p").expect("valid selector");
    static ref SEL_A: Selector = Selector::parse("a[href]").expect("valid selector");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Raw `href`, resolved and canonicalized by the caller.
    pub href: String,
    /// Cleaned anchor text; empty when the stoplist rejected it.
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub title: String,
    /// Unique cleaned fragments in first-seen order.
    pub body_fragments: Vec<String>,
    pub anchors: Vec<Anchor>,
    /// SHA-1 of all visible text; `None` for pages without any.
    pub fingerprint: Option<String>,
}

impl Extraction {
    pub fn body_text(&self) -> String {
        self.body_fragments.join(FRAGMENT_SEPARATOR)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    stoplist: Stoplist,
}

impl Extractor {
    pub fn new(stoplist: Stoplist) -> Self {
        Self { stoplist }
    }

    pub fn stoplist(&self) -> &Stoplist {
        &self.stoplist
    }

    pub fn extract(&self, markup: &str) -> Extraction {
        let doc = Html::parse_document(markup);

        let title = doc
            .select(&SEL_TITLE)
            .next()
            .map(|t| collapse_whitespace(&element_text(t)))
            .unwrap_or_default();

        let mut fragments = FragmentSet::default();
        for sel in SEL_HEADINGS.iter() {
            for heading in doc.select(sel).filter(|e| has_content_class(*e)) {
                fragments.push(clean_text(&element_text(heading)));
            }
        }
        for sel in SEL_CONTAINERS.iter() {
            for part in doc.select(sel).filter(|e| has_content_class(*e)) {
                for inner in part.select(&SEL_INNER) {
                    fragments.push(clean_text(&element_text(inner)));
                }
                fragments.push(clean_text(&element_text(part)));
            }
        }
        for p in doc.select(&SEL_P) {
            fragments.push(clean_text(&element_text(p)));
        }
        let body_fragments = fragments
            .items
            .into_iter()
            .filter(|f| !self.stoplist.rejects_body(f))
            .collect();

        let anchors = doc
            .select(&SEL_A)
            .filter_map(|a| {
                let href = a.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                let text = clean_text(&element_text(a));
                let text = if self.stoplist.rejects_anchor(&text) { String::new() } else { text };
                Some(Anchor { href: href.to_string(), text })
            })
            .collect();

        let visible = collapse_whitespace(&element_text(doc.root_element()));
        let fingerprint = (!visible.is_empty()).then(|| {
            let mut hasher = Sha1::new();
            hasher.update(visible.as_bytes());
            format!("{:x}", hasher.finalize())
        });

        Extraction { title, body_fragments, anchors, fingerprint }
    }
}

#[derive(Default)]
struct FragmentSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl FragmentSet {
    fn push(&mut self, fragment: String) {
        if !fragment.is_empty() && self.seen.insert(fragment.clone()) {
            self.items.push(fragment);
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

fn has_content_class(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|c| CONTENT_CLASS.is_match(c))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><head><title>  CS
        Department </title></head><body>
        <a href="/skip">Skip to main content</a>
        <h1 class="page-title">Welcome to Computer Science</h1>
        <h2 class="other">Ignored heading</h2>
        <div class="course-list"><h3>CS 101</h3><p>Intro to programming.</p></div>
        <p>Intro to programming.</p>
        <p>Contact us</p>
        <a href="https://cs.example.edu/courses">Course Catalog</a>
        <a href="#">  </a>
    </body></html>"##;

    fn extractor() -> Extractor {
        Extractor::new(Stoplist::new(["Contact Us"]))
    }

    #[test]
    fn extracts_title_and_content_fragments() {
        let ex = extractor().extract(PAGE);
        assert_eq!(ex.title, "CS Department");
        assert!(ex.body_fragments.contains(&"welcome to computer science".to_string()));
        assert!(ex.body_fragments.contains(&"cs 101".to_string()));
        assert!(!ex.body_fragments.iter().any(|f| f.contains("ignored heading")));
        assert!(!ex.body_fragments.iter().any(|f| f == "contact us"));
        let dupes = ex.body_fragments.iter().filter(|f| *f == "intro to programming.").count();
        assert_eq!(dupes, 1);
    }

    #[test]
    fn keeps_links_but_drops_boilerplate_anchor_text() {
        let ex = extractor().extract(PAGE);
        assert_eq!(ex.anchors.len(), 3);
        assert_eq!(ex.anchors[0], Anchor { href: "/skip".into(), text: String::new() });
        assert_eq!(ex.anchors[1].text, "course catalog");
        assert!(ex.fingerprint.is_some());
    }

    #[test]
    fn empty_markup_yields_empty_extraction() {
        let ex = extractor().extract("");
        assert!(ex.body_fragments.is_empty());
        assert!(ex.anchors.is_empty());
        assert_eq!(ex.fingerprint, None);
        assert_eq!(ex.body_text(), "");
    }
}
