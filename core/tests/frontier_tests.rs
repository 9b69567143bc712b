use search_core::{CanonicalUrl, CrawlScope, Frontier};

fn url(s: &str) -> CanonicalUrl {
    CanonicalUrl::parse(s).unwrap()
}

#[test]
fn breadth_first_and_bounded() {
    let scope = CrawlScope::for_domain("example.edu");
    let mut frontier = Frontier::new(3);
    frontier.enqueue(url("http://example.edu/"));

    let seed = frontier.dispatch().unwrap();
    for child in ["http://example.edu/a", "http://example.edu/b", "http://other.org/x", "http://example.edu/a.pdf"] {
        let child = url(child);
        if scope.admits(&child) {
            frontier.enqueue(child);
        }
    }
    assert_eq!(frontier.pending(), 2);
    let a = frontier.dispatch().unwrap();
    // a links back to the seed and to b, neither is queued again
    assert!(!frontier.enqueue(seed.clone()));
    assert!(!frontier.enqueue(url("http://example.edu/b/")));
    frontier.enqueue(url("http://example.edu/c"));
    let b = frontier.dispatch().unwrap();
    assert!(frontier.dispatch().is_none());

    assert_eq!(frontier.visit_order(), &[seed, a, b]);
    assert_eq!(frontier.visit_order()[1].as_str(), "http://example.edu/a");
    assert_eq!(frontier.visited_count(), 3);
}
