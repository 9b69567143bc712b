use indexer::{build_index, import_corpus, query_index};
use search_core::persist::{load_corpus, load_meta, IndexPaths};
use search_core::{CanonicalUrl, IdfMode};
use std::fs;

const DUMP: &str = r#"{
    "https://cs.example.edu/courses/": {
        "atext": "course catalog . courses",
        "body": "undergraduate courses . graduate courses in computer science"
    },
    "https://cs.example.edu/people": {
        "atext": "faculty . people",
        "body": "faculty directory and office hours"
    },
    "https://cs.example.edu/news": {
        "atext": "news",
        "body": ""
    }
}"#;

const JSONL: &str = r#"{"url": "https://cs.example.edu/", "title": "Computer Science", "body": "welcome to computer science", "links": ["/courses", "/people", "mailto:x@example.edu"]}

{"url": "https://cs.example.edu/research#labs", "title": "Research", "body": "research labs and computer science groups", "atext": "research", "links": ["/people"]}
"#;

#[test]
fn imports_all_three_shapes() {
    let input = tempfile::tempdir().unwrap();
    fs::write(input.path().join("a_dump.json"), DUMP).unwrap();
    fs::write(input.path().join("b_records.jsonl"), JSONL).unwrap();
    fs::create_dir(input.path().join("nested")).unwrap();
    fs::write(
        input.path().join("nested/c_array.json"),
        r#"[{"url": "https://cs.example.edu/about", "title": "About", "body": "about the department"}]"#,
    )
    .unwrap();
    fs::write(input.path().join("notes.txt"), "ignored").unwrap();

    let out = tempfile::tempdir().unwrap();
    let (corpus, stats) = import_corpus(input.path(), out.path()).unwrap();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.records, 6);
    assert_eq!(stats.skipped, 0);

    let courses = corpus.lookup(&CanonicalUrl::parse("https://cs.example.edu/courses").unwrap()).unwrap();
    let doc = corpus.get(courses).unwrap();
    assert!(doc.anchor_text.contains("course catalog"));
    assert!(doc.body_text.contains("graduate courses"));

    let research = corpus.lookup(&CanonicalUrl::parse("https://cs.example.edu/research").unwrap()).unwrap();
    assert_eq!(corpus.get(research).unwrap().title, "Research");
    // home links to courses and people; research links to people
    assert_eq!(corpus.graph().len(), 3);

    let saved = load_corpus(&IndexPaths::new(out.path())).unwrap();
    assert_eq!(saved.documents(), corpus.documents());
}

#[test]
fn builds_and_queries_an_index() {
    let input = tempfile::tempdir().unwrap();
    let dump = input.path().join("records.jsonl");
    fs::write(&dump, JSONL).unwrap();
    let snapshot = tempfile::tempdir().unwrap();
    import_corpus(&dump, snapshot.path()).unwrap();

    let index = tempfile::tempdir().unwrap();
    let meta = build_index(snapshot.path(), index.path(), IdfMode::Smoothed).unwrap();
    assert_eq!(meta.num_docs, 4);
    assert_eq!(meta.num_edges, 3);
    assert_eq!(load_meta(&IndexPaths::new(index.path())).unwrap(), meta);
    assert_eq!(meta.idf_mode, IdfMode::Smoothed);

    let hits = query_index(index.path(), "computer science", 10).unwrap();
    assert!(!hits.is_empty());
    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert!(urls.contains(&"https://cs.example.edu/"));
    assert!(urls.contains(&"https://cs.example.edu/research"));

    assert!(query_index(index.path(), "", 10).unwrap().is_empty());
}

#[test]
fn missing_snapshot_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(build_index(&dir.path().join("nope"), dir.path(), IdfMode::Plain).is_err());
}
