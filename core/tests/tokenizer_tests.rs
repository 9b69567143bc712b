use search_core::text::clean_text;
use search_core::Tokenizer;

#[test]
fn it_cleans_and_stems() {
    let words = Tokenizer::default().tokenize("Running Runners RUN! Courses & Programs.");
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"cours".to_string()));
    assert!(words.contains(&"program".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = Tokenizer::default().tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn queries_and_documents_share_analysis() {
    let t = Tokenizer::default();
    let doc = clean_text("  UNDERGRADUATE,\n\tCourses!");
    assert_eq!(t.tokenize(&doc), t.tokenize("undergraduate courses"));
}
