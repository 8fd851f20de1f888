use std::fs;
use url::Url;

use crate::extractor::{LinkExtractor, SourceDocument, excerpt, is_external, pingback_link};

const SOURCE_URL: &str = "http://another.example/2011/05/06/notes-on-pingbacks/";
const TARGET_URL: &str = "http://localhost:8000/2010/01/01/my-first-nodetype/";

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("src/extractor/tests/fixtures/{name}"))
        .expect("Failed to read test fixture")
}

fn source_document() -> SourceDocument {
    SourceDocument::parse(&fixture("source_post.html"), Url::parse(SOURCE_URL).unwrap())
}

#[test]
fn test_source_post_links_to_target() {
    let document = source_document();
    let target = Url::parse(TARGET_URL).unwrap();

    assert!(document.links_to(&target));
    assert_eq!(
        document.title(),
        Some("Notes on Pingbacks | Another Blog".to_string())
    );
}

#[test]
fn test_source_post_excerpt() {
    let document = source_document();
    let target = Url::parse(TARGET_URL).unwrap();

    assert_eq!(
        excerpt(&document, &target, 300),
        "Yesterday I read a very good introduction to the protocol, and it answered most of my questions."
    );

    let short = excerpt(&document, &target, 40);
    assert!(short.contains("a very good introduction"));
    assert!(short.starts_with("..."));
    assert!(short.ends_with("..."));
}

#[test]
fn test_external_links_of_source_post() {
    let extractor = LinkExtractor::parse(&fixture("source_post.html"));
    let site = Url::parse("http://another.example/").unwrap();
    let source = Url::parse(SOURCE_URL).unwrap();

    let external: Vec<String> = extractor
        .hrefs()
        .filter(|href| is_external(href, &site))
        .filter_map(|href| source.join(href).ok())
        .map(String::from)
        .collect();

    assert_eq!(
        external,
        vec![
            TARGET_URL.to_string(),
            "https://www.hixie.ch/specs/pingback/pingback".to_string(),
        ]
    );
}

#[test]
fn test_source_post_advertises_pingback_endpoint() {
    assert_eq!(
        pingback_link(&fixture("source_post.html")),
        Some("/xmlrpc/".to_string())
    );
    assert_eq!(pingback_link(&fixture("no_links.html")), None);
}

#[test]
fn test_plain_text_mentions_are_not_links() {
    let document = SourceDocument::parse(
        &fixture("no_links.html"),
        Url::parse(SOURCE_URL).unwrap(),
    );
    let target = Url::parse(TARGET_URL).unwrap();

    assert!(!document.links_to(&target));
    assert_eq!(document.title(), None);
    assert_eq!(excerpt(&document, &target, 100), "");
}
