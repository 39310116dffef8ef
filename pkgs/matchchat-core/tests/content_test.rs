// Normalization tests across every payload shape the backend is known to emit.

use matchchat_core::{linkify, MessageContent, TextSegment};
use serde_json::json;

#[test]
fn plain_string_passes_through() {
    let content = MessageContent::from_value(&json!("hello there"));
    assert_eq!(content.display_text(), "hello there");
}

#[test]
fn content_field_is_used() {
    let content = MessageContent::from_value(&json!({ "content": "ping" }));
    assert_eq!(content.display_text(), "ping");
}

#[test]
fn text_field_is_used() {
    let content = MessageContent::from_value(&json!({ "text": "pong" }));
    assert_eq!(content.display_text(), "pong");
}

#[test]
fn html_with_anchors_yields_hrefs_not_prose() {
    let content = MessageContent::from_value(&json!({
        "html": "<p>See <a href='http://x.co/a'>here</a></p>",
    }));
    assert_eq!(content.display_text(), "http://x.co/a");
}

#[test]
fn html_with_multiple_anchors_joins_hrefs() {
    let content = MessageContent::from_value(&json!({
        "html": "<a href=\"http://x.co/a\">a</a> and <a href=\"http://x.co/b\">b</a>",
    }));
    assert_eq!(content.display_text(), "http://x.co/a http://x.co/b");
}

#[test]
fn html_without_anchors_is_stripped() {
    let content = MessageContent::from_value(&json!({
        "html": "<p>Looking forward to <b>Tuesday</b></p>",
    }));
    assert_eq!(content.display_text(), "Looking forward to Tuesday");
}

#[test]
fn entities_join_their_urls() {
    let content = MessageContent::from_value(&json!({
        "entities": [
            { "url": "http://x.co/1" },
            { "href": "http://x.co/2" },
        ],
    }));
    assert_eq!(content.display_text(), "http://x.co/1 http://x.co/2");
}

#[test]
fn blocks_join_their_texts() {
    let content = MessageContent::from_value(&json!({
        "blocks": [
            { "text": "first" },
            { "text": "second" },
        ],
    }));
    assert_eq!(content.display_text(), "first second");
}

#[test]
fn deeply_nested_unknown_shape_collects_strings() {
    let content = MessageContent::from_value(&json!({
        "outer": { "inner": [{ "leaf": "found" }, { "other": "me" }] },
    }));
    assert_eq!(content.display_text(), "found me");
}

#[test]
fn empty_object_yields_empty_string() {
    let content = MessageContent::from_value(&json!({}));
    assert_eq!(content.display_text(), "");
}

#[test]
fn nothing_stringy_yields_empty_string() {
    let content = MessageContent::from_value(&json!({ "n": 4, "flag": true, "nil": null }));
    assert_eq!(content.display_text(), "");
}

#[test]
fn plain_text_ignored_when_html_present() {
    let content = MessageContent::from_value(&json!({
        "text": "See here",
        "html": "<a href='http://x.co/a'>here</a>",
    }));
    assert_eq!(content.display_text(), "http://x.co/a");
}

#[test]
fn linkify_handles_www_prefix_and_scheme() {
    let segments = linkify("http://x.co/a then www.example.org");
    assert_eq!(
        segments,
        vec![
            TextSegment::Link("http://x.co/a".to_string()),
            TextSegment::Plain(" then ".to_string()),
            TextSegment::Link("www.example.org".to_string()),
        ]
    );
}

#[test]
fn linkify_of_empty_string_is_empty() {
    assert!(linkify("").is_empty());
}
