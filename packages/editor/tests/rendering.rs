//! Host reconciliation through the engine

use folio_editor::{Engine, EngineConfig, Host, JsonNode, MemoryHost, VirtualClock, MARKER_ATTRIBUTE};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn loaded(value: serde_json::Value) -> Engine<MemoryHost, VirtualClock> {
    let mut engine = Engine::new(MemoryHost::new(), VirtualClock::new(), EngineConfig::default());
    let records: Vec<JsonNode> = serde_json::from_value(value).unwrap();
    engine.load_json(&records);
    engine.run_pending();
    engine
}

#[test]
fn test_document_renders_to_host() {
    let engine = loaded(json!([
        { "kind": "paragraph", "body": [
            { "kind": "text", "content": "a", "modifiers": ["bold", "italic"] },
            { "kind": "hard_break" },
            { "kind": "text", "content": "b<c", "modifiers": [] }
        ] },
        { "kind": "embed", "src": "x.png" },
        { "kind": "list", "style": "ordered", "body": [
            { "kind": "list_item", "body": [
                { "kind": "list_item_content", "body": [{ "kind": "text", "content": "one", "modifiers": [] }] }
            ] }
        ] }
    ]));

    assert_eq!(
        engine.host().to_markup(),
        format!(
            concat!(
                r#"<div data-folio-root="true">"#,
                "<p><strong><em>a</em></strong><br>b&lt;c</p>",
                r#"<img src="x.png">"#,
                "<ol><li><div>one</div></li></ol>",
                r#"<p><br {}="true"></p>"#,
                "</div>"
            ),
            MARKER_ATTRIBUTE
        )
    );
}

#[test]
fn test_appending_a_paragraph_reuses_siblings() {
    let mut engine = loaded(json!([
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "one", "modifiers": [] }] },
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "two", "modifiers": [] }] }
    ]));
    let root = engine.root();
    let first = engine.tree().child_at(root, 0).unwrap();
    let second = engine.tree().child_at(root, 1).unwrap();
    let (first_host, second_host) = (
        engine.renderer().host_for(first).unwrap(),
        engine.renderer().host_for(second).unwrap(),
    );
    engine.host_mut().reset_stats();

    engine.insert_json(
        root,
        &[JsonNode::new("paragraph").with_child(
            JsonNode::new("text")
                .with_attr("content", "middle")
                .with_attr("modifiers", json!([])),
        )],
        Some(second),
    );
    let (_, report) = engine.flush();

    assert_eq!(report.created, 2);
    assert_eq!(report.removed, 0);
    assert_eq!(engine.host().stats().removed, 0);
    assert_eq!(engine.renderer().host_for(first), Some(first_host));
    assert_eq!(engine.renderer().host_for(second), Some(second_host));
    assert_eq!(
        engine.host().to_markup(),
        r#"<div data-folio-root="true"><p>one</p><p>middle</p><p>two</p></div>"#
    );
}

#[test]
fn test_cleared_paragraph_shows_marker() {
    let mut engine = loaded(json!([
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "x", "modifiers": [] }] }
    ]));
    let root = engine.root();
    let paragraph = engine.tree().child_at(root, 0).unwrap();
    let text = engine.tree().first_child(paragraph).unwrap();

    engine.cut(text);
    engine.run_pending();
    assert_eq!(engine.renderer().markers(), 1);
    assert_eq!(
        engine.host().to_markup(),
        format!(r#"<div data-folio-root="true"><p><br {}="true"></p></div>"#, MARKER_ATTRIBUTE)
    );

    engine.go_back().unwrap();
    engine.run_pending();
    assert_eq!(engine.renderer().markers(), 0);
    assert_eq!(engine.host().to_markup(), r#"<div data-folio-root="true"><p>x</p></div>"#);
}

#[test]
fn test_host_mirrors_tree_after_undo() {
    let mut engine = loaded(json!([
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "keep", "modifiers": [] }] }
    ]));
    let root = engine.root();
    let embed = engine.create("embed", Default::default()).unwrap();
    let paragraph = engine.tree().child_at(root, 0).unwrap();
    engine.append(root, embed, Some(paragraph));
    engine.flush();
    engine.commit();

    engine.go_back().unwrap();
    engine.run_pending();

    let host_root = engine.host().root();
    assert_eq!(engine.host().children(host_root).len(), 1);
    assert_eq!(engine.host().to_markup(), r#"<div data-folio-root="true"><p>keep</p></div>"#);
}

#[test]
fn test_observers_follow_the_engine() {
    let mut engine = loaded(json!([
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "x", "modifiers": [] }] }
    ]));
    let paragraph = engine.tree().child_at(engine.root(), 0).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    engine.observe(paragraph, move |layout| sink.borrow_mut().push(layout.node));

    let text = engine.text("y").unwrap();
    engine.append(paragraph, text, None);
    engine.run_pending();
    assert_eq!(*seen.borrow(), vec![paragraph]);
    assert_eq!(engine.host().to_markup(), r#"<div data-folio-root="true"><p>xy</p></div>"#);
}
