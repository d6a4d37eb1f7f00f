//! End-to-end editing scenarios driven through the engine

use folio_editor::{
    Attributes, Builder, Engine, EngineConfig, JsonNode, MemoryHost, Scheduler, Selection, Task, VNode,
    VirtualClock,
};
use serde_json::json;
use std::time::Duration;

fn engine() -> Engine<MemoryHost, VirtualClock> {
    Engine::new(MemoryHost::new(), VirtualClock::new(), EngineConfig::default())
}

fn document(engine: &mut Engine<MemoryHost, VirtualClock>) -> serde_json::Value {
    serde_json::to_value(engine.get_json()).unwrap()
}

fn records(value: serde_json::Value) -> Vec<JsonNode> {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_paragraph_with_text_serializes() {
    let mut engine = engine();
    let root = engine.root();
    let paragraph = engine.create("paragraph", Attributes::new()).unwrap();
    engine.append(root, paragraph, None);
    let text = engine.text("hi").unwrap();
    engine.append(paragraph, text, None);

    assert_eq!(
        document(&mut engine),
        json!([{ "kind": "paragraph", "body": [{ "kind": "text", "content": "hi", "modifiers": [] }] }])
    );
}

#[test]
fn test_text_split_keeps_container_length() {
    let mut builder = Builder::default();
    let root = builder.root();
    let paragraph = builder.create("paragraph", Attributes::new()).unwrap();
    builder.append(root, paragraph, None);
    let text = builder.text("hello").unwrap();
    builder.append(paragraph, text, None);

    let split = builder.split(text, 2);
    let (head, tail) = (split.head.unwrap(), split.tail.unwrap());

    let tree = builder.tree();
    assert_eq!(tree.get(head).unwrap().content(), "he");
    assert_eq!(tree.get(tail).unwrap().content(), "llo");
    assert_eq!(tree.next_sibling(head), Some(tail));
    assert_eq!(tree.length(paragraph), 5);
}

#[test]
fn test_undo_cut_list_restores_document_and_selection() {
    let mut engine = engine();
    let item = |text: &str| {
        json!({
            "kind": "list_item",
            "body": [{
                "kind": "list_item_content",
                "body": [{ "kind": "text", "content": text, "modifiers": [] }]
            }]
        })
    };
    engine.load_json(&records(json!([
        { "kind": "list", "style": "bullet", "body": [item("one"), item("two")] }
    ])));
    let before = engine.get_json();
    assert!(!engine.can_go_back());

    let caret = Selection::caret(vec![0, 1, 0, 0], 2);
    engine.select(Some(caret.clone()));
    let list = engine.tree().child_at(engine.root(), 0).unwrap();
    assert!(engine.cut(list));
    engine.select(Some(Selection::caret(vec![0, 0], 0)));
    assert!(engine.commit());

    assert_eq!(document(&mut engine), json!([{ "kind": "paragraph", "body": [] }]));

    assert!(engine.go_back().unwrap());
    assert_eq!(engine.get_json(), before);
    assert_eq!(engine.selection(), Some(caret));
}

#[test]
fn test_adjacent_texts_merge_in_one_pass() {
    let mut engine = engine();
    let root = engine.root();
    let paragraph = engine.create("paragraph", Attributes::new()).unwrap();
    engine.append(root, paragraph, None);
    let a = engine.text("foo").unwrap();
    let b = engine.text("bar").unwrap();
    engine.append(paragraph, a, None);
    engine.append(paragraph, b, None);

    let report = engine.normalize();
    assert_eq!(report.joined, 1);
    assert_eq!(engine.tree().child_count(paragraph), 1);
    let merged = engine.tree().first_child(paragraph).unwrap();
    assert_eq!(engine.tree().get(merged).unwrap().content(), "foobar");

    assert_eq!(engine.normalize().repairs(), 0);
}

#[test]
fn test_imported_markup_becomes_document() {
    let mut engine = engine();
    let markup = vec![
        VNode::element("p")
            .with_child(VNode::text("a"))
            .with_child(VNode::element("strong").with_child(VNode::text("b"))),
        VNode::element("section").with_child(
            VNode::element("ul").with_child(VNode::element("li").with_child(VNode::text("x"))),
        ),
    ];
    let fragment = engine.parse(&markup);
    let root = engine.root();
    engine.append_fragment(root, fragment, None);

    assert_eq!(
        document(&mut engine),
        json!([
            {
                "kind": "paragraph",
                "body": [
                    { "kind": "text", "content": "a", "modifiers": [] },
                    { "kind": "text", "content": "b", "modifiers": ["bold"] }
                ]
            },
            {
                "kind": "list",
                "style": "bullet",
                "body": [{
                    "kind": "list_item",
                    "body": [{
                        "kind": "list_item_content",
                        "body": [{ "kind": "text", "content": "x", "modifiers": [] }]
                    }]
                }]
            },
            { "kind": "paragraph", "body": [] }
        ])
    );
}

#[test]
fn test_typing_burst_commits_once() {
    let mut engine = engine();
    let root = engine.root();
    let paragraph = engine.create("paragraph", Attributes::new()).unwrap();
    engine.append(root, paragraph, None);
    engine.run_pending();

    for word in ["a", "b", "c"] {
        let text = engine.text(word).unwrap();
        engine.append(paragraph, text, None);
        engine.scheduler_mut().advance(Duration::from_millis(100));
        engine.run_pending();
    }
    assert!(engine.history().is_empty());
    assert!(engine.scheduler().is_scheduled(Task::Commit));

    engine.scheduler_mut().advance(Duration::from_millis(500));
    engine.run_pending();
    assert_eq!(engine.history().len(), 1);
    assert_eq!(engine.host().to_markup(), r#"<div data-folio-root="true"><p>abc</p></div>"#);

    assert!(engine.go_back().unwrap());
    assert!(engine.get_json().is_empty());
    assert!(engine.go_forward().unwrap());
    assert_eq!(
        document(&mut engine),
        json!([{ "kind": "paragraph", "body": [{ "kind": "text", "content": "abc", "modifiers": [] }] }])
    );
}

#[test]
fn test_widget_inside_paragraph_is_lifted() {
    let mut engine = engine();
    engine.load_json(&records(json!([
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "ab", "modifiers": [] }] }
    ])));
    let paragraph = engine.tree().child_at(engine.root(), 0).unwrap();
    let text = engine.tree().first_child(paragraph).unwrap();

    let mut attributes = Attributes::new();
    attributes.insert("src".to_string(), json!("cat.png"));
    let embed = engine.create("embed", attributes).unwrap();
    engine.edit(|builder| {
        let tail = builder.split(text, 1).tail;
        builder.attach(paragraph, embed.into(), tail)
    });

    assert_eq!(
        document(&mut engine),
        json!([
            { "kind": "paragraph", "body": [{ "kind": "text", "content": "a", "modifiers": [] }] },
            { "kind": "embed", "src": "cat.png" },
            { "kind": "paragraph", "body": [{ "kind": "text", "content": "b", "modifiers": [] }] }
        ])
    );
}

#[test]
fn test_widget_appended_into_paragraph_lands_after_it() {
    let mut engine = engine();
    engine.load_json(&records(json!([
        { "kind": "paragraph", "body": [{ "kind": "text", "content": "ab", "modifiers": [] }] }
    ])));
    let paragraph = engine.tree().child_at(engine.root(), 0).unwrap();
    let embed = engine.create("embed", Attributes::new()).unwrap();

    assert_eq!(engine.append(paragraph, embed, None), Some(engine.root()));
    assert_eq!(
        document(&mut engine),
        json!([
            { "kind": "paragraph", "body": [{ "kind": "text", "content": "ab", "modifiers": [] }] },
            { "kind": "embed", "src": "" },
            { "kind": "paragraph", "body": [] }
        ])
    );
}
