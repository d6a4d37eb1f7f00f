//! Inline text runs.
//!
//! A run carries `content` and a list of `modifiers` (bold, italic, ...).
//! Adjacent runs with the same set of modifiers are merged by the normalizer.

use crate::descriptor::Descriptor;
use crate::node::{Attributes, Node, NodeId};
use crate::plugin::{Join, NodeKind, ParseContext, Parsed, SplitPlan};
use crate::tree::Tree;
use crate::vtree::VNode;
use crate::Builder;
use serde_json::Value;
use std::collections::BTreeSet;

pub struct Text;

fn modifiers(attributes: &Attributes) -> Vec<&str> {
    attributes
        .get("modifiers")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Modifiers compared as a set: order carries no meaning
fn same_modifiers(a: &Attributes, b: &Attributes) -> bool {
    let left: BTreeSet<&str> = modifiers(a).into_iter().collect();
    let right: BTreeSet<&str> = modifiers(b).into_iter().collect();
    left == right
}

fn with_content(attributes: &Attributes, content: &str) -> Attributes {
    let mut next = attributes.clone();
    next.insert("content".to_string(), Value::from(content));
    next
}

/// Wrap a descriptor in the element presenting one modifier
fn decorate(modifier: &str, inner: Descriptor) -> Descriptor {
    let element = match modifier {
        "bold" => Descriptor::element("strong"),
        "italic" => Descriptor::element("em"),
        "underline" => Descriptor::element("u"),
        "code" => Descriptor::element("code"),
        other => Descriptor::element("span").with_attr("class", other),
    };
    element.with_children(vec![inner])
}

impl NodeKind for Text {
    fn name(&self) -> &'static str {
        "text"
    }

    fn default_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("content".to_string(), Value::from(""));
        attributes.insert("modifiers".to_string(), Value::Array(Vec::new()));
        attributes
    }

    fn leaf_length(&self, attributes: &Attributes) -> usize {
        attributes
            .get("content")
            .and_then(Value::as_str)
            .map(|content| content.chars().count())
            .unwrap_or(0)
    }

    fn atomic(&self) -> bool {
        true
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        tree.flags(parent).container
    }

    fn wrapper(&self) -> Option<&'static str> {
        Some("paragraph")
    }

    fn join(&self, tree: &Tree, head: NodeId, tail: NodeId) -> Option<Join> {
        let (head, tail) = (tree.get(head)?, tree.get(tail)?);
        if tail.kind() != self.name() || !same_modifiers(head.attributes(), tail.attributes()) {
            return None;
        }
        let content = format!("{}{}", head.content(), tail.content());
        Some(Join {
            attributes: Some(with_content(head.attributes(), &content)),
        })
    }

    /// Split by character offset
    fn split(&self, tree: &Tree, node: NodeId, offset: usize) -> Option<SplitPlan> {
        let node = tree.get(node)?;
        let content = node.content();
        let (at, _) = content.char_indices().nth(offset)?;
        Some(SplitPlan {
            head: with_content(node.attributes(), &content[..at]),
            tail: with_content(node.attributes(), &content[at..]),
        })
    }

    fn deletable(&self, tree: &Tree, node: NodeId) -> bool {
        tree.get(node).map(|n| n.content().is_empty()).unwrap_or(false)
    }

    fn render(&self, node: &Node, _children: Vec<Descriptor>) -> Option<Descriptor> {
        let descriptor = modifiers(node.attributes())
            .into_iter()
            .rev()
            .fold(Descriptor::text(node.content()), |inner, modifier| decorate(modifier, inner));
        Some(descriptor)
    }

    fn parse(&self, vnode: &VNode, builder: &mut Builder, context: &ParseContext) -> Option<Parsed> {
        let VNode::Text { content } = vnode else {
            return None;
        };
        let modifiers: Vec<&str> = context.modifiers.iter().map(String::as_str).collect();
        builder.text_with(content, &modifiers).map(Parsed::new)
    }

    fn parse_modifier(&self, tag: &str) -> Option<&'static str> {
        match tag {
            "strong" | "b" => Some("bold"),
            "em" | "i" => Some("italic"),
            "u" => Some("underline"),
            "code" => Some("code"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_counts_characters() {
        let mut builder = Builder::default();
        let node = builder.text("héllo").unwrap();
        let plan = Text.split(builder.tree(), node, 2).unwrap();
        assert_eq!(plan.head.get("content"), Some(&Value::from("hé")));
        assert_eq!(plan.tail.get("content"), Some(&Value::from("llo")));
        assert_eq!(builder.tree().length(node), 5);
    }

    #[test]
    fn test_join_requires_identical_modifiers() {
        let mut builder = Builder::default();
        let a = builder.text_with("a", &["bold"]).unwrap();
        let b = builder.text_with("b", &["bold"]).unwrap();
        let c = builder.text("c").unwrap();

        let join = Text.join(builder.tree(), a, b).unwrap();
        assert_eq!(
            join.attributes.unwrap().get("content"),
            Some(&Value::from("ab"))
        );
        assert!(Text.join(builder.tree(), b, c).is_none());
    }

    #[test]
    fn test_join_ignores_modifier_order() {
        let mut builder = Builder::default();
        let a = builder.text_with("a", &["bold", "italic"]).unwrap();
        let b = builder.text_with("b", &["italic", "bold"]).unwrap();
        let c = builder.text_with("c", &["italic"]).unwrap();

        let join = Text.join(builder.tree(), a, b).unwrap();
        let attributes = join.attributes.unwrap();
        assert_eq!(attributes.get("content"), Some(&Value::from("ab")));
        assert_eq!(attributes.get("modifiers"), Some(&serde_json::json!(["bold", "italic"])));
        assert!(Text.join(builder.tree(), b, c).is_none());
    }

    #[test]
    fn test_render_nests_modifiers() {
        let mut builder = Builder::default();
        let node = builder.text_with("x", &["bold", "italic"]).unwrap();
        let rendered = Text.render(builder.tree().get(node).unwrap(), Vec::new()).unwrap();
        assert_eq!(
            rendered,
            Descriptor::element("strong").with_children(vec![
                Descriptor::element("em").with_children(vec![Descriptor::text("x")])
            ])
        );
    }

    #[test]
    fn test_parse_uses_context_modifiers() {
        let mut builder = Builder::default();
        let vnode = VNode::element("p").with_child(
            VNode::element("strong").with_child(VNode::text("loud")),
        );
        let paragraph = builder.parse(&[vnode]).first().unwrap();
        let text = builder.tree().first_child(paragraph).unwrap();
        let node = builder.tree().get(text).unwrap();
        assert_eq!(node.content(), "loud");
        assert_eq!(modifiers(node.attributes()), vec!["bold"]);
    }
}
