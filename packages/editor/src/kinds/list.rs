//! Lists: `list` > `list_item` > (`list_item_content`, optional nested `list`)

use crate::descriptor::Descriptor;
use crate::node::{Attributes, Node, NodeFlags, NodeId};
use crate::plugin::{Adoption, Join, NodeKind, ParseContext, Parsed};
use crate::tree::{Tree, ROOT_KIND};
use crate::vtree::VNode;
use crate::Builder;
use serde_json::Value;

const LIST: &str = "list";
const LIST_ITEM: &str = "list_item";
const LIST_ITEM_CONTENT: &str = "list_item_content";

fn style(attributes: &Attributes) -> &str {
    attributes.get("style").and_then(Value::as_str).unwrap_or("bullet")
}

fn style_attributes(style: &str) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("style".to_string(), Value::from(style));
    attributes
}

/// Another child of `parent` (besides `child`) has `kind`
fn has_other(tree: &Tree, parent: NodeId, child: NodeId, kind: &str) -> bool {
    tree.children(parent)
        .any(|c| c != child && tree.kind(c) == Some(kind))
}

pub struct List;

impl NodeKind for List {
    fn name(&self) -> &'static str {
        LIST
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::section().with_group()
    }

    fn default_attributes(&self) -> Attributes {
        style_attributes("bullet")
    }

    fn accept(&self, tree: &Tree, _parent: NodeId, child: NodeId) -> bool {
        tree.kind(child) == Some(LIST_ITEM)
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        matches!(tree.kind(parent), Some(ROOT_KIND) | Some(LIST_ITEM))
    }

    /// Adjacent lists of the same style merge
    fn join(&self, tree: &Tree, head: NodeId, tail: NodeId) -> Option<Join> {
        let (head, tail) = (tree.get(head)?, tree.get(tail)?);
        if tail.kind() != LIST || style(head.attributes()) != style(tail.attributes()) {
            return None;
        }
        Some(Join::default())
    }

    fn deletable(&self, tree: &Tree, node: NodeId) -> bool {
        tree.first_child(node).is_none()
    }

    fn adopt(&self, tree: &Tree, node: NodeId) -> Option<Adoption> {
        let parent = tree.parent(node)?;
        (tree.kind(parent)? == LIST).then(|| Adoption::Wrap {
            kind: LIST_ITEM,
            attributes: Attributes::new(),
        })
    }

    fn render(&self, node: &Node, children: Vec<Descriptor>) -> Option<Descriptor> {
        let tag = match style(node.attributes()) {
            "ordered" => "ol",
            _ => "ul",
        };
        Some(Descriptor::element(tag).with_children(children))
    }

    fn parse(&self, vnode: &VNode, builder: &mut Builder, _context: &ParseContext) -> Option<Parsed> {
        let style = match vnode.tag()? {
            "ul" => "bullet",
            "ol" => "ordered",
            _ => return None,
        };
        builder.create(LIST, style_attributes(style)).map(Parsed::new)
    }
}

pub struct ListItem;

impl NodeKind for ListItem {
    fn name(&self) -> &'static str {
        LIST_ITEM
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::default().with_group()
    }

    /// One content block and at most one nested list
    fn accept(&self, tree: &Tree, parent: NodeId, child: NodeId) -> bool {
        match tree.kind(child) {
            Some(LIST_ITEM_CONTENT) => !has_other(tree, parent, child, LIST_ITEM_CONTENT),
            Some(LIST) => !has_other(tree, parent, child, LIST),
            _ => false,
        }
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        tree.kind(parent) == Some(LIST)
    }

    fn wrapper(&self) -> Option<&'static str> {
        Some(LIST)
    }

    fn deletable(&self, tree: &Tree, node: NodeId) -> bool {
        tree.first_child(node).is_none()
    }

    fn adopt(&self, tree: &Tree, node: NodeId) -> Option<Adoption> {
        let parent = tree.parent(node)?;
        tree.flags(parent).section.then(|| Adoption::Wrap {
            kind: LIST,
            attributes: Attributes::new(),
        })
    }

    fn render(&self, _node: &Node, children: Vec<Descriptor>) -> Option<Descriptor> {
        Some(Descriptor::element("li").with_children(children))
    }

    /// `li` claims an item plus its content block; inline children land in
    /// the content block
    fn parse(&self, vnode: &VNode, builder: &mut Builder, _context: &ParseContext) -> Option<Parsed> {
        if vnode.tag() != Some("li") {
            return None;
        }
        let item = builder.create(LIST_ITEM, Attributes::new())?;
        let content = builder.create(LIST_ITEM_CONTENT, Attributes::new())?;
        builder.attach(item, content.into(), None);
        Some(Parsed::with_body(item, content))
    }
}

pub struct ListItemContent;

impl NodeKind for ListItemContent {
    fn name(&self) -> &'static str {
        LIST_ITEM_CONTENT
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::container()
    }

    fn accept(&self, tree: &Tree, _parent: NodeId, child: NodeId) -> bool {
        tree.flags(child).is_inline()
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        tree.kind(parent) == Some(LIST_ITEM)
    }

    fn wrapper(&self) -> Option<&'static str> {
        Some(LIST_ITEM)
    }

    fn adopt(&self, tree: &Tree, node: NodeId) -> Option<Adoption> {
        let parent = tree.parent(node)?;
        match tree.kind(parent)? {
            ROOT_KIND => Some(Adoption::Convert {
                kind: "paragraph",
                attributes: Attributes::new(),
            }),
            LIST => Some(Adoption::Wrap {
                kind: LIST_ITEM,
                attributes: Attributes::new(),
            }),
            _ => None,
        }
    }

    fn render(&self, _node: &Node, children: Vec<Descriptor>) -> Option<Descriptor> {
        Some(Descriptor::element("div").with_children(children))
    }
}

#[cfg(test)]
mod tests {
    use crate::json::JsonNode;
    use crate::node::Attributes;
    use crate::vtree::VNode;
    use crate::Builder;

    #[test]
    fn test_item_accepts_one_content_and_one_list() {
        let mut builder = Builder::default();
        let item = builder.create("list_item", Attributes::new()).unwrap();
        let first = builder.create("list_item_content", Attributes::new()).unwrap();
        let second = builder.create("list_item_content", Attributes::new()).unwrap();

        assert!(builder.accepts(item, first));
        builder.attach(item, first.into(), None);
        assert!(!builder.accepts(item, second));

        let nested = builder.create("list", Attributes::new()).unwrap();
        assert!(builder.accepts(item, nested));
    }

    #[test]
    fn test_same_style_lists_join() {
        let mut builder = Builder::default();
        let records = vec![
            JsonNode::new("list").with_attr("style", "bullet").with_body(vec![]),
            JsonNode::new("list").with_attr("style", "bullet").with_body(vec![]),
            JsonNode::new("list").with_attr("style", "ordered").with_body(vec![]),
        ];
        let nodes = builder.parse_json(&records).into_vec();
        let kind = builder.kind_of(nodes[0]).unwrap();
        let root = builder.root();
        builder.attach(root, nodes.clone().into(), None);

        assert!(kind.join(builder.tree(), nodes[0], nodes[1]).is_some());
        assert!(kind.join(builder.tree(), nodes[1], nodes[2]).is_none());
    }

    #[test]
    fn test_parse_nested_list_item() {
        let mut builder = Builder::default();
        let vnode = VNode::element("ul").with_child(
            VNode::element("li")
                .with_child(VNode::text("one"))
                .with_child(VNode::element("ol").with_child(VNode::element("li").with_child(VNode::text("two")))),
        );
        let fragment = builder.parse(&[vnode]);
        let list = fragment.first().unwrap();
        let record = builder.to_json(list).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "kind": "list",
                "style": "bullet",
                "body": [{
                    "kind": "list_item",
                    "body": [
                        {
                            "kind": "list_item_content",
                            "body": [{ "kind": "text", "content": "one", "modifiers": [] }]
                        },
                        {
                            "kind": "list",
                            "style": "ordered",
                            "body": [{
                                "kind": "list_item",
                                "body": [{
                                    "kind": "list_item_content",
                                    "body": [{ "kind": "text", "content": "two", "modifiers": [] }]
                                }]
                            }]
                        }
                    ]
                }]
            })
        );
    }
}
