//! Atomic content: block embeds and inline line breaks

use crate::descriptor::Descriptor;
use crate::node::{Attributes, Node, NodeFlags, NodeId};
use crate::plugin::{NodeKind, ParseContext, Parsed};
use crate::tree::{Tree, ROOT_KIND};
use crate::vtree::VNode;
use crate::Builder;
use serde_json::Value;
use tracing::debug;

/// Block widget pointing at external media
pub struct Embed;

impl NodeKind for Embed {
    fn name(&self) -> &'static str {
        "embed"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::widget()
    }

    fn default_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("src".to_string(), Value::from(""));
        attributes
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        tree.kind(parent) == Some(ROOT_KIND)
    }

    fn render(&self, node: &Node, _children: Vec<Descriptor>) -> Option<Descriptor> {
        Some(Descriptor::element("img").with_attr("src", node.attribute_str("src").unwrap_or("")))
    }

    fn parse(&self, vnode: &VNode, builder: &mut Builder, _context: &ParseContext) -> Option<Parsed> {
        if vnode.tag() != Some("img") {
            return None;
        }
        let mut attributes = Attributes::new();
        attributes.insert(
            "src".to_string(),
            Value::from(vnode.attribute("src").unwrap_or("")),
        );
        builder.create(self.name(), attributes).map(Parsed::new)
    }

    fn on_mount(&self, node: &Node) {
        debug!(node = %node.id(), src = node.attribute_str("src").unwrap_or(""), "Embed mounted");
    }

    fn on_unmount(&self, node: &Node) {
        debug!(node = %node.id(), "Embed unmounted");
    }
}

/// Inline line break
pub struct HardBreak;

impl NodeKind for HardBreak {
    fn name(&self) -> &'static str {
        "hard_break"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::inline_widget()
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        tree.flags(parent).container
    }

    fn wrapper(&self) -> Option<&'static str> {
        Some("paragraph")
    }

    fn render(&self, _node: &Node, _children: Vec<Descriptor>) -> Option<Descriptor> {
        Some(Descriptor::element("br"))
    }

    fn parse(&self, vnode: &VNode, builder: &mut Builder, _context: &ParseContext) -> Option<Parsed> {
        if vnode.tag() != Some("br") {
            return None;
        }
        builder.create(self.name(), Attributes::new()).map(Parsed::new)
    }
}
