use crate::descriptor::Descriptor;
use crate::node::{Attributes, Node, NodeFlags, NodeId};
use crate::plugin::{Adoption, NodeKind, ParseContext, Parsed};
use crate::tree::Tree;
use crate::vtree::VNode;
use crate::Builder;

/// Plain editable block
pub struct Paragraph;

impl NodeKind for Paragraph {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::container()
    }

    fn accept(&self, tree: &Tree, _parent: NodeId, child: NodeId) -> bool {
        tree.flags(child).is_inline()
    }

    fn fit(&self, tree: &Tree, _node: NodeId, parent: NodeId) -> bool {
        tree.flags(parent).section && tree.kind(parent) != Some("list")
    }

    fn adopt(&self, tree: &Tree, node: NodeId) -> Option<Adoption> {
        let parent = tree.parent(node)?;
        match tree.kind(parent)? {
            "list_item" => Some(Adoption::Convert {
                kind: "list_item_content",
                attributes: Attributes::new(),
            }),
            "list" => Some(Adoption::Wrap {
                kind: "list_item",
                attributes: Attributes::new(),
            }),
            _ => None,
        }
    }

    fn render(&self, _node: &Node, children: Vec<Descriptor>) -> Option<Descriptor> {
        Some(Descriptor::element("p").with_children(children))
    }

    fn parse(&self, vnode: &VNode, builder: &mut Builder, _context: &ParseContext) -> Option<Parsed> {
        if vnode.tag() != Some("p") {
            return None;
        }
        builder.create(self.name(), Attributes::new()).map(Parsed::new)
    }
}
