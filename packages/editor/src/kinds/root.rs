use crate::descriptor::Descriptor;
use crate::node::{Node, NodeFlags, NodeId};
use crate::plugin::NodeKind;
use crate::tree::{Tree, ROOT_KIND};

/// Document root: a section holding block content
pub struct Root;

impl NodeKind for Root {
    fn name(&self) -> &'static str {
        ROOT_KIND
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::section()
    }

    fn accept(&self, tree: &Tree, _parent: NodeId, child: NodeId) -> bool {
        tree.kind(child) != Some(ROOT_KIND) && tree.flags(child).is_block()
    }

    fn fit(&self, _tree: &Tree, _node: NodeId, _parent: NodeId) -> bool {
        false
    }

    fn render(&self, _node: &Node, children: Vec<Descriptor>) -> Option<Descriptor> {
        Some(
            Descriptor::element("div")
                .with_attr("data-folio-root", "true")
                .with_children(children),
        )
    }
}
