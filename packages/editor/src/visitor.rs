use crate::node::Node;
use crate::tree::Tree;

/// Visitor pattern for traversing the document tree immutably
///
/// Default implementations walk the entire tree depth-first. Override
/// specific visit_* methods to act on nodes; call the matching walk_*
/// function to keep descending.
pub trait Visitor: Sized {
    fn visit_root(&mut self, tree: &Tree, root: &Node) {
        walk_children(self, tree, root);
    }

    /// Containers, sections and groups
    fn visit_block(&mut self, tree: &Tree, node: &Node) {
        walk_children(self, tree, node);
    }

    fn visit_widget(&mut self, _tree: &Tree, _node: &Node) {
        // Leaf node, no children to walk
    }

    /// Text runs and inline widgets
    fn visit_inline(&mut self, _tree: &Tree, _node: &Node) {
        // Leaf node, no children to walk
    }
}

pub fn walk_tree<V: Visitor>(visitor: &mut V, tree: &Tree) {
    if let Some(root) = tree.get(tree.root()) {
        visitor.visit_root(tree, root);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, tree: &Tree, node: &Node) {
    let flags = node.flags();
    if node.id() == tree.root() {
        visitor.visit_root(tree, node);
    } else if flags.widget {
        visitor.visit_widget(tree, node);
    } else if flags.container || flags.section || flags.group {
        visitor.visit_block(tree, node);
    } else {
        visitor.visit_inline(tree, node);
    }
}

pub fn walk_children<V: Visitor>(visitor: &mut V, tree: &Tree, node: &Node) {
    for child in tree.children(node.id()) {
        if let Some(child) = tree.get(child) {
            walk_node(visitor, tree, child);
        }
    }
}

/// Concatenated text of the document, one line per container
#[derive(Debug, Default)]
pub struct PlainText {
    lines: Vec<String>,
}

impl PlainText {
    pub fn collect(tree: &Tree) -> String {
        let mut visitor = Self::default();
        walk_tree(&mut visitor, tree);
        visitor.lines.join("\n")
    }
}

impl Visitor for PlainText {
    fn visit_block(&mut self, tree: &Tree, node: &Node) {
        if node.is_container() {
            self.lines.push(String::new());
        }
        walk_children(self, tree, node);
    }

    fn visit_inline(&mut self, _tree: &Tree, node: &Node) {
        if let Some(line) = self.lines.last_mut() {
            if node.is_inline_widget() {
                line.push(' ');
            } else {
                line.push_str(node.content());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonNode;
    use crate::Builder;

    #[test]
    fn test_plain_text_collects_containers() {
        let mut builder = Builder::default();
        let text = |content: &str| {
            JsonNode::new("text")
                .with_attr("content", content)
                .with_attr("modifiers", serde_json::json!([]))
        };
        let records = vec![
            JsonNode::new("paragraph").with_body(vec![text("one"), JsonNode::new("hard_break"), text("two")]),
            JsonNode::new("embed").with_attr("src", "x.png"),
            JsonNode::new("list").with_body(vec![JsonNode::new("list_item").with_body(vec![
                JsonNode::new("list_item_content").with_body(vec![text("three")]),
            ])]),
        ];
        let root = builder.root();
        let fragment = builder.parse_json(&records);
        builder.attach(root, fragment, None);

        assert_eq!(PlainText::collect(builder.tree()), "one two\nthree");
    }
}
