//! Structural audit of a document as loaded, without repairing it.

use crate::builder::Builder;
use crate::node::{Node, NodeId};
use crate::tree::{Path, Tree};
use crate::visitor::{walk_children, walk_tree, Visitor};
use serde::Serialize;
use std::fmt;

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Violation {
    /// Parent does not accept the node, or the node does not fit the parent
    Illegal {
        node: NodeId,
        kind: String,
        parent_kind: String,
        path: Path,
    },
    /// Adjacent siblings that should have been merged
    Unjoined { head: NodeId, tail: NodeId, path: Path },
    /// Node the normalizer would delete
    Empty { node: NodeId, kind: String, path: Path },
    /// Stored length disagrees with own length plus children
    Length { node: NodeId },
    /// Mount flag disagrees with reachability
    Mount { node: NodeId },
    /// The document does not end on an editable block
    Trailing,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Illegal {
                kind,
                parent_kind,
                path,
                ..
            } => write!(f, "{:?}: '{}' is not allowed inside '{}'", path, kind, parent_kind),
            Violation::Unjoined { path, .. } => {
                write!(f, "{:?}: sibling should have been merged into its predecessor", path)
            }
            Violation::Empty { kind, path, .. } => write!(f, "{:?}: empty '{}' node", path, kind),
            Violation::Length { node } => write!(f, "{}: stored length is stale", node),
            Violation::Mount { node } => write!(f, "{}: mount flag is stale", node),
            Violation::Trailing => write!(f, "document does not end on an editable block"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub nodes: usize,
    pub length: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Audit the mounted document held by `builder`
pub fn check(builder: &Builder) -> CheckReport {
    let tree = builder.tree();
    let mut checker = StructureChecker {
        builder,
        report: CheckReport::default(),
    };
    walk_tree(&mut checker, tree);

    let mut report = checker.report;
    report.length = tree.length(tree.root());
    let trailing_ok = tree.last_child(tree.root()).is_some_and(|last| tree.flags(last).container);
    if !trailing_ok {
        report.violations.push(Violation::Trailing);
    }
    report
        .violations
        .extend(tree.check_lengths().into_iter().map(|node| Violation::Length { node }));
    report
        .violations
        .extend(tree.check_mounts().into_iter().map(|node| Violation::Mount { node }));
    report
}

struct StructureChecker<'a> {
    builder: &'a Builder,
    report: CheckReport,
}

impl StructureChecker<'_> {
    fn inspect(&mut self, tree: &Tree, node: &Node) {
        self.report.nodes += 1;
        let (Some(parent), Some(kind)) = (node.parent(), self.builder.kind_of(node.id())) else {
            return;
        };
        let path = tree.path_of(node.id()).unwrap_or_default();
        let sole_in_container = tree.flags(parent).container
            && node.previous().is_none()
            && node.next().is_none();

        if !self.builder.accepts(parent, node.id()) {
            self.report.violations.push(Violation::Illegal {
                node: node.id(),
                kind: node.kind().to_string(),
                parent_kind: tree.kind(parent).unwrap_or("?").to_string(),
                path: path.clone(),
            });
        }
        if kind.deletable(tree, node.id()) && !sole_in_container {
            self.report.violations.push(Violation::Empty {
                node: node.id(),
                kind: node.kind().to_string(),
                path: path.clone(),
            });
        }
        if let Some(previous) = node.previous() {
            let joinable = self
                .builder
                .kind_of(previous)
                .and_then(|head| head.join(tree, previous, node.id()))
                .is_some();
            if joinable {
                self.report.violations.push(Violation::Unjoined {
                    head: previous,
                    tail: node.id(),
                    path,
                });
            }
        }
    }
}

impl Visitor for StructureChecker<'_> {
    fn visit_root(&mut self, tree: &Tree, root: &Node) {
        self.report.nodes += 1;
        walk_children(self, tree, root);
    }

    fn visit_block(&mut self, tree: &Tree, node: &Node) {
        self.inspect(tree, node);
        walk_children(self, tree, node);
    }

    fn visit_widget(&mut self, tree: &Tree, node: &Node) {
        self.inspect(tree, node);
    }

    fn visit_inline(&mut self, tree: &Tree, node: &Node) {
        self.inspect(tree, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::json::JsonNode;
    use crate::normalizer::Normalizer;

    fn text(content: &str) -> JsonNode {
        JsonNode::new("text")
            .with_attr("content", content)
            .with_attr("modifiers", serde_json::json!([]))
    }

    #[test]
    fn test_reports_violations_then_clean_after_normalize() {
        let mut builder = Builder::default();
        let mut normalizer = Normalizer::new(&mut builder, &EngineConfig::default());
        let records = vec![
            JsonNode::new("paragraph").with_body(vec![text("a"), text("b")]),
            JsonNode::new("list_item").with_body(vec![]),
            JsonNode::new("embed").with_attr("src", "x.png"),
        ];
        let root = builder.root();
        let fragment = builder.parse_json(&records);
        builder.attach(root, fragment, None);

        let report = check(&builder);
        assert!(report.violations.iter().any(|v| matches!(v, Violation::Unjoined { .. })));
        assert!(report.violations.iter().any(|v| matches!(v, Violation::Illegal { kind, .. } if kind == "list_item")));
        assert!(report.violations.contains(&Violation::Trailing));

        normalizer.normalize(&mut builder);
        let report = check(&builder);
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.length, 3);
    }
}
