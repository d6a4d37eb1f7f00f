//! # Nodes
//!
//! The tree primitive. Nodes live in the [`Tree`](crate::Tree) arena and refer
//! to each other by [`NodeId`]; nothing holds a direct reference to another
//! node, so parent/child cycles never turn into ownership cycles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Type-specific key/values attached to a node.
///
/// Ordered so that serialized records are byte-for-byte deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Stable node identifier. Allocated monotonically per tree, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural flags declared by a node kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFlags {
    /// Editable block holding inline content directly
    pub container: bool,
    /// Atomic, non-editable block
    pub widget: bool,
    /// Layout grouping of containers/widgets (root, list)
    pub section: bool,
    /// Groups structurally related siblings (list, list item)
    pub group: bool,
    /// Atomic inline content (line breaks, mentions)
    pub inline_widget: bool,
}

impl NodeFlags {
    pub const fn container() -> Self {
        Self {
            container: true,
            widget: false,
            section: false,
            group: false,
            inline_widget: false,
        }
    }

    pub const fn widget() -> Self {
        Self {
            container: false,
            widget: true,
            section: false,
            group: false,
            inline_widget: false,
        }
    }

    pub const fn inline_widget() -> Self {
        Self {
            container: false,
            widget: false,
            section: false,
            group: false,
            inline_widget: true,
        }
    }

    pub const fn section() -> Self {
        Self {
            container: false,
            widget: false,
            section: true,
            group: false,
            inline_widget: false,
        }
    }

    pub const fn with_group(mut self) -> Self {
        self.group = true;
        self
    }

    /// Inline content: lives inside containers.
    pub fn is_inline(&self) -> bool {
        !self.container && !self.widget && !self.section && !self.group
    }

    /// Block content: lives inside sections.
    pub fn is_block(&self) -> bool {
        self.container || self.widget || self.section
    }

    /// Addressable by editing commands (caret can land in or on it).
    pub fn is_selectable(&self) -> bool {
        self.container || self.widget
    }
}

/// A document node.
///
/// Fields are crate-private: only the [`Builder`](crate::Builder) mutates
/// nodes, everything else reads them through the accessors.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: &'static str,
    pub(crate) attributes: Attributes,
    pub(crate) flags: NodeFlags,
    /// Length contributed by the node itself (text length, 1 for widgets)
    pub(crate) own_length: usize,
    /// Own length plus the length of every child
    pub(crate) length: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first: Option<NodeId>,
    pub(crate) last: Option<NodeId>,
    pub(crate) previous: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) mounted: bool,
    pub(crate) rendered: bool,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        kind: &'static str,
        attributes: Attributes,
        flags: NodeFlags,
        own_length: usize,
    ) -> Self {
        Self {
            id,
            kind,
            attributes,
            flags,
            own_length,
            length: own_length,
            parent: None,
            first: None,
            last: None,
            previous: None,
            next: None,
            mounted: false,
            rendered: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String attribute, if present and a string
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn own_length(&self) -> usize {
        self.own_length
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn previous(&self) -> Option<NodeId> {
        self.previous
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub fn has_children(&self) -> bool {
        self.first.is_some()
    }

    /// Reachable from the root through attached ancestors
    pub fn is_mount(&self) -> bool {
        self.mounted
    }

    /// Presentation counterpart is in sync
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn is_container(&self) -> bool {
        self.flags.container
    }

    pub fn is_widget(&self) -> bool {
        self.flags.widget
    }

    pub fn is_section(&self) -> bool {
        self.flags.section
    }

    pub fn is_group(&self) -> bool {
        self.flags.group
    }

    pub fn is_inline_widget(&self) -> bool {
        self.flags.inline_widget
    }

    /// Text content for text-like nodes (empty for everything else)
    pub fn content(&self) -> &str {
        self.attribute_str("content").unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_classes() {
        assert!(NodeFlags::container().is_block());
        assert!(NodeFlags::container().is_selectable());
        assert!(NodeFlags::default().is_inline());
        assert!(!NodeFlags::inline_widget().is_block());
        assert!(NodeFlags::inline_widget().is_inline());

        let list = NodeFlags::section().with_group();
        assert!(list.section && list.group);
        assert!(!list.is_selectable());
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(42).to_string(), "#42");
    }
}
