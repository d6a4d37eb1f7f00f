//! # Plugin Contract
//!
//! Every node kind supplies a [`NodeKind`] behavior table. The
//! [`PluginRegistry`] keys them by kind name and remembers registration
//! order, which decides who gets the first chance to claim an external node
//! during [`Builder::parse`](crate::Builder::parse).
//!
//! Structural predicates (`accept`, `fit`, `join`, `split`, `deletable`,
//! `adopt`) are pure: they inspect the tree and describe what should happen,
//! the [`Builder`](crate::Builder) and [`Normalizer`](crate::Normalizer)
//! carry it out.

use crate::descriptor::Descriptor;
use crate::json::JsonNode;
use crate::node::{Attributes, Node, NodeFlags, NodeId};
use crate::tree::Tree;
use crate::vtree::VNode;
use crate::Builder;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Outcome of a successful join: `head` absorbs `tail`.
///
/// The head takes `attributes` when given, the tail's children move to the
/// end of the head, and the tail is cut.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Join {
    pub attributes: Option<Attributes>,
}

/// Attribute sets for the two halves of a leaf split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    pub head: Attributes,
    pub tail: Attributes,
}

/// Result of the adopt (mutate) hook for a node its parent rejects
#[derive(Debug, Clone, PartialEq)]
pub enum Adoption {
    /// A fresh node of `kind` takes the position; the node moves inside it
    Wrap {
        kind: &'static str,
        attributes: Attributes,
    },
    /// A fresh node of `kind` takes the position and inherits the children
    Convert {
        kind: &'static str,
        attributes: Attributes,
    },
    /// Drop the node
    Delete,
}

/// Inherited state while parsing a virtual tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseContext {
    /// Text modifiers contributed by enclosing formatting tags
    pub modifiers: Vec<String>,
}

impl ParseContext {
    pub fn with_modifier(&self, modifier: &str) -> Self {
        let mut next = self.clone();
        if !next.modifiers.iter().any(|m| m == modifier) {
            next.modifiers.push(modifier.to_string());
        }
        next
    }
}

/// A node claimed from an external tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed {
    pub node: NodeId,
    /// Where the external node's children are appended
    pub body: NodeId,
}

impl Parsed {
    pub fn new(node: NodeId) -> Self {
        Self { node, body: node }
    }

    pub fn with_body(node: NodeId, body: NodeId) -> Self {
        Self { node, body }
    }
}

/// Behavior table for one node kind.
pub trait NodeKind {
    fn name(&self) -> &'static str;

    fn flags(&self) -> NodeFlags {
        NodeFlags::default()
    }

    /// Attributes every fresh node of this kind starts with
    fn default_attributes(&self) -> Attributes {
        Attributes::new()
    }

    /// Length the node contributes by itself
    fn leaf_length(&self, _attributes: &Attributes) -> usize {
        let flags = self.flags();
        usize::from(flags.widget || flags.inline_widget)
    }

    /// Atomic nodes have no body: children are neither parsed nor serialized
    fn atomic(&self) -> bool {
        let flags = self.flags();
        flags.widget || flags.inline_widget
    }

    /// May `child` live directly inside `parent` (a node of this kind)?
    fn accept(&self, _tree: &Tree, _parent: NodeId, _child: NodeId) -> bool {
        false
    }

    /// May `node` (of this kind) live directly inside `parent`?
    fn fit(&self, _tree: &Tree, _node: NodeId, _parent: NodeId) -> bool {
        true
    }

    /// Kind to wrap this node in when the target rejects it directly
    fn wrapper(&self) -> Option<&'static str> {
        None
    }

    /// Merge `tail` (the next sibling) into `head` (a node of this kind)
    fn join(&self, _tree: &Tree, _head: NodeId, _tail: NodeId) -> Option<Join> {
        None
    }

    /// Split a leaf at `offset` (strictly inside its content)
    fn split(&self, _tree: &Tree, _node: NodeId, _offset: usize) -> Option<SplitPlan> {
        None
    }

    /// Delete-if-empty
    fn deletable(&self, _tree: &Tree, _node: NodeId) -> bool {
        false
    }

    /// Transform for a node whose parent rejects it
    fn adopt(&self, _tree: &Tree, _node: NodeId) -> Option<Adoption> {
        None
    }

    /// Presentation descriptor given the children's descriptors.
    ///
    /// `None` means the node has no presentation.
    fn render(&self, node: &Node, children: Vec<Descriptor>) -> Option<Descriptor>;

    /// Claim a virtual-tree node
    fn parse(&self, _vnode: &VNode, _builder: &mut Builder, _context: &ParseContext) -> Option<Parsed> {
        None
    }

    /// Text modifier implied by a formatting tag
    fn parse_modifier(&self, _tag: &str) -> Option<&'static str> {
        None
    }

    /// Build a node from a serialized record of this kind
    fn parse_json(&self, record: &JsonNode, builder: &mut Builder) -> Option<NodeId> {
        builder.create(self.name(), record.attributes.clone())
    }

    /// Node became reachable from the root (containers and widgets only)
    fn on_mount(&self, _node: &Node) {}

    /// Node stopped being reachable from the root (containers and widgets only)
    fn on_unmount(&self, _node: &Node) {}
}

/// Registered node kinds, keyed by name, in registration order.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    kinds: Vec<Rc<dyn NodeKind>>,
    by_name: HashMap<&'static str, usize>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::kinds::register_defaults(&mut registry);
        registry
    }

    /// Register a kind. Re-registering a name replaces the previous
    /// behavior but keeps its position.
    pub fn register(&mut self, kind: impl NodeKind + 'static) -> &mut Self {
        let kind: Rc<dyn NodeKind> = Rc::new(kind);
        let name = kind.name();
        match self.by_name.get(name) {
            Some(index) => self.kinds[*index] = kind,
            None => {
                self.by_name.insert(name, self.kinds.len());
                self.kinds.push(kind);
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn NodeKind>> {
        self.by_name.get(name).map(|index| Rc::clone(&self.kinds[*index]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Kinds in registration order
    pub fn kinds(&self) -> Vec<Rc<dyn NodeKind>> {
        self.kinds.clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.kinds.iter().map(|k| k.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("kinds", &self.names())
            .finish()
    }
}
