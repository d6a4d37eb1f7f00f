//! # Builder
//!
//! The only component that mutates the tree.
//!
//! ## Design
//!
//! - Insertion is validated: [`Builder::append`] walks up from the nominal
//!   parent to the nearest ancestor that accepts the node, inserting the
//!   kind's declared wrapper first when only the wrapper is acceptable.
//!   Nodes nobody accepts are dropped with a diagnostic.
//! - [`Builder::attach`] is the raw, unvalidated insertion used for exact
//!   reconstruction (history replay, JSON import, internal moves).
//! - Every structural or attribute change is published on the change bus
//!   with the current [`Origin`], a structural path and, for structural
//!   changes, a JSON snapshot of the affected subtrees.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut builder = Builder::new(PluginRegistry::with_defaults());
//! let root = builder.tree().root();
//! let paragraph = builder.create("paragraph", Attributes::new()).unwrap();
//! builder.append(root, paragraph, None);
//! let text = builder.text("hi").unwrap();
//! builder.append(paragraph, text, None);
//! ```

use crate::change::{Change, ChangeBus, Notification, Origin, SubscriptionId};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use crate::json::JsonNode;
use crate::node::{Attributes, NodeId};
use crate::plugin::{NodeKind, ParseContext, PluginRegistry};
use crate::tree::Tree;
use crate::vtree::VNode;
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;

/// Transient, parentless run of sibling nodes moved through one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    nodes: Vec<NodeId>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_vec(self) -> Vec<NodeId> {
        self.nodes
    }
}

impl From<NodeId> for Fragment {
    fn from(node: NodeId) -> Self {
        Self { nodes: vec![node] }
    }
}

impl From<Vec<NodeId>> for Fragment {
    fn from(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }
}

impl IntoIterator for Fragment {
    type Item = NodeId;
    type IntoIter = std::vec::IntoIter<NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Result of [`Builder::split`]. Either half is absent at content extremes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub head: Option<NodeId>,
    pub tail: Option<NodeId>,
}

/// Insertion point: before `anchor` in `parent` (at the end when `None`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent: NodeId,
    pub anchor: Option<NodeId>,
}

pub struct Builder {
    tree: Tree,
    registry: PluginRegistry,
    bus: ChangeBus,
    origin: Origin,
    diagnostics: Diagnostics,
}

impl Builder {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            tree: Tree::new(),
            registry,
            bus: ChangeBus::new(),
            origin: Origin::Edit,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Behavior table of a node's kind
    pub fn kind_of(&self, node: NodeId) -> Option<Rc<dyn NodeKind>> {
        self.tree.kind(node).and_then(|kind| self.registry.get(kind))
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Run `f` with changes attributed to `origin`
    pub fn with_origin<R>(&mut self, origin: Origin, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.origin, origin);
        let result = f(self);
        self.origin = previous;
        result
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&Notification) + 'static) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub(crate) fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached node of a registered kind
    pub fn create(&mut self, kind: &str, attributes: Attributes) -> Option<NodeId> {
        let Some(plugin) = self.registry.get(kind) else {
            self.diagnose(Diagnostic::warning(
                DiagnosticCode::UnknownKind,
                format!("cannot create node of unknown kind '{}'", kind),
            ));
            return None;
        };

        let mut merged = plugin.default_attributes();
        merged.extend(attributes);
        let own_length = plugin.leaf_length(&merged);
        Some(self.tree.allocate(plugin.name(), merged, plugin.flags(), own_length))
    }

    /// Create a detached, unformatted text node
    pub fn text(&mut self, content: &str) -> Option<NodeId> {
        self.text_with(content, &[])
    }

    /// Create a detached text node carrying `modifiers`
    pub fn text_with(&mut self, content: &str, modifiers: &[&str]) -> Option<NodeId> {
        let mut attributes = Attributes::new();
        attributes.insert("content".to_string(), Value::from(content));
        attributes.insert(
            "modifiers".to_string(),
            Value::Array(modifiers.iter().map(|m| Value::from(*m)).collect()),
        );
        self.create("text", attributes)
    }

    /// Deep copy of a node (detached)
    pub fn duplicate(&mut self, node: NodeId) -> Option<NodeId> {
        let record = self.to_json(node)?;
        self.parse_json(&[record]).first()
    }

    /// Drop a detached subtree from the arena
    pub fn release(&mut self, node: NodeId) -> usize {
        self.tree.remove_subtree(node)
    }

    // ------------------------------------------------------------------
    // Acceptance
    // ------------------------------------------------------------------

    /// Legal pairing: `parent` accepts `child` and `child` fits `parent`
    pub fn accepts(&self, parent: NodeId, child: NodeId) -> bool {
        match (self.kind_of(parent), self.kind_of(child)) {
            (Some(parent_kind), Some(child_kind)) => {
                parent_kind.accept(&self.tree, parent, child) && child_kind.fit(&self.tree, child, parent)
            }
            _ => false,
        }
    }

    /// Would `parent` accept a fresh node of `kind`?
    pub fn accepts_kind(&mut self, parent: NodeId, kind: &str) -> bool {
        let Some(probe) = self.create(kind, Attributes::new()) else {
            return false;
        };
        let accepted = self.accepts(parent, probe);
        self.tree.remove_subtree(probe);
        accepted
    }

    /// Nearest of `parent` and its ancestors accepting `node`
    pub fn can_accept(&self, parent: NodeId, node: NodeId) -> Option<NodeId> {
        std::iter::once(parent)
            .chain(self.tree.ancestors(parent))
            .find(|candidate| self.accepts(*candidate, node))
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Insert `node` before `anchor` (or at the end) in the nearest
    /// accepting ancestor of `parent`, wrapping it when needed.
    ///
    /// Returns the node's new parent, or `None` when the node was dropped.
    pub fn append(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) -> Option<NodeId> {
        if !self.tree.exists(parent) || !self.tree.exists(node) {
            self.diagnose(Diagnostic::warning(
                DiagnosticCode::StructuralRejection,
                format!("append of {} into {}: node not found", node, parent),
            ));
            return None;
        }
        if node == parent || node == self.tree.root() || self.tree.contains(node, parent) {
            self.diagnose(
                Diagnostic::warning(
                    DiagnosticCode::StructuralRejection,
                    format!("append of {} into {} would create a cycle", node, parent),
                )
                .with_node(node),
            );
            return None;
        }

        let wrapper = self.kind_of(node).and_then(|kind| kind.wrapper());
        let mut target = parent;
        let mut anchor = anchor.filter(|a| self.tree.parent(*a) == Some(parent));

        loop {
            if self.accepts(target, node) {
                self.attach(target, node.into(), anchor);
                return Some(target);
            }

            if let Some(wrapper_kind) = wrapper {
                if self.accepts_kind(target, wrapper_kind) {
                    let wrapped = self.create(wrapper_kind, Attributes::new())?;
                    debug!(node = %node, wrapper = wrapper_kind, target = %target, "Wrapping node on append");
                    self.attach(target, wrapped.into(), anchor);
                    self.attach(wrapped, node.into(), None);
                    return Some(wrapped);
                }
            }

            match self.tree.parent(target) {
                Some(up) => {
                    anchor = self.tree.next_sibling(target);
                    target = up;
                }
                None => break,
            }
        }

        let kind = self.tree.kind(node).unwrap_or("?");
        self.diagnose(
            Diagnostic::warning(
                DiagnosticCode::StructuralRejection,
                format!("no ancestor of {} accepts a '{}' node; dropped", parent, kind),
            )
            .with_node(node),
        );
        None
    }

    /// Append a run of nodes. Each node continues from where the previous
    /// one landed. Returns the nodes that were accepted.
    pub fn append_fragment(
        &mut self,
        parent: NodeId,
        fragment: Fragment,
        anchor: Option<NodeId>,
    ) -> Vec<NodeId> {
        let mut accepted = Vec::new();
        let mut target = parent;
        let mut anchor = anchor;

        for node in fragment {
            if let Some(landed) = self.append(target, node, anchor) {
                accepted.push(node);
                target = landed;
                anchor = self.tree.next_sibling(node);
            }
        }

        accepted
    }

    /// Raw insertion without acceptance checks. Attached nodes are cut
    /// from their current position first.
    ///
    /// Returns how many nodes were inserted.
    pub fn attach(&mut self, parent: NodeId, fragment: Fragment, anchor: Option<NodeId>) -> usize {
        if !self.tree.exists(parent) {
            return 0;
        }
        let mut anchor = anchor.filter(|a| self.tree.parent(*a) == Some(parent));
        let mut nodes = Vec::with_capacity(fragment.len());

        for node in fragment {
            if !self.tree.exists(node)
                || node == self.tree.root()
                || node == parent
                || self.tree.contains(node, parent)
            {
                self.diagnose(Diagnostic::warning(
                    DiagnosticCode::StructuralRejection,
                    format!("cannot attach {} into {}", node, parent),
                ));
                continue;
            }
            if self.tree.parent(node).is_some() {
                if anchor == Some(node) {
                    anchor = self.tree.next_sibling(node);
                }
                self.cut(node);
            }
            nodes.push(node);
        }

        let (Some(first), Some(last)) = (nodes.first().copied(), nodes.last().copied()) else {
            return 0;
        };

        for node in &nodes {
            self.tree.link(parent, *node, anchor);
            for id in self.tree.descendants(*node) {
                self.tree.set_rendered(id, false);
            }
        }

        let mounted = self.tree.is_mount(parent);
        let mut mounted_now = Vec::new();
        if mounted {
            for node in &nodes {
                mounted_now.extend(self.tree.set_mounted(*node, true));
            }
        }
        self.tree.invalidate(parent);

        let path = if mounted { self.tree.path_of(first) } else { None };
        let records = if path.is_some() {
            nodes.iter().filter_map(|n| self.to_json(*n)).collect()
        } else {
            Vec::new()
        };

        let change = Change::Append {
            parent,
            previous: self.tree.previous_sibling(first),
            next: self.tree.next_sibling(last),
            nodes: nodes.clone(),
            path,
            records,
        };
        self.emit(change);
        self.run_mount_hooks(&mounted_now, true);

        nodes.len()
    }

    /// Detach a node. Returns whether it was attached.
    pub fn cut(&mut self, node: NodeId) -> bool {
        !self.cut_until(node, node).is_empty()
    }

    /// Detach the contiguous sibling run `node..=until`.
    ///
    /// When `until` is not a following sibling only `node` is cut.
    pub fn cut_until(&mut self, node: NodeId, until: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.tree.parent(node) else {
            return Vec::new();
        };

        let last = self.run_end(node, until);
        let mut run = vec![node];
        let mut current = node;
        while current != last {
            match self.tree.next_sibling(current) {
                Some(next) => {
                    run.push(next);
                    current = next;
                }
                None => break,
            }
        }

        let mounted = self.tree.is_mount(parent);
        let path = if mounted { self.tree.path_of(node) } else { None };
        let records = if path.is_some() {
            run.iter().filter_map(|n| self.to_json(*n)).collect()
        } else {
            Vec::new()
        };
        let previous = self.tree.previous_sibling(node);
        let next = self.tree.next_sibling(last);

        for id in &run {
            self.tree.unlink(*id);
        }
        let mut unmounted = Vec::new();
        for id in &run {
            unmounted.extend(self.tree.set_mounted(*id, false));
        }
        self.tree.invalidate(parent);

        self.emit(Change::Cut {
            parent,
            nodes: run.clone(),
            previous,
            next,
            path,
            records,
        });
        self.run_mount_hooks(&unmounted, false);

        run
    }

    /// Cut `node` and insert `replacement` at its position
    pub fn replace(&mut self, node: NodeId, replacement: impl Into<Fragment>) -> bool {
        self.replace_until(node, node, replacement)
    }

    /// Cut `node..=until` and insert `replacement` at that position
    pub fn replace_until(
        &mut self,
        node: NodeId,
        until: NodeId,
        replacement: impl Into<Fragment>,
    ) -> bool {
        let Some(parent) = self.tree.parent(node) else {
            return false;
        };
        let end = self.run_end(node, until);
        let anchor = self.tree.next_sibling(end);
        self.cut_until(node, end);
        self.attach(parent, replacement.into(), anchor);
        true
    }

    /// Move every child of `from` to the end of `to`
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> usize {
        let (Some(first), Some(last)) = (self.tree.first_child(from), self.tree.last_child(from)) else {
            return 0;
        };
        let moved = self.cut_until(first, last);
        self.attach(to, moved.into(), None)
    }

    /// Split `node` at content `offset`.
    ///
    /// Leaves use their kind's split plan; other nodes split the child
    /// covering `offset` and move trailing children into a clone inserted as
    /// the following sibling.
    pub fn split(&mut self, node: NodeId, offset: usize) -> Split {
        let Some(length) = self.tree.get(node).map(|n| n.length()) else {
            return Split { head: None, tail: None };
        };
        if offset == 0 {
            return Split { head: None, tail: Some(node) };
        }
        let whole = Split { head: Some(node), tail: None };
        if offset >= length {
            return whole;
        }
        let Some(plugin) = self.kind_of(node) else {
            return whole;
        };

        if let Some(plan) = plugin.split(&self.tree, node, offset) {
            let Some(tail) = self.create(plugin.name(), plan.tail) else {
                return whole;
            };
            self.set_attributes(node, plan.head);
            if let Some(parent) = self.tree.parent(node) {
                let anchor = self.tree.next_sibling(node);
                self.attach(parent, tail.into(), anchor);
            }
            debug!(node = %node, offset, tail = %tail, "Split leaf");
            return Split { head: Some(node), tail: Some(tail) };
        }

        let mut consumed = 0;
        let mut boundary = None;
        for child in self.tree.children(node) {
            let child_length = self.tree.length(child);
            if offset < consumed + child_length {
                boundary = Some((child, offset - consumed));
                break;
            }
            consumed += child_length;
        }
        let Some((child, local)) = boundary else {
            return whole;
        };

        let first_moved = if local == 0 {
            Some(child)
        } else {
            self.split(child, local).tail
        };
        let (Some(first_moved), Some(last)) = (first_moved, self.tree.last_child(node)) else {
            return whole;
        };

        let attributes = self.tree.get(node).map(|n| n.attributes().clone()).unwrap_or_default();
        let Some(clone) = self.create(plugin.name(), attributes) else {
            return whole;
        };
        let moved = self.cut_until(first_moved, last);
        self.attach(clone, moved.into(), None);
        if let Some(parent) = self.tree.parent(node) {
            let anchor = self.tree.next_sibling(node);
            self.attach(parent, clone.into(), anchor);
        }
        debug!(node = %node, offset, tail = %clone, "Split node");

        Split { head: Some(node), tail: Some(clone) }
    }

    /// Prepare to lift `node` out of its parent.
    ///
    /// Splits the parent after `node` when `node` sits in the middle, and
    /// returns where in the grandparent `node` belongs to keep document
    /// order. `node` itself is not moved.
    pub fn split_around(&mut self, node: NodeId) -> Option<Placement> {
        let parent = self.tree.parent(node)?;
        let grand = self.tree.parent(parent)?;

        if self.tree.previous_sibling(node).is_none() {
            return Some(Placement { parent: grand, anchor: Some(parent) });
        }
        let Some(next) = self.tree.next_sibling(node) else {
            return Some(Placement {
                parent: grand,
                anchor: self.tree.next_sibling(parent),
            });
        };

        let kind = self.tree.kind(parent)?;
        let attributes = self.tree.get(parent).map(|n| n.attributes().clone()).unwrap_or_default();
        let clone = self.create(kind, attributes)?;
        let last = self.tree.last_child(parent)?;
        let moved = self.cut_until(next, last);
        self.attach(clone, moved.into(), None);
        let anchor = self.tree.next_sibling(parent);
        self.attach(grand, clone.into(), anchor);

        Some(Placement { parent: grand, anchor: Some(clone) })
    }

    /// Remove every child of the root without releasing the root itself
    pub fn clear(&mut self) {
        let root = self.tree.root();
        if let (Some(first), Some(last)) = (self.tree.first_child(root), self.tree.last_child(root)) {
            for node in self.cut_until(first, last) {
                self.release(node);
            }
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Replace a node's attributes. Returns whether anything changed.
    pub fn set_attributes(&mut self, node: NodeId, attributes: Attributes) -> bool {
        let Some(plugin) = self.kind_of(node) else {
            return false;
        };
        let Some(previous) = self.tree.get(node).map(|n| n.attributes().clone()) else {
            return false;
        };
        if previous == attributes {
            return false;
        }

        self.tree.set_own_length(node, plugin.leaf_length(&attributes));
        self.tree.set_attributes(node, attributes.clone());
        self.tree.invalidate(node);

        let path = self.tree.path_of(node);
        self.emit(Change::Attribute {
            node,
            path,
            previous,
            next: attributes,
        });
        true
    }

    /// Merge `patch` into a node's attributes; `null` values remove keys
    pub fn update_attributes(&mut self, node: NodeId, patch: Attributes) -> bool {
        let Some(mut attributes) = self.tree.get(node).map(|n| n.attributes().clone()) else {
            return false;
        };
        for (key, value) in patch {
            if value.is_null() {
                attributes.remove(&key);
            } else {
                attributes.insert(key, value);
            }
        }
        self.set_attributes(node, attributes)
    }

    /// Replace the content of a text-like node
    pub fn set_content(&mut self, node: NodeId, content: &str) -> bool {
        let mut patch = Attributes::new();
        patch.insert("content".to_string(), Value::from(content));
        self.update_attributes(node, patch)
    }

    // ------------------------------------------------------------------
    // Formats
    // ------------------------------------------------------------------

    /// Serialize a node and its body
    pub fn to_json(&self, node: NodeId) -> Option<JsonNode> {
        let n = self.tree.get(node)?;
        let atomic = self.registry.get(n.kind()).map(|k| k.atomic()).unwrap_or(false);
        let body = if atomic {
            None
        } else {
            Some(
                self.tree
                    .children(node)
                    .filter_map(|child| self.to_json(child))
                    .collect(),
            )
        };

        Some(JsonNode {
            kind: n.kind().to_string(),
            attributes: n.attributes().clone(),
            body,
        })
    }

    /// The document: the root's children as records
    pub fn get_json(&self) -> Vec<JsonNode> {
        let root = self.tree.root();
        self.tree
            .children(root)
            .filter_map(|child| self.to_json(child))
            .collect()
    }

    /// Rebuild nodes from records. Bodies are reattached exactly, without
    /// acceptance checks; unknown kinds are dropped with a diagnostic.
    pub fn parse_json(&mut self, records: &[JsonNode]) -> Fragment {
        let mut fragment = Fragment::new();
        for record in records {
            if let Some(node) = self.parse_json_record(record) {
                fragment.push(node);
            }
        }
        fragment
    }

    fn parse_json_record(&mut self, record: &JsonNode) -> Option<NodeId> {
        let Some(plugin) = self.registry.get(&record.kind) else {
            self.diagnose(Diagnostic::warning(
                DiagnosticCode::UnknownKind,
                format!("record of unknown kind '{}' dropped", record.kind),
            ));
            return None;
        };

        let node = plugin.parse_json(record, self)?;
        if !plugin.atomic() {
            let children = self.parse_json(record.children());
            self.attach(node, children, None);
        }
        Some(node)
    }

    /// Import a virtual tree. Each vnode is offered to the registered kinds
    /// in registration order; the first claim wins. Unclaimed elements are
    /// transparent (their children are parsed in place).
    pub fn parse(&mut self, vnodes: &[VNode]) -> Fragment {
        let mut out = Vec::new();
        self.parse_nodes(vnodes, &ParseContext::default(), &mut out);
        Fragment::from(out)
    }

    fn parse_nodes(&mut self, vnodes: &[VNode], context: &ParseContext, out: &mut Vec<NodeId>) {
        for vnode in vnodes {
            self.parse_node(vnode, context, out);
        }
    }

    fn parse_node(&mut self, vnode: &VNode, context: &ParseContext, out: &mut Vec<NodeId>) {
        let kinds = self.registry.kinds();

        for kind in &kinds {
            if let Some(parsed) = kind.parse(vnode, self, context) {
                let atomic = self.kind_of(parsed.node).map(|k| k.atomic()).unwrap_or(true);
                if !atomic {
                    let mut children = Vec::new();
                    self.parse_nodes(vnode.children(), context, &mut children);
                    self.append_fragment(parsed.body, children.into(), None);
                }
                out.push(parsed.node);
                return;
            }
        }

        match vnode {
            VNode::Element { tag, children, .. } => {
                let modifier = kinds.iter().find_map(|kind| kind.parse_modifier(tag));
                let context = match modifier {
                    Some(modifier) => context.with_modifier(modifier),
                    None => {
                        debug!(tag = %tag, "Unclaimed element, parsing children in place");
                        context.clone()
                    }
                };
                self.parse_nodes(children, &context, out);
            }
            VNode::Text { content } => {
                self.diagnose(Diagnostic::info(
                    DiagnosticCode::Unclaimed,
                    format!("no kind claims text '{}'", content),
                ));
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// `until` when it follows `node` among its siblings, `node` otherwise
    fn run_end(&self, node: NodeId, until: NodeId) -> NodeId {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == until {
                return until;
            }
            current = self.tree.next_sibling(id);
        }
        node
    }

    fn emit(&mut self, change: Change) {
        debug!(
            change = change.type_name(),
            origin = ?self.origin,
            path = ?change.path(),
            "Tree change"
        );
        let notification = Notification {
            origin: self.origin,
            change,
        };
        self.bus.publish(&notification);
    }

    fn run_mount_hooks(&self, nodes: &[NodeId], mounted: bool) {
        for id in nodes {
            let Some(node) = self.tree.get(*id) else {
                continue;
            };
            if !(node.is_container() || node.is_widget()) {
                continue;
            }
            if let Some(plugin) = self.registry.get(node.kind()) {
                if mounted {
                    plugin.on_mount(node);
                } else {
                    plugin.on_unmount(node);
                }
            }
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(PluginRegistry::with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use crate::node::{Node, NodeFlags};
    use std::cell::RefCell;

    fn contents(builder: &Builder, parent: NodeId) -> Vec<String> {
        builder
            .tree()
            .children(parent)
            .filter_map(|id| builder.tree().get(id))
            .map(|n| n.content().to_string())
            .collect()
    }

    #[test]
    fn test_append_wraps_text_under_root() {
        let mut builder = Builder::default();
        let root = builder.root();
        let text = builder.text("loose").unwrap();

        let parent = builder.append(root, text, None).unwrap();
        assert_eq!(builder.tree().kind(parent), Some("paragraph"));
        assert_eq!(builder.tree().parent(parent), Some(root));
        assert_eq!(builder.tree().length(root), 5);
    }

    #[test]
    fn test_append_climbs_to_accepting_ancestor() {
        let mut builder = Builder::default();
        let root = builder.root();
        let first = builder.create("paragraph", Attributes::new()).unwrap();
        let second = builder.create("paragraph", Attributes::new()).unwrap();
        builder.append(root, first, None);
        builder.append(root, second, None);

        let embed = builder.create("embed", Attributes::new()).unwrap();
        assert_eq!(builder.append(first, embed, None), Some(root));
        assert_eq!(builder.tree().index_of(embed), Some(1));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut builder = Builder::default();
        let root = builder.root();
        let list = builder.create("list", Attributes::new()).unwrap();
        let item = builder.create("list_item", Attributes::new()).unwrap();
        builder.append(root, list, None);
        builder.append(list, item, None);

        assert_eq!(builder.append(item, list, None), None);
        assert_eq!(builder.append(item, root, None), None);
        assert!(builder
            .diagnostics()
            .iter()
            .all(|d| d.code == DiagnosticCode::StructuralRejection));
        assert_eq!(builder.diagnostics().len(), 2);
    }

    #[test]
    fn test_unknown_kind_is_diagnosed() {
        let mut builder = Builder::default();
        assert!(builder.create("table", Attributes::new()).is_none());
        let diagnostics = builder.take_diagnostics();
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnknownKind);
        assert!(builder.diagnostics().is_empty());
    }

    #[test]
    fn test_changes_carry_paths_and_snapshots() {
        let mut builder = Builder::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        builder.subscribe(move |n: &Notification| {
            sink.borrow_mut().push((n.change.type_name(), n.change.path().cloned()))
        });

        let root = builder.root();
        let paragraph = builder.create("paragraph", Attributes::new()).unwrap();
        let text = builder.text("a").unwrap();
        builder.append(paragraph, text, None);
        builder.append(root, paragraph, None);
        builder.set_content(text, "b");
        builder.cut(paragraph);

        assert_eq!(
            *seen.borrow(),
            vec![
                ("append", None),
                ("append", Some(vec![0])),
                ("attribute", Some(vec![0, 0])),
                ("cut", Some(vec![0])),
            ]
        );
    }

    #[test]
    fn test_split_container_moves_trailing_content() {
        let mut builder = Builder::default();
        let root = builder.root();
        let paragraph = builder.create("paragraph", Attributes::new()).unwrap();
        builder.append(root, paragraph, None);
        let plain = builder.text("abc").unwrap();
        let bold = builder.text_with("def", &["bold"]).unwrap();
        builder.append(paragraph, plain, None);
        builder.append(paragraph, bold, None);

        let split = builder.split(paragraph, 4);
        let tail = split.tail.unwrap();
        assert_eq!(split.head, Some(paragraph));
        assert_eq!(contents(&builder, paragraph), vec!["abc", "d"]);
        assert_eq!(contents(&builder, tail), vec!["ef"]);
        assert_eq!(builder.tree().next_sibling(paragraph), Some(tail));
        assert_eq!(builder.tree().length(root), 6);
    }

    #[test]
    fn test_split_at_extremes_does_not_create_nodes() {
        let mut builder = Builder::default();
        let text = builder.text("abc").unwrap();
        let count = builder.tree().len();

        assert_eq!(builder.split(text, 0), Split { head: None, tail: Some(text) });
        assert_eq!(builder.split(text, 3), Split { head: Some(text), tail: None });
        assert_eq!(builder.tree().len(), count);
    }

    #[test]
    fn test_replace_until_keeps_position() {
        let mut builder = Builder::default();
        let root = builder.root();
        let paragraph = builder.create("paragraph", Attributes::new()).unwrap();
        builder.append(root, paragraph, None);
        let nodes: Vec<NodeId> = ["a", "b", "c", "d"].iter().map(|t| builder.text(t).unwrap()).collect();
        builder.attach(paragraph, nodes.clone().into(), None);

        let replacement = builder.text("x").unwrap();
        assert!(builder.replace_until(nodes[1], nodes[2], replacement));
        assert_eq!(contents(&builder, paragraph), vec!["a", "x", "d"]);
        assert!(!builder.tree().is_mount(nodes[1]));
    }

    #[test]
    fn test_update_attributes_null_removes_key() {
        let mut builder = Builder::default();
        let mut attributes = Attributes::new();
        attributes.insert("src".to_string(), Value::from("a.png"));
        attributes.insert("alt".to_string(), Value::from("cat"));
        let embed = builder.create("embed", attributes).unwrap();

        let mut patch = Attributes::new();
        patch.insert("alt".to_string(), Value::Null);
        assert!(builder.update_attributes(embed, patch.clone()));
        assert!(!builder.update_attributes(embed, patch));
        assert_eq!(builder.tree().get(embed).unwrap().attribute("alt"), None);
    }

    #[test]
    fn test_json_round_trip_through_duplicate() {
        let mut builder = Builder::default();
        let root = builder.root();
        let text = builder.text_with("hi", &["italic"]).unwrap();
        let paragraph = builder.append(root, text, None).unwrap();

        let copy = builder.duplicate(paragraph).unwrap();
        assert_ne!(copy, paragraph);
        assert_eq!(builder.to_json(copy), builder.to_json(paragraph));
        assert!(!builder.tree().is_mount(copy));
    }

    #[test]
    fn test_unclaimed_text_is_reported() {
        let mut builder = Builder::new(PluginRegistry::new());
        let fragment = builder.parse(&[VNode::element("div").with_child(VNode::text("lost"))]);
        assert!(fragment.is_empty());
        assert_eq!(builder.diagnostics().iter().next().map(|d| d.code), Some(DiagnosticCode::Unclaimed));
    }

    type HookLog = Rc<RefCell<Vec<(&'static str, bool)>>>;

    /// Delegates to a built-in kind and records mount transitions
    struct Recording<K> {
        kind: K,
        log: HookLog,
    }

    impl<K: NodeKind> NodeKind for Recording<K> {
        fn name(&self) -> &'static str {
            self.kind.name()
        }

        fn flags(&self) -> NodeFlags {
            self.kind.flags()
        }

        fn default_attributes(&self) -> Attributes {
            self.kind.default_attributes()
        }

        fn leaf_length(&self, attributes: &Attributes) -> usize {
            self.kind.leaf_length(attributes)
        }

        fn atomic(&self) -> bool {
            self.kind.atomic()
        }

        fn accept(&self, tree: &Tree, parent: NodeId, child: NodeId) -> bool {
            self.kind.accept(tree, parent, child)
        }

        fn fit(&self, tree: &Tree, node: NodeId, parent: NodeId) -> bool {
            self.kind.fit(tree, node, parent)
        }

        fn wrapper(&self) -> Option<&'static str> {
            self.kind.wrapper()
        }

        fn render(&self, node: &Node, children: Vec<Descriptor>) -> Option<Descriptor> {
            self.kind.render(node, children)
        }

        fn on_mount(&self, _node: &Node) {
            self.log.borrow_mut().push((self.kind.name(), true));
        }

        fn on_unmount(&self, _node: &Node) {
            self.log.borrow_mut().push((self.kind.name(), false));
        }
    }

    #[test]
    fn test_mount_hooks_fire_for_containers_and_widgets_only() {
        use crate::kinds::{Embed, Paragraph, Text};

        let log: HookLog = Rc::new(RefCell::new(Vec::new()));
        let mut registry = PluginRegistry::with_defaults();
        registry
            .register(Recording { kind: Paragraph, log: Rc::clone(&log) })
            .register(Recording { kind: Embed, log: Rc::clone(&log) })
            .register(Recording { kind: Text, log: Rc::clone(&log) });
        let mut builder = Builder::new(registry);
        let root = builder.root();

        // detached edits mount nothing
        let p = builder.create("paragraph", Attributes::new()).unwrap();
        let text = builder.text("x").unwrap();
        builder.append(p, text, None);
        assert!(log.borrow().is_empty());

        builder.append(root, p, None);
        let embed = builder.create("embed", Attributes::new()).unwrap();
        builder.append(root, embed, None);
        assert!(builder.cut(p));
        builder.append(root, p, None);
        assert!(builder.cut(embed));

        assert_eq!(
            *log.borrow(),
            vec![
                ("paragraph", true),
                ("embed", true),
                ("paragraph", false),
                ("paragraph", true),
                ("embed", false),
            ]
        );
        assert!(builder.tree().is_mount(text));
    }
}
