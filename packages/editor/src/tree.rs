//! # Document Tree
//!
//! Arena of [`Node`]s addressed by [`NodeId`]. Relations (parent, first/last
//! child, previous/next sibling) are id fields, so the tree can be walked in
//! any direction without shared ownership.
//!
//! ## Invariants
//!
//! - Every node's `length` equals its own length plus the sum of its
//!   children's lengths, transitively up to the root.
//! - `mounted` is true iff the node is reachable from the root.
//!
//! Only crate code (the [`Builder`](crate::Builder)) links, unlinks or
//! resizes nodes. Navigation is pure and never mutates.

use crate::node::{Attributes, Node, NodeFlags, NodeId};
use std::collections::HashMap;

/// Structural path: sibling indices from the root down to a node.
///
/// The root's path is empty.
pub type Path = Vec<usize>;

/// Kind tag of the tree root
pub const ROOT_KIND: &str = "root";

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
}

impl Tree {
    /// Create a tree holding only an empty, mounted root
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut node = Node::new(root, ROOT_KIND, Attributes::new(), NodeFlags::section(), 0);
        node.mounted = true;

        let mut nodes = HashMap::new();
        nodes.insert(root, node);

        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_child(self.root).is_none()
    }

    pub fn kind(&self, id: NodeId) -> Option<&'static str> {
        self.get(id).map(|n| n.kind)
    }

    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.get(id).map(|n| n.flags).unwrap_or_default()
    }

    pub fn length(&self, id: NodeId) -> usize {
        self.get(id).map(|n| n.length).unwrap_or(0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.previous
    }

    pub fn is_mount(&self, id: NodeId) -> bool {
        self.get(id).map(|n| n.mounted).unwrap_or(false)
    }

    /// Children of `id`, first to last
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    pub fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).nth(index)
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).position(|child| child == id)
    }

    /// Ancestors of `id`, nearest first (excludes `id`)
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Transitive ancestor test. A node does not contain itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// `id` and all of its descendants, pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.exists(current) {
                continue;
            }
            out.push(current);
            let children: Vec<NodeId> = self.children(current).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Descend through first children until a leaf
    pub fn deepest_first(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(first) = self.first_child(current) {
            current = first;
        }
        current
    }

    /// Descend through last children until a leaf
    pub fn deepest_last(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(last) = self.last_child(current) {
            current = last;
        }
        current
    }

    /// Next node in document (pre-order) order, bounded by the root
    pub fn next_in_order(&self, id: NodeId) -> Option<NodeId> {
        if let Some(first) = self.first_child(id) {
            return Some(first);
        }
        self.next_outside(id)
    }

    /// Next node in document order that is not a descendant of `id`
    fn next_outside(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if current == self.root {
                return None;
            }
            if let Some(next) = self.next_sibling(current) {
                return Some(next);
            }
            current = self.parent(current)?;
        }
    }

    /// Previous node in document (pre-order) order, bounded by the root
    pub fn previous_in_order(&self, id: NodeId) -> Option<NodeId> {
        if id == self.root {
            return None;
        }
        match self.previous_sibling(id) {
            Some(previous) => Some(self.deepest_last(previous)),
            None => self.parent(id).filter(|parent| *parent != self.root),
        }
    }

    /// Previous editable container or widget, crossing section boundaries.
    ///
    /// Content nested in `id` is never returned.
    pub fn previous_selectable(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.previous_in_order(id);
        while let Some(candidate) = current {
            if !self.contains(candidate, id) && self.flags(candidate).is_selectable() {
                return Some(candidate);
            }
            current = self.previous_in_order(candidate);
        }
        None
    }

    /// Next editable container or widget, crossing section boundaries.
    ///
    /// Content nested in `id` is skipped.
    pub fn next_selectable(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_outside(id);
        while let Some(candidate) = current {
            if self.flags(candidate).is_selectable() {
                return Some(candidate);
            }
            current = self.next_in_order(candidate);
        }
        None
    }

    /// Structural path of a mounted node
    pub fn path_of(&self, id: NodeId) -> Option<Path> {
        if !self.is_mount(id) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = id;
        while current != self.root {
            path.push(self.index_of(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Translate a structural path to the live node it addresses
    pub fn resolve(&self, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |current, index| self.child_at(current, *index))
    }

    /// Nodes whose stored length differs from own length + children
    pub fn check_lengths(&self) -> Vec<NodeId> {
        let mut broken: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| {
                let children: usize = self.children(node.id).map(|c| self.length(c)).sum();
                node.length != node.own_length + children
            })
            .map(|node| node.id)
            .collect();
        broken.sort();
        broken
    }

    /// Nodes whose mount flag disagrees with root reachability
    pub fn check_mounts(&self) -> Vec<NodeId> {
        let reachable: std::collections::HashSet<NodeId> =
            self.descendants(self.root).into_iter().collect();
        let mut broken: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| node.mounted != reachable.contains(&node.id))
            .map(|node| node.id)
            .collect();
        broken.sort();
        broken
    }

    pub(crate) fn allocate(
        &mut self,
        kind: &'static str,
        attributes: Attributes,
        flags: NodeFlags,
        own_length: usize,
    ) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes
            .insert(id, Node::new(id, kind, attributes, flags, own_length));
        id
    }

    /// Link a detached node under `parent`, before `before` (or at the end).
    ///
    /// Ancestor lengths grow by the node's length. Mount state is left to
    /// the caller.
    pub(crate) fn link(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        let before = before.filter(|b| self.parent(*b) == Some(parent));
        let previous = match before {
            Some(b) => self.previous_sibling(b),
            None => self.last_child(parent),
        };

        if let Some(n) = self.get_mut(node) {
            n.parent = Some(parent);
            n.previous = previous;
            n.next = before;
        }
        match previous {
            Some(p) => {
                if let Some(p) = self.get_mut(p) {
                    p.next = Some(node);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first = Some(node);
                }
            }
        }
        match before {
            Some(b) => {
                if let Some(b) = self.get_mut(b) {
                    b.previous = Some(node);
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last = Some(node);
                }
            }
        }

        let length = self.length(node) as isize;
        self.resize_from(parent, length);
    }

    /// Detach a node from its parent, repairing sibling pointers and
    /// shrinking every ancestor's length.
    pub(crate) fn unlink(&mut self, node: NodeId) {
        let Some((parent, previous, next, length)) = self
            .get(node)
            .and_then(|n| n.parent.map(|p| (p, n.previous, n.next, n.length)))
        else {
            return;
        };

        match previous {
            Some(p) => {
                if let Some(p) = self.get_mut(p) {
                    p.next = next;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.first = next;
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(n) = self.get_mut(n) {
                    n.previous = previous;
                }
            }
            None => {
                if let Some(p) = self.get_mut(parent) {
                    p.last = previous;
                }
            }
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = None;
            n.previous = None;
            n.next = None;
        }

        self.resize_from(parent, -(length as isize));
    }

    /// Replace a node's own length, propagating the delta to ancestors
    pub(crate) fn set_own_length(&mut self, node: NodeId, own_length: usize) {
        let Some(n) = self.get_mut(node) else {
            return;
        };
        let delta = own_length as isize - n.own_length as isize;
        n.own_length = own_length;
        if delta != 0 {
            self.resize_from(node, delta);
        }
    }

    fn resize_from(&mut self, start: NodeId, delta: isize) {
        if delta == 0 {
            return;
        }
        let mut current = Some(start);
        while let Some(id) = current {
            match self.get_mut(id) {
                Some(n) => {
                    n.length = (n.length as isize + delta).max(0) as usize;
                    current = n.parent;
                }
                None => break,
            }
        }
    }

    /// Set the mount flag across a subtree.
    ///
    /// Returns the nodes whose flag actually changed, pre-order.
    pub(crate) fn set_mounted(&mut self, node: NodeId, mounted: bool) -> Vec<NodeId> {
        let mut changed = Vec::new();
        for id in self.descendants(node) {
            if let Some(n) = self.get_mut(id) {
                if n.mounted != mounted {
                    n.mounted = mounted;
                    changed.push(id);
                }
            }
        }
        changed
    }

    /// Mark a node and its ancestors as out of sync with the presentation
    pub(crate) fn invalidate(&mut self, node: NodeId) {
        let mut current = Some(node);
        while let Some(id) = current {
            match self.get_mut(id) {
                Some(n) => {
                    n.rendered = false;
                    current = n.parent;
                }
                None => break,
            }
        }
    }

    pub(crate) fn set_rendered(&mut self, node: NodeId, rendered: bool) {
        if let Some(n) = self.get_mut(node) {
            n.rendered = rendered;
        }
    }

    pub(crate) fn set_attributes(&mut self, node: NodeId, attributes: Attributes) -> Option<Attributes> {
        self.get_mut(node)
            .map(|n| std::mem::replace(&mut n.attributes, attributes))
    }

    /// Drop a detached subtree from the arena. The root is never dropped.
    pub(crate) fn remove_subtree(&mut self, node: NodeId) -> usize {
        if node == self.root || self.parent(node).is_some() {
            return 0;
        }
        let ids = self.descendants(node);
        for id in &ids {
            self.nodes.remove(id);
        }
        ids.len()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a node's children
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Iterator over a node's ancestors, nearest first
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tree: &mut Tree, len: usize) -> NodeId {
        tree.allocate("text", Attributes::new(), NodeFlags::default(), len)
    }

    fn block(tree: &mut Tree) -> NodeId {
        tree.allocate("paragraph", Attributes::new(), NodeFlags::container(), 0)
    }

    #[test]
    fn test_link_and_unlink_maintain_lengths() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = block(&mut tree);
        let a = leaf(&mut tree, 3);
        let b = leaf(&mut tree, 4);

        tree.link(root, p, None);
        tree.link(p, a, None);
        tree.link(p, b, None);

        assert_eq!(tree.length(p), 7);
        assert_eq!(tree.length(root), 7);
        assert!(tree.check_lengths().is_empty());

        tree.unlink(a);
        assert_eq!(tree.length(p), 4);
        assert_eq!(tree.length(root), 4);
        assert_eq!(tree.first_child(p), Some(b));
        assert_eq!(tree.previous_sibling(b), None);
        assert!(tree.check_lengths().is_empty());
    }

    #[test]
    fn test_link_before_anchor() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = block(&mut tree);
        let b = block(&mut tree);
        let c = block(&mut tree);

        tree.link(root, a, None);
        tree.link(root, c, None);
        tree.link(root, b, Some(c));

        let order: Vec<NodeId> = tree.children(root).collect();
        assert_eq!(order, vec![a, b, c]);
        assert_eq!(tree.last_child(root), Some(c));
    }

    #[test]
    fn test_paths_resolve_back() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p1 = block(&mut tree);
        let p2 = block(&mut tree);
        let t = leaf(&mut tree, 1);
        tree.link(root, p1, None);
        tree.link(root, p2, None);
        tree.link(p2, t, None);
        tree.set_mounted(p1, true);
        tree.set_mounted(p2, true);

        assert_eq!(tree.path_of(root), Some(vec![]));
        assert_eq!(tree.path_of(t), Some(vec![1, 0]));
        assert_eq!(tree.resolve(&[1, 0]), Some(t));
        assert_eq!(tree.resolve(&[2]), None);
    }

    #[test]
    fn test_unmounted_nodes_have_no_path() {
        let mut tree = Tree::new();
        let p = block(&mut tree);
        assert_eq!(tree.path_of(p), None);
    }

    #[test]
    fn test_contains_is_strict() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = block(&mut tree);
        let t = leaf(&mut tree, 1);
        tree.link(root, p, None);
        tree.link(p, t, None);

        assert!(tree.contains(root, t));
        assert!(tree.contains(p, t));
        assert!(!tree.contains(t, t));
        assert!(!tree.contains(t, p));
    }

    #[test]
    fn test_selectable_navigation_skips_inline_content() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p1 = block(&mut tree);
        let t1 = leaf(&mut tree, 1);
        let list = tree.allocate("list", Attributes::new(), NodeFlags::section().with_group(), 0);
        let p2 = block(&mut tree);
        tree.link(root, p1, None);
        tree.link(p1, t1, None);
        tree.link(root, list, None);
        tree.link(list, p2, None);

        assert_eq!(tree.next_selectable(p1), Some(p2));
        assert_eq!(tree.previous_selectable(p2), Some(p1));
        assert_eq!(tree.previous_selectable(p1), None);
        assert_eq!(tree.next_selectable(p2), None);
        assert_eq!(tree.deepest_first(root), t1);
        assert_eq!(tree.deepest_last(root), p2);
    }

    #[test]
    fn test_remove_subtree_only_drops_detached_nodes() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = block(&mut tree);
        let t = leaf(&mut tree, 2);
        tree.link(root, p, None);
        tree.link(p, t, None);

        assert_eq!(tree.remove_subtree(p), 0);
        tree.unlink(p);
        assert_eq!(tree.remove_subtree(p), 2);
        assert!(!tree.exists(t));
        assert_eq!(tree.length(root), 0);
    }
}
