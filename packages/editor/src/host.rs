//! # Host Port
//!
//! The presentation surface the [`Renderer`](crate::Renderer) projects the
//! document onto. A browser adapter would wrap the DOM; [`MemoryHost`] is a
//! plain in-memory tree used by tests and the CLI.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// Host-side node handle
pub type HostId = u64;

/// Shape of a host node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostNode {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text {
        content: String,
    },
}

impl HostNode {
    pub fn element(tag: impl Into<String>) -> Self {
        HostNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            HostNode::Element { tag, .. } => Some(tag),
            HostNode::Text { .. } => None,
        }
    }
}

/// Host adapter contract
pub trait Host {
    /// Element the document root is projected onto
    fn root(&self) -> HostId;

    fn create(&mut self, node: &HostNode) -> HostId;

    /// Insert (or move) `child` under `parent`, before `before` or at the end
    fn insert(&mut self, parent: HostId, child: HostId, before: Option<HostId>);

    /// Detach and discard `child`
    fn remove(&mut self, parent: HostId, child: HostId);

    fn set_attribute(&mut self, node: HostId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: HostId, name: &str);

    fn set_text(&mut self, node: HostId, content: &str);

    fn children(&self, parent: HostId) -> Vec<HostId>;

    fn describe(&self, node: HostId) -> Option<HostNode>;
}

/// Mutation counters, for asserting minimal churn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub created: usize,
    pub inserted: usize,
    pub removed: usize,
    pub attribute_writes: usize,
    pub text_writes: usize,
}

#[derive(Debug, Clone)]
struct Slot {
    node: HostNode,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

/// In-memory host tree
#[derive(Debug, Clone)]
pub struct MemoryHost {
    slots: HashMap<HostId, Slot>,
    root: HostId,
    next_id: HostId,
    stats: HostStats,
}

const VOID_TAGS: &[&str] = &["br", "img", "hr", "input"];

impl MemoryHost {
    pub fn new() -> Self {
        let root = 0;
        let mut slots = HashMap::new();
        slots.insert(
            root,
            Slot {
                node: HostNode::element("div"),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            slots,
            root,
            next_id: 1,
            stats: HostStats::default(),
        }
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = HostStats::default();
    }

    /// Live host nodes, root included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn parent(&self, node: HostId) -> Option<HostId> {
        self.slots.get(&node).and_then(|slot| slot.parent)
    }

    /// Serialize the whole host tree as markup
    pub fn to_markup(&self) -> String {
        self.markup_of(self.root)
    }

    /// Serialize one host subtree as markup
    pub fn markup_of(&self, node: HostId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: HostId, out: &mut String) {
        let Some(slot) = self.slots.get(&node) else {
            return;
        };
        match &slot.node {
            HostNode::Text { content } => out.push_str(&escape(content)),
            HostNode::Element { tag, attributes } => {
                let _ = write!(out, "<{}", tag);
                for (name, value) in attributes {
                    let _ = write!(out, " {}=\"{}\"", name, escape(value));
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) && slot.children.is_empty() {
                    return;
                }
                for child in &slot.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }

    fn detach(&mut self, child: HostId) {
        let Some(parent) = self.slots.get_mut(&child).and_then(|slot| slot.parent.take()) else {
            return;
        };
        if let Some(parent) = self.slots.get_mut(&parent) {
            parent.children.retain(|c| *c != child);
        }
    }

    fn discard(&mut self, node: HostId) {
        if let Some(slot) = self.slots.remove(&node) {
            for child in slot.children {
                self.discard(child);
            }
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Host for MemoryHost {
    fn root(&self) -> HostId {
        self.root
    }

    fn create(&mut self, node: &HostNode) -> HostId {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(
            id,
            Slot {
                node: node.clone(),
                parent: None,
                children: Vec::new(),
            },
        );
        self.stats.created += 1;
        id
    }

    fn insert(&mut self, parent: HostId, child: HostId, before: Option<HostId>) {
        if parent == child || !self.slots.contains_key(&parent) || !self.slots.contains_key(&child) {
            return;
        }
        self.detach(child);
        if let Some(slot) = self.slots.get_mut(&parent) {
            let index = before
                .and_then(|b| slot.children.iter().position(|c| *c == b))
                .unwrap_or(slot.children.len());
            slot.children.insert(index, child);
        }
        if let Some(slot) = self.slots.get_mut(&child) {
            slot.parent = Some(parent);
        }
        self.stats.inserted += 1;
    }

    fn remove(&mut self, parent: HostId, child: HostId) {
        if self.parent(child) != Some(parent) {
            return;
        }
        self.detach(child);
        self.discard(child);
        self.stats.removed += 1;
    }

    fn set_attribute(&mut self, node: HostId, name: &str, value: &str) {
        if let Some(Slot {
            node: HostNode::Element { attributes, .. },
            ..
        }) = self.slots.get_mut(&node)
        {
            attributes.insert(name.to_string(), value.to_string());
            self.stats.attribute_writes += 1;
        }
    }

    fn remove_attribute(&mut self, node: HostId, name: &str) {
        if let Some(Slot {
            node: HostNode::Element { attributes, .. },
            ..
        }) = self.slots.get_mut(&node)
        {
            if attributes.remove(name).is_some() {
                self.stats.attribute_writes += 1;
            }
        }
    }

    fn set_text(&mut self, node: HostId, content: &str) {
        if let Some(Slot {
            node: HostNode::Text { content: current },
            ..
        }) = self.slots.get_mut(&node)
        {
            *current = content.to_string();
            self.stats.text_writes += 1;
        }
    }

    fn children(&self, parent: HostId) -> Vec<HostId> {
        self.slots
            .get(&parent)
            .map(|slot| slot.children.clone())
            .unwrap_or_default()
    }

    fn describe(&self, node: HostId) -> Option<HostNode> {
        self.slots.get(&node).map(|slot| slot.node.clone())
    }
}
