//! Presentation descriptors produced by [`NodeKind::render`](crate::NodeKind::render)
//! and materialized by the [`Renderer`](crate::Renderer).

use crate::node::NodeId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Descriptor>,
        /// Document node this element presents (set by the renderer)
        node: Option<NodeId>,
    },
    Text {
        content: String,
        node: Option<NodeId>,
    },
    /// Synthetic trailing caret anchor inside an empty container
    Marker,
}

impl Descriptor {
    pub fn element(tag: impl Into<String>) -> Self {
        Descriptor::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            node: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Descriptor::Text {
            content: content.into(),
            node: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Descriptor::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<Descriptor>) -> Self {
        if let Descriptor::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    pub(crate) fn bind(&mut self, id: NodeId) {
        match self {
            Descriptor::Element { node, .. } | Descriptor::Text { node, .. } => *node = Some(id),
            Descriptor::Marker => {}
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            Descriptor::Element { node, .. } | Descriptor::Text { node, .. } => *node,
            Descriptor::Marker => None,
        }
    }

    /// Would show something other than markers: non-empty text or any
    /// element without children (a widget, a line break).
    pub fn has_content(&self) -> bool {
        match self {
            Descriptor::Text { content, .. } => !content.is_empty(),
            Descriptor::Element { children, .. } => {
                children.is_empty() || children.iter().any(Descriptor::has_content)
            }
            Descriptor::Marker => false,
        }
    }
}
