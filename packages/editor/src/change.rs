//! # Change Notifications
//!
//! Every structural or attribute change made by the [`Builder`](crate::Builder)
//! is published, synchronously and in order, to subscribers. This is the
//! only cross-component signaling path: the normalizer, renderer and time
//! travel all learn about edits here.
//!
//! Handlers only receive the notification, never the tree, so a handler
//! cannot re-enter the builder while a mutation is in progress.

use crate::json::JsonNode;
use crate::node::{Attributes, NodeId};
use crate::tree::Path;

/// Who caused a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Direct edit through the builder
    Edit,
    /// Repair performed by the normalizer
    Normalize,
    /// Undo/redo replay
    History,
}

/// A single tree change.
///
/// `path` is the structural path of the first affected node, `None` when the
/// change happened outside the mounted tree. `records` snapshot the affected
/// subtrees (empty when unmounted).
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Append {
        parent: NodeId,
        nodes: Vec<NodeId>,
        previous: Option<NodeId>,
        next: Option<NodeId>,
        path: Option<Path>,
        records: Vec<JsonNode>,
    },
    Cut {
        parent: NodeId,
        nodes: Vec<NodeId>,
        previous: Option<NodeId>,
        next: Option<NodeId>,
        path: Option<Path>,
        records: Vec<JsonNode>,
    },
    Attribute {
        node: NodeId,
        path: Option<Path>,
        previous: Attributes,
        next: Attributes,
    },
}

impl Change {
    pub fn type_name(&self) -> &'static str {
        match self {
            Change::Append { .. } => "append",
            Change::Cut { .. } => "cut",
            Change::Attribute { .. } => "attribute",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Change::Append { path, .. } | Change::Cut { path, .. } | Change::Attribute { path, .. } => {
                path.as_ref()
            }
        }
    }

    /// Happened inside the mounted tree
    pub fn is_mounted(&self) -> bool {
        self.path().is_some()
    }
}

/// A change plus its origin
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub origin: Origin,
    pub change: Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&Notification)>;

/// Ordered, synchronous subscriber list
#[derive(Default)]
pub struct ChangeBus {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&Notification) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn publish(&mut self, notification: &Notification) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(notification);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn attribute(node: u64) -> Notification {
        Notification {
            origin: Origin::Edit,
            change: Change::Attribute {
                node: NodeId(node),
                path: None,
                previous: Attributes::new(),
                next: Attributes::new(),
            },
        }
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ChangeBus::new();

        let first = Rc::clone(&log);
        bus.subscribe(move |_| first.borrow_mut().push("first"));
        let second = Rc::clone(&log);
        bus.subscribe(move |_| second.borrow_mut().push("second"));

        bus.publish(&attribute(1));
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = ChangeBus::new();
        let counter = Rc::clone(&count);
        let id = bus.subscribe(move |_| *counter.borrow_mut() += 1);

        bus.publish(&attribute(1));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&attribute(2));

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_unmounted_changes_have_no_path() {
        let notification = attribute(3);
        assert!(!notification.change.is_mounted());
        assert_eq!(notification.change.type_name(), "attribute");
    }
}
