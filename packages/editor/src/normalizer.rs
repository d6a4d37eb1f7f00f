//! # Normalizer
//!
//! Restores structural legality and merge-completeness after a burst of
//! builder edits.
//!
//! ## Design
//!
//! The normalizer subscribes to the change bus and records the nodes next to
//! every reported change. [`Normalizer::normalize`] later drains that
//! work-list, re-validating each dirty node and applying, in priority order:
//!
//! 1. delete-if-empty (unless it is the sole content of its container)
//! 2. join with a qualifying previous sibling
//! 3. on a structural violation: the kind's adopt transform, then
//!    relocation to the nearest accepting ancestor, then deletion
//!
//! Repairs are ordinary builder edits with [`Origin::Normalize`], so they
//! feed back into the same pass. A repair budget bounds pathological
//! cycles. Finally the root invariant is enforced: the document never ends
//! on anything but an editable block.
//!
//! Changes replayed by history are not re-validated.

use crate::builder::Builder;
use crate::change::{Change, Notification, Origin, SubscriptionId};
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::node::{Attributes, NodeId};
use crate::plugin::{Adoption, NodeKind};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Scope {
    /// The node and everything below it
    Subtree,
    /// The node and its next sibling (a changed node may now join it)
    Neighbors,
    /// The node alone
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Dirty {
    node: NodeId,
    scope: Scope,
}

type Inbox = Rc<RefCell<VecDeque<Dirty>>>;

/// What one normalization pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub visited: usize,
    pub joined: usize,
    pub deleted: usize,
    pub adopted: usize,
    pub moved: usize,
    pub synthesized: usize,
    pub budget_exhausted: bool,
}

impl NormalizeReport {
    /// Number of tree repairs performed
    pub fn repairs(&self) -> usize {
        self.joined + self.deleted + self.adopted + self.moved + self.synthesized
    }

    pub fn is_clean(&self) -> bool {
        self.repairs() == 0 && !self.budget_exhausted
    }
}

pub struct Normalizer {
    inbox: Inbox,
    subscription: SubscriptionId,
    budget: usize,
    default_block: String,
}

impl Normalizer {
    /// Create a normalizer listening to `builder`'s changes
    pub fn new(builder: &mut Builder, config: &EngineConfig) -> Self {
        let inbox: Inbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&inbox);
        let subscription = builder.subscribe(move |notification: &Notification| {
            if notification.origin == Origin::History || !notification.change.is_mounted() {
                return;
            }
            let mut inbox = sink.borrow_mut();
            let mut mark = |node: NodeId, scope: Scope| inbox.push_back(Dirty { node, scope });

            match &notification.change {
                Change::Append {
                    parent,
                    nodes,
                    previous,
                    next,
                    ..
                } => {
                    for node in nodes {
                        mark(*node, Scope::Subtree);
                    }
                    if let Some(previous) = previous {
                        mark(*previous, Scope::Single);
                    }
                    if let Some(next) = next {
                        mark(*next, Scope::Single);
                    }
                    mark(*parent, Scope::Single);
                }
                Change::Cut {
                    parent,
                    previous,
                    next,
                    ..
                } => {
                    if let Some(previous) = previous {
                        mark(*previous, Scope::Single);
                    }
                    if let Some(next) = next {
                        mark(*next, Scope::Single);
                    }
                    mark(*parent, Scope::Single);
                }
                Change::Attribute { node, .. } => mark(*node, Scope::Neighbors),
            }
        });

        Self {
            inbox,
            subscription,
            budget: config.normalize_budget,
            default_block: config.default_block.clone(),
        }
    }

    /// Stop listening to `builder`
    pub fn detach(self, builder: &mut Builder) {
        builder.unsubscribe(self.subscription);
    }

    /// Work is waiting for the next pass
    pub fn is_pending(&self) -> bool {
        !self.inbox.borrow().is_empty()
    }

    /// Drop recorded work without processing it
    pub fn discard(&mut self) {
        self.inbox.borrow_mut().clear();
    }

    /// Re-validate the whole document
    pub fn normalize_all(&mut self, builder: &mut Builder) -> NormalizeReport {
        self.inbox.borrow_mut().push_back(Dirty {
            node: builder.root(),
            scope: Scope::Subtree,
        });
        self.normalize(builder)
    }

    /// Run one pass over everything reported since the last pass
    #[instrument(skip_all, fields(pending = self.inbox.borrow().len()))]
    pub fn normalize(&mut self, builder: &mut Builder) -> NormalizeReport {
        let mut report = NormalizeReport::default();
        if !self.is_pending() {
            return report;
        }

        builder.with_origin(Origin::Normalize, |builder| {
            let mut work = VecDeque::new();
            let mut queued = HashSet::new();

            loop {
                self.drain(&mut work, &mut queued);
                let Some(item) = work.pop_front() else {
                    if self.ensure_root(builder, &mut report) {
                        continue;
                    }
                    break;
                };
                queued.remove(&item);

                if report.repairs() >= self.budget {
                    report.budget_exhausted = true;
                    builder.diagnose(Diagnostic::warning(
                        DiagnosticCode::BudgetExhausted,
                        format!(
                            "normalization stopped after {} repairs; {} items left",
                            report.repairs(),
                            work.len() + 1
                        ),
                    ));
                    self.inbox.borrow_mut().clear();
                    break;
                }

                report.visited += 1;
                self.visit(builder, item, &mut work, &mut queued, &mut report);
            }
        });

        if report.repairs() > 0 || report.budget_exhausted {
            info!(
                visited = report.visited,
                joined = report.joined,
                deleted = report.deleted,
                adopted = report.adopted,
                moved = report.moved,
                synthesized = report.synthesized,
                budget_exhausted = report.budget_exhausted,
                "Normalization pass complete"
            );
        } else {
            debug!(visited = report.visited, "Normalization pass found nothing to repair");
        }
        report
    }

    fn drain(&self, work: &mut VecDeque<Dirty>, queued: &mut HashSet<Dirty>) {
        for item in self.inbox.borrow_mut().drain(..) {
            if queued.insert(item) {
                work.push_back(item);
            }
        }
    }

    fn visit(
        &self,
        builder: &mut Builder,
        item: Dirty,
        work: &mut VecDeque<Dirty>,
        queued: &mut HashSet<Dirty>,
        report: &mut NormalizeReport,
    ) {
        let Dirty { node, scope } = item;
        let tree = builder.tree();
        if !tree.is_mount(node) {
            return;
        }

        let mut follow = |node: NodeId, scope: Scope| {
            let item = Dirty { node, scope };
            if queued.insert(item) {
                work.push_back(item);
            }
        };

        let Some(parent) = tree.parent(node) else {
            // the root
            if scope == Scope::Subtree {
                for child in tree.children(node) {
                    follow(child, Scope::Subtree);
                }
            }
            return;
        };
        let Some(kind) = builder.kind_of(node) else {
            return;
        };

        if kind.deletable(tree, node) && !self.is_sole_content(builder, node, parent) {
            debug!(node = %node, kind = kind.name(), "Deleting empty node");
            self.delete(builder, node);
            report.deleted += 1;
            return;
        }

        if self.join_previous(builder, node) {
            report.joined += 1;
            return;
        }

        if !builder.accepts(parent, node) {
            if self.adopt(builder, node, parent, &*kind) {
                report.adopted += 1;
            } else if self.relocate(builder, node, parent, &*kind) {
                report.moved += 1;
            } else {
                builder.diagnose(
                    Diagnostic::warning(
                        DiagnosticCode::InvariantViolation,
                        format!(
                            "'{}' node {} has no legal parent; deleted",
                            kind.name(),
                            node
                        ),
                    )
                    .with_node(node),
                );
                self.delete(builder, node);
                report.deleted += 1;
            }
            return;
        }

        let tree = builder.tree();
        match scope {
            Scope::Subtree => {
                for child in tree.children(node) {
                    follow(child, Scope::Subtree);
                }
            }
            Scope::Neighbors => {
                if let Some(next) = tree.next_sibling(node) {
                    follow(next, Scope::Single);
                }
            }
            Scope::Single => {}
        }
    }

    /// Sole child of a container: an empty run keeps the caret position
    fn is_sole_content(&self, builder: &Builder, node: NodeId, parent: NodeId) -> bool {
        let tree = builder.tree();
        tree.flags(parent).container
            && tree.previous_sibling(node).is_none()
            && tree.next_sibling(node).is_none()
    }

    fn delete(&self, builder: &mut Builder, node: NodeId) {
        builder.cut(node);
        builder.release(node);
    }

    fn join_previous(&self, builder: &mut Builder, node: NodeId) -> bool {
        let Some(previous) = builder.tree().previous_sibling(node) else {
            return false;
        };
        let Some(head_kind) = builder.kind_of(previous) else {
            return false;
        };
        let Some(join) = head_kind.join(builder.tree(), previous, node) else {
            return false;
        };

        debug!(head = %previous, tail = %node, kind = head_kind.name(), "Joining siblings");
        if let Some(attributes) = join.attributes {
            builder.set_attributes(previous, attributes);
        }
        builder.move_children(node, previous);
        self.delete(builder, node);
        true
    }

    fn adopt(&self, builder: &mut Builder, node: NodeId, parent: NodeId, kind: &dyn NodeKind) -> bool {
        let Some(adoption) = kind.adopt(builder.tree(), node) else {
            return false;
        };
        let anchor = builder.tree().next_sibling(node);

        match adoption {
            Adoption::Delete => {
                debug!(node = %node, kind = kind.name(), "Adopt hook deleted node");
                self.delete(builder, node);
                true
            }
            Adoption::Wrap { kind: wrap, attributes } => {
                let Some(wrapper) = builder.create(wrap, attributes) else {
                    return false;
                };
                if !builder.accepts(parent, wrapper) || !builder.accepts(wrapper, node) {
                    builder.release(wrapper);
                    return false;
                }
                debug!(node = %node, wrapper = wrap, "Wrapping rejected node");
                builder.attach(wrapper, node.into(), None);
                builder.attach(parent, wrapper.into(), anchor);
                true
            }
            Adoption::Convert { kind: into, attributes } => {
                let Some(replacement) = builder.create(into, attributes) else {
                    return false;
                };
                if !builder.accepts(parent, replacement) {
                    builder.release(replacement);
                    return false;
                }
                debug!(node = %node, from = kind.name(), to = into, "Converting rejected node");
                builder.move_children(node, replacement);
                self.delete(builder, node);
                builder.attach(parent, replacement.into(), anchor);
                true
            }
        }
    }

    /// Lift `node` out of `parent` to the nearest ancestor that accepts it
    /// (or its wrapper), splitting intermediate nodes to keep document order.
    /// A parent accepting the wrapper wraps the node in place.
    fn relocate(&self, builder: &mut Builder, node: NodeId, parent: NodeId, kind: &dyn NodeKind) -> bool {
        let candidates: Vec<NodeId> = std::iter::once(parent)
            .chain(builder.tree().ancestors(parent))
            .collect();
        let wrapper = kind.wrapper();

        let mut destination = None;
        for ancestor in candidates {
            if builder.accepts(ancestor, node) {
                destination = Some((ancestor, None));
                break;
            }
            if let Some(wrap) = wrapper {
                if builder.accepts_kind(ancestor, wrap) {
                    destination = Some((ancestor, Some(wrap)));
                    break;
                }
            }
        }
        let Some((target, wrap)) = destination else {
            return false;
        };

        debug!(node = %node, from = %parent, to = %target, "Relocating rejected node");
        while builder.tree().parent(node) != Some(target) {
            let Some(placement) = builder.split_around(node) else {
                return false;
            };
            builder.attach(placement.parent, node.into(), placement.anchor);
        }

        if let Some(wrap) = wrap {
            let Some(wrapper) = builder.create(wrap, Attributes::new()) else {
                return false;
            };
            let anchor = builder.tree().next_sibling(node);
            builder.attach(wrapper, node.into(), None);
            builder.attach(target, wrapper.into(), anchor);
        }
        true
    }

    /// Append the default block when the document does not end on an
    /// editable block
    fn ensure_root(&self, builder: &mut Builder, report: &mut NormalizeReport) -> bool {
        let root = builder.root();
        let tree = builder.tree();
        let satisfied = tree.last_child(root).is_some_and(|last| tree.flags(last).container);
        if satisfied {
            return false;
        }

        let Some(block) = builder.create(&self.default_block, Attributes::new()) else {
            return false;
        };
        if builder.append(root, block, None).is_none() {
            builder.release(block);
            return false;
        }
        debug!(node = %block, kind = %self.default_block, "Synthesized trailing block");
        report.synthesized += 1;
        true
    }
}
