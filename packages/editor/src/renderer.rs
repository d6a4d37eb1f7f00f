//! # Renderer
//!
//! Reconciles the document tree onto a [`Host`] tree with minimal mutation.
//!
//! ## Design
//!
//! Change notifications are queued as render targets and flushed later by
//! [`Renderer::flush`]. A flush:
//!
//! 1. escalates each target to its nearest bound ancestor and drops targets
//!    nested inside other targets, so repeated notifications for one subtree
//!    cost a single pass
//! 2. builds the target's descriptor through each kind's `render`
//! 3. reconciles the descriptor against the existing host element
//!
//! ## Reuse ("lookahead")
//!
//! Materializing a child descriptor first looks among the existing host
//! siblings: the element already bound to the same document node wins,
//! otherwise the first element of the same tag that is not bound to a node
//! presented later in the same list. Reused elements are reconciled in
//! place (skipped entirely when their node is already in sync); unused
//! candidates are removed afterwards.
//!
//! ## Empty containers
//!
//! A container whose content renders nothing gets one synthetic trailing
//! marker element, so the host always has a caret position inside it. The
//! marker registry is owned by each renderer instance.

use crate::builder::Builder;
use crate::change::{Change, Notification, SubscriptionId};
use crate::descriptor::Descriptor;
use crate::host::{Host, HostId, HostNode};
use crate::node::NodeId;
use crate::tree::Tree;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, info, instrument};

/// Attribute identifying synthetic caret markers on the host
pub const MARKER_ATTRIBUTE: &str = "data-folio-marker";

const MARKER_TAG: &str = "br";

/// Position notification delivered to observers after a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub node: NodeId,
    pub host: HostId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Host churn caused by one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub created: usize,
    pub removed: usize,
    pub reused: usize,
    pub updated: usize,
}

type Observer = Box<dyn FnMut(&Layout)>;

pub struct Renderer {
    queue: Rc<RefCell<Vec<NodeId>>>,
    subscription: SubscriptionId,
    to_host: HashMap<NodeId, HostId>,
    to_node: HashMap<HostId, NodeId>,
    markers: HashSet<HostId>,
    observers: Vec<(ObserverId, NodeId, Observer)>,
    next_observer: u64,
}

impl Renderer {
    /// Create a renderer listening to `builder`'s changes. The first flush
    /// renders the whole document.
    pub fn new(builder: &mut Builder) -> Self {
        let queue = Rc::new(RefCell::new(vec![builder.root()]));
        let sink = Rc::clone(&queue);
        let subscription = builder.subscribe(move |notification: &Notification| {
            if !notification.change.is_mounted() {
                return;
            }
            let target = match &notification.change {
                Change::Append { parent, .. } | Change::Cut { parent, .. } => *parent,
                Change::Attribute { node, .. } => *node,
            };
            sink.borrow_mut().push(target);
        });

        Self {
            queue,
            subscription,
            to_host: HashMap::new(),
            to_node: HashMap::new(),
            markers: HashSet::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Stop listening to `builder`
    pub fn detach(self, builder: &mut Builder) {
        builder.unsubscribe(self.subscription);
    }

    pub fn is_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    /// Queue a full re-render from `node`
    pub fn invalidate(&mut self, node: NodeId) {
        self.queue.borrow_mut().push(node);
    }

    pub fn host_for(&self, node: NodeId) -> Option<HostId> {
        self.to_host.get(&node).copied()
    }

    pub fn node_for(&self, host: HostId) -> Option<NodeId> {
        self.to_node.get(&host).copied()
    }

    /// Host nodes currently serving as caret markers
    pub fn markers(&self) -> usize {
        self.markers.len()
    }

    /// Call `handler` after every flush that reconciles `node` or one of its
    /// ancestors
    pub fn observe(&mut self, node: NodeId, handler: impl FnMut(&Layout) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, node, Box::new(handler)));
        id
    }

    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _, _)| *observer != id);
        self.observers.len() != before
    }

    /// Reconcile every queued target onto `host`
    #[instrument(skip_all, fields(queued = self.queue.borrow().len()))]
    pub fn flush<H: Host>(&mut self, builder: &mut Builder, host: &mut H) -> RenderReport {
        let mut report = RenderReport::default();
        let pending: Vec<NodeId> = self.queue.borrow_mut().drain(..).collect();
        if pending.is_empty() {
            return report;
        }

        let root = builder.root();
        if self.to_host.get(&root) != Some(&host.root()) {
            self.bind(root, host.root());
        }

        let tree = builder.tree();
        let targets = self.targets(tree, pending);
        let mut synced = Vec::new();
        let mut reconciled = Vec::new();
        for target in targets {
            if let Some(done) = self.render_target(builder, host, target, &mut report, &mut synced) {
                reconciled.push(done);
            }
        }

        let tree = builder.tree_mut();
        for node in synced {
            tree.set_rendered(node, true);
        }
        for target in &reconciled {
            for ancestor in tree.ancestors(*target).collect::<Vec<_>>() {
                tree.set_rendered(ancestor, true);
            }
        }

        self.notify(builder.tree(), &reconciled);
        info!(
            targets = reconciled.len(),
            created = report.created,
            removed = report.removed,
            reused = report.reused,
            updated = report.updated,
            "Render flush complete"
        );
        report
    }

    /// Mounted, bound, outermost targets
    fn targets(&self, tree: &Tree, pending: Vec<NodeId>) -> Vec<NodeId> {
        let mut targets: Vec<NodeId> = Vec::new();
        for node in pending {
            if !tree.is_mount(node) {
                continue;
            }
            let bound = std::iter::once(node)
                .chain(tree.ancestors(node))
                .find(|candidate| self.to_host.contains_key(candidate));
            if let Some(bound) = bound {
                if !targets.contains(&bound) {
                    targets.push(bound);
                }
            }
        }

        targets
            .iter()
            .copied()
            .filter(|target| !targets.iter().any(|other| tree.contains(*other, *target)))
            .collect()
    }

    fn render_target<H: Host>(
        &mut self,
        builder: &Builder,
        host: &mut H,
        target: NodeId,
        report: &mut RenderReport,
        synced: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        let tree = builder.tree();
        let host_id = self.host_for(target)?;
        let parent = tree.parent(target);

        let descriptor = match self.describe(builder, target) {
            Some(descriptor) => descriptor,
            None => {
                return parent.and_then(|p| self.render_target(builder, host, p, report, synced));
            }
        };

        if let Some(parent) = parent {
            if !self.same_shape(host, host_id, &descriptor) {
                debug!(node = %target, "Presentation changed shape, escalating to parent");
                return self.render_target(builder, host, parent, report, synced);
            }
        }

        debug!(node = %target, host = host_id, "Reconciling subtree");
        self.reconcile(tree, host, host_id, &descriptor, report, synced);
        Some(target)
    }

    /// Descriptor for `node` and its subtree, bound to document nodes
    fn describe(&self, builder: &Builder, node: NodeId) -> Option<Descriptor> {
        let tree = builder.tree();
        let n = tree.get(node)?;
        let kind = builder.registry().get(n.kind())?;
        let children: Vec<Descriptor> = tree
            .children(node)
            .filter_map(|child| self.describe(builder, child))
            .collect();
        let empty = !children.iter().any(Descriptor::has_content);

        let mut descriptor = kind.render(n, children)?;
        descriptor.bind(node);
        if n.is_container() && empty {
            if let Descriptor::Element { children, .. } = &mut descriptor {
                children.push(Descriptor::Marker);
            }
        }
        Some(descriptor)
    }

    fn reconcile<H: Host>(
        &mut self,
        tree: &Tree,
        host: &mut H,
        host_id: HostId,
        descriptor: &Descriptor,
        report: &mut RenderReport,
        synced: &mut Vec<NodeId>,
    ) {
        match descriptor {
            Descriptor::Element {
                attributes, children, ..
            } => {
                self.sync_attributes(host, host_id, attributes, report);
                self.reconcile_children(tree, host, host_id, children, report, synced);
            }
            Descriptor::Text { content, .. } => {
                if let Some(HostNode::Text { content: current }) = host.describe(host_id) {
                    if &current != content {
                        host.set_text(host_id, content);
                        report.updated += 1;
                    }
                }
            }
            Descriptor::Marker => {}
        }

        if let Some(node) = descriptor.node() {
            self.bind(node, host_id);
            synced.push(node);
        }
    }

    fn reconcile_children<H: Host>(
        &mut self,
        tree: &Tree,
        host: &mut H,
        parent: HostId,
        descriptors: &[Descriptor],
        report: &mut RenderReport,
        synced: &mut Vec<NodeId>,
    ) {
        let mut remaining = host.children(parent);

        for (index, descriptor) in descriptors.iter().enumerate() {
            let upcoming = &descriptors[index + 1..];
            let child = match self.find_candidate(host, &remaining, descriptor, upcoming) {
                Some(position) => {
                    let candidate = remaining.remove(position);
                    report.reused += 1;
                    let in_sync = descriptor.node().is_some_and(|node| {
                        self.to_host.get(&node) == Some(&candidate)
                            && tree.get(node).is_some_and(|n| n.is_rendered())
                    });
                    if !in_sync {
                        self.reconcile(tree, host, candidate, descriptor, report, synced);
                    }
                    candidate
                }
                None => self.materialize(host, descriptor, report, synced),
            };

            let current = host.children(parent);
            if current.get(index) != Some(&child) {
                host.insert(parent, child, current.get(index).copied());
            }
        }

        for leftover in remaining {
            self.remove(host, parent, leftover, report);
        }
    }

    fn find_candidate<H: Host>(
        &self,
        host: &H,
        candidates: &[HostId],
        descriptor: &Descriptor,
        upcoming: &[Descriptor],
    ) -> Option<usize> {
        if let Some(bound) = descriptor.node().and_then(|node| self.host_for(node)) {
            if let Some(position) = candidates.iter().position(|c| *c == bound) {
                if self.same_shape(host, bound, descriptor) {
                    return Some(position);
                }
            }
        }

        candidates.iter().position(|candidate| {
            self.same_shape(host, *candidate, descriptor)
                && match self.node_for(*candidate) {
                    Some(owner) => !upcoming.iter().any(|d| d.node() == Some(owner)),
                    None => true,
                }
        })
    }

    fn same_shape<H: Host>(&self, host: &H, candidate: HostId, descriptor: &Descriptor) -> bool {
        let is_marker = self.markers.contains(&candidate);
        match (descriptor, host.describe(candidate)) {
            (Descriptor::Marker, _) => is_marker,
            (Descriptor::Element { tag, .. }, Some(HostNode::Element { tag: current, .. })) => {
                !is_marker && *tag == current
            }
            (Descriptor::Text { .. }, Some(HostNode::Text { .. })) => true,
            _ => false,
        }
    }

    fn materialize<H: Host>(
        &mut self,
        host: &mut H,
        descriptor: &Descriptor,
        report: &mut RenderReport,
        synced: &mut Vec<NodeId>,
    ) -> HostId {
        let id = match descriptor {
            Descriptor::Element {
                tag,
                attributes,
                children,
                ..
            } => {
                let id = host.create(&HostNode::Element {
                    tag: tag.clone(),
                    attributes: attributes.clone(),
                });
                for child in children {
                    let child = self.materialize(host, child, report, synced);
                    host.insert(id, child, None);
                }
                id
            }
            Descriptor::Text { content, .. } => host.create(&HostNode::Text {
                content: content.clone(),
            }),
            Descriptor::Marker => {
                let mut attributes = BTreeMap::new();
                attributes.insert(MARKER_ATTRIBUTE.to_string(), "true".to_string());
                let id = host.create(&HostNode::Element {
                    tag: MARKER_TAG.to_string(),
                    attributes,
                });
                self.markers.insert(id);
                id
            }
        };
        report.created += 1;

        if let Some(node) = descriptor.node() {
            self.bind(node, id);
            synced.push(node);
        }
        id
    }

    fn sync_attributes<H: Host>(
        &self,
        host: &mut H,
        host_id: HostId,
        wanted: &BTreeMap<String, String>,
        report: &mut RenderReport,
    ) {
        let Some(HostNode::Element { attributes, .. }) = host.describe(host_id) else {
            return;
        };
        for (name, value) in wanted {
            if attributes.get(name) != Some(value) {
                host.set_attribute(host_id, name, value);
                report.updated += 1;
            }
        }
        for name in attributes.keys() {
            if !wanted.contains_key(name) {
                host.remove_attribute(host_id, name);
                report.updated += 1;
            }
        }
    }

    fn remove<H: Host>(&mut self, host: &mut H, parent: HostId, child: HostId, report: &mut RenderReport) {
        self.unbind_subtree(host, child);
        host.remove(parent, child);
        report.removed += 1;
    }

    fn unbind_subtree<H: Host>(&mut self, host: &H, id: HostId) {
        for child in host.children(id) {
            self.unbind_subtree(host, child);
        }
        self.markers.remove(&id);
        if let Some(node) = self.to_node.remove(&id) {
            if self.to_host.get(&node) == Some(&id) {
                self.to_host.remove(&node);
            }
        }
    }

    fn bind(&mut self, node: NodeId, host: HostId) {
        if let Some(previous) = self.to_host.insert(node, host) {
            if previous != host {
                self.to_node.remove(&previous);
            }
        }
        if let Some(owner) = self.to_node.insert(host, node) {
            if owner != node && self.to_host.get(&owner) == Some(&host) {
                self.to_host.remove(&owner);
            }
        }
    }

    fn notify(&mut self, tree: &Tree, reconciled: &[NodeId]) {
        for (_, node, handler) in self.observers.iter_mut() {
            let affected = reconciled
                .iter()
                .any(|target| target == node || tree.contains(*target, *node));
            if !affected {
                continue;
            }
            if let Some(host) = self.to_host.get(node) {
                handler(&Layout {
                    node: *node,
                    host: *host,
                });
            }
        }
    }
}
