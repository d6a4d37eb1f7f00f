//! # Engine
//!
//! Wires one editor instance together: builder, normalizer, renderer, time
//! travel, selection port and scheduler. All state (including the
//! renderer's marker registry) is per engine, so several editors can live in
//! one process.
//!
//! Edits go through [`Engine::edit`] (or one of its delegates), which
//! schedules normalization and rendering with zero delay and restarts the
//! debounced history commit. Hosts call [`Engine::run_pending`] from their
//! idle/frame callback; consumers needing synchronous state use
//! [`Engine::flush`], [`Engine::get_json`] or [`Engine::commit`].

use crate::builder::{Builder, Fragment, Split};
use crate::change::{Notification, Origin, SubscriptionId};
use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::errors::EditorResult;
use crate::history::TimeTravel;
use crate::host::Host;
use crate::json::JsonNode;
use crate::node::{Attributes, NodeId};
use crate::normalizer::{NormalizeReport, Normalizer};
use crate::plugin::PluginRegistry;
use crate::renderer::{Layout, ObserverId, RenderReport, Renderer};
use crate::scheduler::{Scheduler, Task, TaskHandle};
use crate::selection::{MemorySelection, Selection, SelectionPort};
use crate::tree::Tree;
use crate::vtree::VNode;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct Engine<H: Host, S: Scheduler> {
    builder: Builder,
    normalizer: Normalizer,
    renderer: Renderer,
    history: TimeTravel,
    host: H,
    scheduler: S,
    selection: Box<dyn SelectionPort>,
    config: EngineConfig,
    pending: HashMap<Task, TaskHandle>,
}

impl<H: Host, S: Scheduler> Engine<H, S> {
    /// Engine with the built-in kinds
    pub fn new(host: H, scheduler: S, config: EngineConfig) -> Self {
        Self::with_registry(host, scheduler, config, PluginRegistry::with_defaults())
    }

    /// Like [`Engine::new`], rejecting a configuration the built-in kinds cannot honor
    pub fn try_new(host: H, scheduler: S, config: EngineConfig) -> EditorResult<Self> {
        Self::try_with_registry(host, scheduler, config, PluginRegistry::with_defaults())
    }

    pub fn try_with_registry(
        host: H,
        scheduler: S,
        config: EngineConfig,
        registry: PluginRegistry,
    ) -> EditorResult<Self> {
        config.validate(&registry)?;
        Ok(Self::with_registry(host, scheduler, config, registry))
    }

    pub fn with_registry(host: H, scheduler: S, config: EngineConfig, registry: PluginRegistry) -> Self {
        let mut builder = Builder::new(registry);
        let normalizer = Normalizer::new(&mut builder, &config);
        let renderer = Renderer::new(&mut builder);
        let history = TimeTravel::new(&mut builder, &config);

        let mut engine = Self {
            builder,
            normalizer,
            renderer,
            history,
            host,
            scheduler,
            selection: Box::new(MemorySelection::new()),
            config,
            pending: HashMap::new(),
        };
        engine.defer(Task::Render, Duration::ZERO);
        engine
    }

    /// Replace the selection collaborator
    pub fn with_selection(mut self, selection: impl SelectionPort + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Run `f` against the builder, then schedule catch-up work
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Builder) -> R) -> R {
        let before = self.selection.current();
        let result = f(&mut self.builder);
        if self.history.has_pending() {
            self.history.absorb(before);
            self.defer(Task::Commit, self.config.commit_delay());
        }
        self.schedule_catch_up();
        result
    }

    pub fn create(&mut self, kind: &str, attributes: Attributes) -> Option<NodeId> {
        self.builder.create(kind, attributes)
    }

    pub fn text(&mut self, content: &str) -> Option<NodeId> {
        self.builder.text(content)
    }

    pub fn append(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) -> Option<NodeId> {
        self.edit(|builder| builder.append(parent, node, anchor))
    }

    pub fn append_fragment(&mut self, parent: NodeId, fragment: Fragment, anchor: Option<NodeId>) -> Vec<NodeId> {
        self.edit(|builder| builder.append_fragment(parent, fragment, anchor))
    }

    pub fn cut(&mut self, node: NodeId) -> bool {
        self.edit(|builder| builder.cut(node))
    }

    pub fn cut_until(&mut self, node: NodeId, until: NodeId) -> Vec<NodeId> {
        self.edit(|builder| builder.cut_until(node, until))
    }

    pub fn split(&mut self, node: NodeId, offset: usize) -> Split {
        self.edit(|builder| builder.split(node, offset))
    }

    pub fn replace(&mut self, node: NodeId, replacement: impl Into<Fragment>) -> bool {
        self.edit(|builder| builder.replace(node, replacement))
    }

    pub fn replace_until(&mut self, node: NodeId, until: NodeId, replacement: impl Into<Fragment>) -> bool {
        self.edit(|builder| builder.replace_until(node, until, replacement))
    }

    pub fn set_attributes(&mut self, node: NodeId, attributes: Attributes) -> bool {
        self.edit(|builder| builder.set_attributes(node, attributes))
    }

    pub fn update_attributes(&mut self, node: NodeId, patch: Attributes) -> bool {
        self.edit(|builder| builder.update_attributes(node, patch))
    }

    pub fn duplicate(&mut self, node: NodeId) -> Option<NodeId> {
        self.builder.duplicate(node)
    }

    /// Import a virtual tree as detached nodes
    pub fn parse(&mut self, vnodes: &[VNode]) -> Fragment {
        self.builder.parse(vnodes)
    }

    /// Rebuild records and append them under `parent`
    pub fn insert_json(&mut self, parent: NodeId, records: &[JsonNode], anchor: Option<NodeId>) -> Vec<NodeId> {
        self.edit(|builder| {
            let fragment = builder.parse_json(records);
            builder.append_fragment(parent, fragment, anchor)
        })
    }

    // ------------------------------------------------------------------
    // Deferred work
    // ------------------------------------------------------------------

    /// Run every due task. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        loop {
            let due = self.scheduler.take_due();
            if due.is_empty() {
                break;
            }
            for task in due {
                debug!(?task, "Running deferred task");
                match task {
                    Task::Normalize => {
                        self.normalize();
                    }
                    Task::Render => {
                        self.render();
                    }
                    Task::Commit => {
                        self.commit();
                    }
                }
                ran += 1;
            }
        }
        ran
    }

    /// Force pending normalization and rendering
    pub fn flush(&mut self) -> (NormalizeReport, RenderReport) {
        let normalized = self.normalize();
        let rendered = self.render();
        (normalized, rendered)
    }

    /// Run pending normalization now
    pub fn normalize(&mut self) -> NormalizeReport {
        self.cancel(Task::Normalize);
        let report = self.normalizer.normalize(&mut self.builder);
        self.schedule_catch_up();
        report
    }

    /// Run pending rendering now
    pub fn render(&mut self) -> RenderReport {
        self.cancel(Task::Render);
        self.renderer.flush(&mut self.builder, &mut self.host)
    }

    /// Normalize, then push the pending bunch onto the timeline
    pub fn commit(&mut self) -> bool {
        self.normalize();
        self.cancel(Task::Commit);
        self.history.commit(self.selection.current())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    #[instrument(skip_all)]
    pub fn go_back(&mut self) -> EditorResult<bool> {
        self.commit();
        let moved = self
            .history
            .go_back(&mut self.builder, self.selection.as_mut())?;
        self.schedule_catch_up();
        Ok(moved)
    }

    #[instrument(skip_all)]
    pub fn go_forward(&mut self) -> EditorResult<bool> {
        self.commit();
        let moved = self
            .history
            .go_forward(&mut self.builder, self.selection.as_mut())?;
        self.schedule_catch_up();
        Ok(moved)
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back() || self.history.has_pending()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    pub fn history(&self) -> &TimeTravel {
        &self.history
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// The normalized document
    pub fn get_json(&mut self) -> Vec<JsonNode> {
        self.normalize();
        self.builder.get_json()
    }

    /// Replace the document without recording history, then normalize
    pub fn load_json(&mut self, records: &[JsonNode]) -> NormalizeReport {
        self.builder.with_origin(Origin::History, |builder| {
            builder.clear();
            let root = builder.root();
            let fragment = builder.parse_json(records);
            builder.attach(root, fragment, None);
        });
        let report = self.normalizer.normalize_all(&mut self.builder);
        self.history.clear();
        self.renderer.invalidate(self.builder.root());
        self.cancel(Task::Commit);
        self.schedule_catch_up();
        report
    }

    // ------------------------------------------------------------------
    // Collaborators
    // ------------------------------------------------------------------

    pub fn selection(&self) -> Option<Selection> {
        self.selection.current()
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection.restore(selection.as_ref());
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&Notification) + 'static) -> SubscriptionId {
        self.builder.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.builder.unsubscribe(id)
    }

    pub fn observe(&mut self, node: NodeId, handler: impl FnMut(&Layout) + 'static) -> ObserverId {
        self.renderer.observe(node, handler)
    }

    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        self.renderer.unobserve(id)
    }

    pub fn root(&self) -> NodeId {
        self.builder.root()
    }

    pub fn tree(&self) -> &Tree {
        self.builder.tree()
    }

    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.builder.diagnostics()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Defer normalization/rendering for whatever is pending. A history
    /// bunch produced outside `edit` (normalizer repairs) gets a commit if
    /// none is scheduled yet.
    fn schedule_catch_up(&mut self) {
        if self.normalizer.is_pending() {
            self.defer(Task::Normalize, Duration::ZERO);
        }
        if self.renderer.is_pending() {
            self.defer(Task::Render, Duration::ZERO);
        }
        if self.history.has_pending() && !self.scheduler.is_scheduled(Task::Commit) {
            self.defer(Task::Commit, self.config.commit_delay());
        }
    }

    fn defer(&mut self, task: Task, delay: Duration) {
        let handle = self.scheduler.defer(task, delay);
        self.pending.insert(task, handle);
    }

    fn cancel(&mut self, task: Task) {
        if let Some(handle) = self.pending.remove(&task) {
            self.scheduler.cancel(handle);
        }
    }
}
