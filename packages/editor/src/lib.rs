//! # Folio Editor
//!
//! Core document engine for the Folio rich-content editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ builder: the only way to mutate the tree    │
//! │  - append / cut / split / replace / parse   │
//! │  - publishes changes on the change bus      │
//! └─────────────────────────────────────────────┘
//!          ↓ changes                ↓ changes
//! ┌──────────────────────┐ ┌────────────────────┐
//! │ normalizer           │ │ history            │
//! │  join / delete /     │ │  groups changes    │
//! │  adopt / relocate    │ │  into entries,     │
//! │  dirty nodes         │ │  replays them      │
//! └──────────────────────┘ └────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────────┐
//! │ renderer: descriptors → host reconciliation │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The [`Engine`] ties the pieces together and drives deferred work through a
//! [`Scheduler`] port. Normalization always runs before rendering, and both
//! run before a pending history entry is committed.
//!
//! ## Core Principles
//!
//! 1. **Tree is source of truth**: host nodes and serialized records are derived
//! 2. **Structure lives in plugins**: every rule comes from a [`NodeKind`]
//! 3. **Edits stay cheap**: repairs and rendering are batched and deferred
//! 4. **Undo replays changes**: history never snapshots the document
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{EngineConfig, Engine, MemoryHost, VirtualClock};
//!
//! let mut engine = Engine::new(MemoryHost::new(), VirtualClock::new(), EngineConfig::default());
//! let root = engine.root();
//! engine.edit(|builder| {
//!     let paragraph = builder.create("paragraph", Default::default())?;
//!     let text = builder.text("Hello")?;
//!     builder.append(paragraph, text, None);
//!     builder.append(root, paragraph, None)
//! });
//! engine.flush();
//!
//! println!("{}", engine.host().to_markup());
//! ```

mod builder;
mod change;
mod check;
mod config;
mod descriptor;
mod diagnostics;
mod engine;
mod errors;
mod history;
mod host;
mod json;
pub mod kinds;
mod node;
mod normalizer;
mod plugin;
mod renderer;
mod scheduler;
mod selection;
mod tree;
mod visitor;
mod vtree;

pub use builder::{Builder, Fragment, Placement, Split};
pub use change::{Change, ChangeBus, Notification, Origin, SubscriptionId};
pub use check::{check, CheckReport, Violation};
pub use config::EngineConfig;
pub use descriptor::Descriptor;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLevel, Diagnostics};
pub use engine::Engine;
pub use errors::{EditorError, EditorResult};
pub use history::{Entry, HistoryChange, TimeTravel};
pub use host::{Host, HostId, HostNode, HostStats, MemoryHost};
pub use json::{from_str as records_from_str, read_file as read_records, to_string_pretty as records_to_string, JsonNode};
pub use node::{Attributes, Node, NodeFlags, NodeId};
pub use normalizer::{NormalizeReport, Normalizer};
pub use plugin::{Adoption, Join, NodeKind, ParseContext, Parsed, PluginRegistry, SplitPlan};
pub use renderer::{Layout, ObserverId, RenderReport, Renderer, MARKER_ATTRIBUTE};
pub use scheduler::{Scheduler, SystemClock, Task, TaskHandle, VirtualClock};
pub use selection::{MemorySelection, Selection, SelectionPort};
pub use tree::{Ancestors, Children, Path, Tree, ROOT_KIND};
pub use visitor::{walk_children, walk_node, walk_tree, PlainText, Visitor};
pub use vtree::VNode;
