//! # Time Travel
//!
//! Undo/redo log of committed change batches.
//!
//! ## Design
//!
//! Node ids do not survive undo (nodes are recreated from snapshots), so
//! every recorded change is addressed by structural path:
//!
//! - attribute changes keep the previous and next attribute sets
//! - insertions and removals keep the container path, the sibling index and
//!   the serialized subtrees
//!
//! Changes accumulate into a bunch until [`TimeTravel::commit`] turns it into
//! an [`Entry`] on a linear timeline. Committing mid-timeline discards the
//! entries ahead. Replay runs under [`Origin::History`], which the history
//! itself and the normalizer ignore.

use crate::builder::Builder;
use crate::change::{Change, Notification, Origin, SubscriptionId};
use crate::config::EngineConfig;
use crate::errors::{EditorError, EditorResult};
use crate::json::JsonNode;
use crate::node::{Attributes, NodeId};
use crate::selection::{Selection, SelectionPort};
use crate::tree::Path;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, instrument, warn};

/// A recorded, path-addressed change
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryChange {
    Attribute {
        path: Path,
        previous: Attributes,
        next: Attributes,
    },
    Insert {
        parent_path: Path,
        index: usize,
        records: Vec<JsonNode>,
    },
    Remove {
        parent_path: Path,
        index: usize,
        records: Vec<JsonNode>,
    },
}

impl HistoryChange {
    fn from_change(change: &Change) -> Option<Self> {
        match change {
            Change::Attribute {
                path: Some(path),
                previous,
                next,
                ..
            } => Some(HistoryChange::Attribute {
                path: path.clone(),
                previous: previous.clone(),
                next: next.clone(),
            }),
            Change::Append {
                path: Some(path),
                records,
                ..
            } => {
                let (index, parent_path) = path.split_last()?;
                Some(HistoryChange::Insert {
                    parent_path: parent_path.to_vec(),
                    index: *index,
                    records: records.clone(),
                })
            }
            Change::Cut {
                path: Some(path),
                records,
                ..
            } => {
                let (index, parent_path) = path.split_last()?;
                Some(HistoryChange::Remove {
                    parent_path: parent_path.to_vec(),
                    index: *index,
                    records: records.clone(),
                })
            }
            _ => None,
        }
    }
}

/// One committed batch
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub changes: Vec<HistoryChange>,
    /// Selection before the first change of the batch
    pub before: Option<Selection>,
    /// Selection when the batch was committed
    pub after: Option<Selection>,
}

pub struct TimeTravel {
    bunch: Rc<RefCell<Vec<HistoryChange>>>,
    subscription: SubscriptionId,
    before: Option<Selection>,
    open: bool,
    entries: Vec<Entry>,
    position: usize,
    limit: usize,
}

impl TimeTravel {
    /// Create a log recording `builder`'s changes
    pub fn new(builder: &mut Builder, config: &EngineConfig) -> Self {
        let bunch = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&bunch);
        let subscription = builder.subscribe(move |notification: &Notification| {
            if notification.origin == Origin::History {
                return;
            }
            if let Some(change) = HistoryChange::from_change(&notification.change) {
                sink.borrow_mut().push(change);
            }
        });

        Self {
            bunch,
            subscription,
            before: None,
            open: false,
            entries: Vec::new(),
            position: 0,
            limit: config.history_limit,
        }
    }

    /// Stop recording `builder`'s changes
    pub fn detach(self, builder: &mut Builder) {
        builder.unsubscribe(self.subscription);
    }

    /// Note the selection that preceded an edit. Only the first edit of a
    /// bunch defines the entry's pre-edit selection.
    pub fn absorb(&mut self, before: Option<Selection>) {
        if !self.open && self.has_pending() {
            self.before = before;
            self.open = true;
        }
    }

    /// Changes are waiting to be committed
    pub fn has_pending(&self) -> bool {
        !self.bunch.borrow().is_empty()
    }

    /// Drop the uncommitted bunch
    pub fn discard_pending(&mut self) {
        self.bunch.borrow_mut().clear();
        self.before = None;
        self.open = false;
    }

    /// Push the current bunch onto the timeline.
    ///
    /// Returns whether an entry was created.
    pub fn commit(&mut self, after: Option<Selection>) -> bool {
        let changes: Vec<HistoryChange> = self.bunch.borrow_mut().drain(..).collect();
        let before = self.before.take();
        self.open = false;
        if changes.is_empty() {
            return false;
        }

        if self.position < self.entries.len() {
            debug!(
                discarded = self.entries.len() - self.position,
                "Discarding forward history"
            );
            self.entries.truncate(self.position);
        }
        let count = changes.len();
        self.entries.push(Entry {
            changes,
            before,
            after,
        });
        if self.limit > 0 && self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.position = self.entries.len();

        info!(changes = count, entries = self.entries.len(), "History entry committed");
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.position > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.position < self.entries.len()
    }

    /// Undo the entry before the current position.
    ///
    /// A pending bunch is committed first. Returns `false` at the oldest
    /// entry.
    #[instrument(skip_all, fields(position = self.position))]
    pub fn go_back(&mut self, builder: &mut Builder, selection: &mut dyn SelectionPort) -> EditorResult<bool> {
        if self.has_pending() {
            self.commit(selection.current());
        }
        if !self.can_go_back() {
            return Ok(false);
        }

        let entry = &self.entries[self.position - 1];
        builder.with_origin(Origin::History, |builder| {
            entry
                .changes
                .iter()
                .rev()
                .try_for_each(|change| replay(builder, change, false))
        })?;
        selection.restore(entry.before.as_ref());
        self.position -= 1;

        debug!(position = self.position, "Went back");
        Ok(true)
    }

    /// Redo the entry at the current position. Returns `false` at the
    /// newest entry.
    #[instrument(skip_all, fields(position = self.position))]
    pub fn go_forward(&mut self, builder: &mut Builder, selection: &mut dyn SelectionPort) -> EditorResult<bool> {
        if self.has_pending() {
            self.commit(selection.current());
        }
        if !self.can_go_forward() {
            return Ok(false);
        }

        let entry = &self.entries[self.position];
        builder.with_origin(Origin::History, |builder| {
            entry
                .changes
                .iter()
                .try_for_each(|change| replay(builder, change, true))
        })?;
        selection.restore(entry.after.as_ref());
        self.position += 1;

        debug!(position = self.position, "Went forward");
        Ok(true)
    }

    /// Forget every entry and the pending bunch
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
        self.discard_pending();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently applied
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Apply a recorded change (`forward`) or its inverse
fn replay(builder: &mut Builder, change: &HistoryChange, forward: bool) -> EditorResult<()> {
    match (change, forward) {
        (HistoryChange::Attribute { path, previous, next }, _) => {
            let node = resolve(builder, path)?;
            let attributes = if forward { next } else { previous };
            builder.set_attributes(node, attributes.clone());
            Ok(())
        }
        (HistoryChange::Insert { parent_path, index, records }, true)
        | (HistoryChange::Remove { parent_path, index, records }, false) => {
            insert(builder, parent_path, *index, records)
        }
        (HistoryChange::Insert { parent_path, index, records }, false)
        | (HistoryChange::Remove { parent_path, index, records }, true) => {
            remove(builder, parent_path, *index, records.len())
        }
    }
}

fn resolve(builder: &Builder, path: &[usize]) -> EditorResult<NodeId> {
    builder
        .tree()
        .resolve(path)
        .ok_or_else(|| EditorError::PathNotFound(path.to_vec()))
}

fn insert(builder: &mut Builder, parent_path: &[usize], index: usize, records: &[JsonNode]) -> EditorResult<()> {
    let parent = resolve(builder, parent_path)?;
    let anchor = builder.tree().child_at(parent, index);
    if anchor.is_none() && builder.tree().child_count(parent) < index {
        let mut path = parent_path.to_vec();
        path.push(index);
        return Err(EditorError::PathNotFound(path));
    }

    let fragment = builder.parse_json(records);
    if fragment.len() != records.len() {
        warn!(expected = records.len(), rebuilt = fragment.len(), "Snapshot only partially rebuilt");
        return Err(EditorError::Replay(format!(
            "rebuilt {} of {} recorded nodes",
            fragment.len(),
            records.len()
        )));
    }
    builder.attach(parent, fragment, anchor);
    Ok(())
}

fn remove(builder: &mut Builder, parent_path: &[usize], index: usize, count: usize) -> EditorResult<()> {
    let parent = resolve(builder, parent_path)?;
    let missing = |offset: usize| {
        let mut path = parent_path.to_vec();
        path.push(index + offset);
        EditorError::PathNotFound(path)
    };
    let first = builder.tree().child_at(parent, index).ok_or_else(|| missing(0))?;
    let last = builder
        .tree()
        .child_at(parent, index + count.saturating_sub(1))
        .ok_or_else(|| missing(count.saturating_sub(1)))?;

    for node in builder.cut_until(first, last) {
        builder.release(node);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::MemorySelection;

    fn setup(limit: usize) -> (Builder, TimeTravel, MemorySelection) {
        let mut builder = Builder::default();
        let config = EngineConfig {
            history_limit: limit,
            ..EngineConfig::default()
        };
        let history = TimeTravel::new(&mut builder, &config);
        (builder, history, MemorySelection::new())
    }

    fn add_paragraph(builder: &mut Builder, text: &str) -> NodeId {
        let root = builder.root();
        let p = builder.create("paragraph", Attributes::new()).unwrap();
        let t = builder.text(text).unwrap();
        builder.attach(p, t.into(), None);
        builder.append(root, p, None);
        p
    }

    #[test]
    fn test_back_and_forward_replay_structure() {
        let (mut builder, mut history, mut selection) = setup(0);
        add_paragraph(&mut builder, "one");
        history.commit(None);
        let after_first = builder.get_json();

        add_paragraph(&mut builder, "two");
        history.commit(None);
        let after_second = builder.get_json();

        assert!(history.go_back(&mut builder, &mut selection).unwrap());
        assert_eq!(builder.get_json(), after_first);
        assert!(history.go_forward(&mut builder, &mut selection).unwrap());
        assert_eq!(builder.get_json(), after_second);
    }

    #[test]
    fn test_navigation_past_the_ends_is_a_no_op() {
        let (mut builder, mut history, mut selection) = setup(0);
        assert!(!history.go_back(&mut builder, &mut selection).unwrap());
        add_paragraph(&mut builder, "x");
        history.commit(None);
        assert!(!history.go_forward(&mut builder, &mut selection).unwrap());
        assert!(history.go_back(&mut builder, &mut selection).unwrap());
        assert!(!history.go_back(&mut builder, &mut selection).unwrap());
        assert!(builder.get_json().is_empty());
    }

    #[test]
    fn test_commit_mid_timeline_discards_forward_entries() {
        let (mut builder, mut history, mut selection) = setup(0);
        add_paragraph(&mut builder, "a");
        history.commit(None);
        add_paragraph(&mut builder, "b");
        history.commit(None);

        history.go_back(&mut builder, &mut selection).unwrap();
        add_paragraph(&mut builder, "c");
        history.commit(None);

        assert_eq!(history.len(), 2);
        assert!(!history.can_go_forward());
    }

    #[test]
    fn test_limit_trims_oldest_entries() {
        let (mut builder, mut history, _) = setup(2);
        for word in ["a", "b", "c"] {
            add_paragraph(&mut builder, word);
            history.commit(None);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.position(), 2);
    }

    #[test]
    fn test_replayed_changes_are_not_recorded() {
        let (mut builder, mut history, mut selection) = setup(0);
        add_paragraph(&mut builder, "a");
        history.commit(None);
        history.go_back(&mut builder, &mut selection).unwrap();
        assert!(!history.has_pending());
    }

    #[test]
    fn test_selection_restored_on_navigation() {
        let (mut builder, mut history, mut selection) = setup(0);
        let before = Selection::caret(vec![0, 0], 1);
        let after = Selection::caret(vec![1, 0], 2);

        add_paragraph(&mut builder, "a");
        history.absorb(Some(before.clone()));
        add_paragraph(&mut builder, "b");
        history.absorb(Some(after.clone()));
        history.commit(Some(after.clone()));

        history.go_back(&mut builder, &mut selection).unwrap();
        assert_eq!(selection.current(), Some(before));
        history.go_forward(&mut builder, &mut selection).unwrap();
        assert_eq!(selection.current(), Some(after));
    }

    #[test]
    fn test_attribute_changes_are_reverted() {
        let (mut builder, mut history, mut selection) = setup(0);
        let p = add_paragraph(&mut builder, "hello");
        history.commit(None);
        let t = builder.tree().first_child(p).unwrap();
        builder.set_content(t, "bye");
        history.commit(None);

        history.go_back(&mut builder, &mut selection).unwrap();
        let t = builder.tree().resolve(&[0, 0]).unwrap();
        assert_eq!(builder.tree().get(t).unwrap().content(), "hello");
        assert_eq!(builder.tree().length(builder.root()), 5);
    }
}
