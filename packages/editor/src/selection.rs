//! Selection collaborator.
//!
//! Selections are expressed as structural paths so they survive history
//! replay, which recreates nodes under new ids.

use crate::tree::Path;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub anchor: Path,
    pub anchor_offset: usize,
    pub focus: Path,
    pub focus_offset: usize,
}

impl Selection {
    /// Collapsed selection at `offset` inside the node at `path`
    pub fn caret(path: Path, offset: usize) -> Self {
        Self {
            anchor: path.clone(),
            anchor_offset: offset,
            focus: path,
            focus_offset: offset,
        }
    }

    pub fn range(anchor: Path, anchor_offset: usize, focus: Path, focus_offset: usize) -> Self {
        Self {
            anchor,
            anchor_offset,
            focus,
            focus_offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus && self.anchor_offset == self.focus_offset
    }
}

/// Where the current selection lives (a browser selection, an editor
/// model, a test double)
pub trait SelectionPort {
    fn current(&self) -> Option<Selection>;

    fn restore(&mut self, selection: Option<&Selection>);
}

/// Selection held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySelection {
    selection: Option<Selection>,
}

impl MemorySelection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPort for MemorySelection {
    fn current(&self) -> Option<Selection> {
        self.selection.clone()
    }

    fn restore(&mut self, selection: Option<&Selection>) {
        self.selection = selection.cloned();
    }
}
