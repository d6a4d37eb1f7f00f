//! Diagnostics for input the core refused or repaired.
//!
//! Nothing here is an error path: a dropped node or a normalizer deletion is
//! recorded and logged, and editing continues.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// No ancestor accepts an inserted node
    StructuralRejection,
    /// Illegal parent/child pairing found by the normalizer
    InvariantViolation,
    /// Record or plugin lookup for an unregistered kind
    UnknownKind,
    /// Nobody claimed an external node
    Unclaimed,
    /// Normalization stopped on its iteration budget
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub message: String,
    pub node: Option<NodeId>,
}

impl Diagnostic {
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            code,
            message: message.into(),
            node: None,
        }
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            code,
            message: message.into(),
            node: None,
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

const DEFAULT_CAPACITY: usize = 256;

/// Bounded diagnostic log; the oldest entries fall off first
#[derive(Debug)]
pub struct Diagnostics {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!(
            code = ?diagnostic.code,
            node = ?diagnostic.node,
            "{}",
            diagnostic.message
        );
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}
