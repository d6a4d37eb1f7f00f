//! Engine configuration

use crate::errors::{EditorError, EditorResult};
use crate::plugin::PluginRegistry;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for one editor engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Quiescence window before a history bunch is committed
    #[serde(default = "default_commit_delay_ms")]
    pub commit_delay_ms: u64,

    /// Repairs one normalization pass may perform before giving up
    #[serde(default = "default_normalize_budget")]
    pub normalize_budget: usize,

    /// Maximum timeline entries (0 = unlimited)
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Kind synthesized when the document does not end on an editable block
    #[serde(default = "default_block")]
    pub default_block: String,
}

fn default_commit_delay_ms() -> u64 {
    500
}

fn default_normalize_budget() -> usize {
    1000
}

fn default_history_limit() -> usize {
    100
}

fn default_block() -> String {
    "paragraph".to_string()
}

impl EngineConfig {
    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay_ms)
    }

    /// Check the settings against the kinds `registry` knows
    pub fn validate(&self, registry: &PluginRegistry) -> EditorResult<()> {
        let kind = registry
            .get(&self.default_block)
            .ok_or_else(|| EditorError::UnknownKind(self.default_block.clone()))?;
        if !kind.flags().container {
            return Err(EditorError::InvalidConfig(format!(
                "defaultBlock '{}' is not an editable block",
                self.default_block
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            commit_delay_ms: default_commit_delay_ms(),
            normalize_budget: default_normalize_budget(),
            history_limit: default_history_limit(),
            default_block: default_block(),
        }
    }
}
