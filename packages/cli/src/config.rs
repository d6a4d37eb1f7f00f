use folio_editor::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Folio configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding document files
    #[serde(default = "default_documents_dir")]
    pub documents_dir: String,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_documents_dir() -> String {
    "documents".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn documents_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.documents_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            engine: EngineConfig::default(),
        }
    }
}
