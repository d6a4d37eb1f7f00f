pub mod check;
pub mod init;
pub mod normalize;
pub mod render;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use render::{render, RenderArgs};

use anyhow::{Context, Result};
use colored::Colorize;
use folio_editor::{read_records, Diagnostic, DiagnosticLevel, Engine, EngineConfig, JsonNode, MemoryHost, VirtualClock};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Engine used by the one-shot commands: in-memory host, manual clock
pub(crate) type BatchEngine = Engine<MemoryHost, VirtualClock>;

pub(crate) fn read_document(path: &Path) -> Result<Vec<JsonNode>> {
    read_records(path).with_context(|| format!("Cannot load document {}", path.display()))
}

/// Load a document into a fresh engine and settle all deferred work
pub(crate) fn open_document(path: &Path, config: &EngineConfig) -> Result<BatchEngine> {
    let records = read_document(path)?;
    let mut engine = Engine::try_new(MemoryHost::new(), VirtualClock::new(), config.clone())
        .context("Invalid engine configuration")?;
    engine.load_json(&records);
    engine.flush();
    Ok(engine)
}

/// Document files under `input` (or `input` itself)
pub(crate) fn find_documents(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", input.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn print_diagnostic(diagnostic: &Diagnostic) {
    let label = match diagnostic.level {
        DiagnosticLevel::Warning => "warning".yellow().bold(),
        DiagnosticLevel::Info => "info".blue().bold(),
    };
    println!("   {} [{:?}] {}", label, diagnostic.code, diagnostic.message);
}
