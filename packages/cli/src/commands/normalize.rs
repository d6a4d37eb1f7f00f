use super::{find_documents, open_document, print_diagnostic};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::records_to_string;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Document file or directory of documents
    pub input: PathBuf,

    /// Write the normalized document here (single input file only)
    #[arg(short, long, conflicts_with = "write")]
    pub output: Option<PathBuf>,

    /// Rewrite files in place instead of printing
    #[arg(short, long)]
    pub write: bool,
}

pub fn normalize(args: NormalizeArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let files = find_documents(&args.input)?;
    if args.output.is_some() && files.len() != 1 {
        return Err(anyhow::anyhow!("--output needs a single input file"));
    }

    for file in &files {
        debug!(file = %file.display(), "Normalizing document");
        let mut engine = open_document(file, &config.engine)?;
        let output = records_to_string(&engine.get_json())?;

        let target = match (&args.output, args.write) {
            (Some(path), _) => Some(path.as_path()),
            (None, true) => Some(file.as_path()),
            (None, false) => None,
        };
        match target {
            Some(path) => {
                fs::write(path, format!("{}\n", output))?;
                println!("{} {} → {}", "✓".green(), file.display(), path.display());
            }
            None => println!("{}", output),
        }
        for diagnostic in engine.diagnostics().iter() {
            print_diagnostic(diagnostic);
        }
    }

    if args.write {
        println!();
        println!("✨ {} {} document(s) normalized", "Done".green().bold(), files.len());
    }
    Ok(())
}
