use super::{open_document, print_diagnostic};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Document file
    pub input: PathBuf,

    /// Write markup here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn render(args: RenderArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let engine = open_document(&args.input, &config.engine)?;
    let markup = engine.host().to_markup();

    match &args.output {
        Some(path) => fs::write(path, format!("{}\n", markup))?,
        None => println!("{}", markup),
    }
    for diagnostic in engine.diagnostics().iter() {
        print_diagnostic(diagnostic);
    }
    Ok(())
}
