use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::EngineConfig;
use serde_json::json;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Documents directory
    #[arg(short, long, default_value = "documents")]
    pub documents_dir: String,

    /// Quiescence window before an undo entry is committed
    #[arg(long, default_value_t = 500)]
    pub commit_delay_ms: u64,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!("{} {} already exists", "⚠️".yellow(), DEFAULT_CONFIG_NAME.bright_white());
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Folio workspace...".bright_blue().bold());

    let documents_dir = cwd.join(&args.documents_dir);
    if !documents_dir.exists() {
        fs::create_dir_all(&documents_dir)?;
        println!("  {} Created {}/", "✓".green(), args.documents_dir);
    }

    let example_file = documents_dir.join("welcome.json");
    if !example_file.exists() {
        let example = json!([
            { "kind": "paragraph", "body": [
                { "kind": "text", "content": "Welcome to ", "modifiers": [] },
                { "kind": "text", "content": "Folio", "modifiers": ["bold"] }
            ] },
            { "kind": "list", "style": "bullet", "body": [
                { "kind": "list_item", "body": [
                    { "kind": "list_item_content", "body": [
                        { "kind": "text", "content": "Edit this file", "modifiers": [] }
                    ] }
                ] }
            ] },
            { "kind": "paragraph", "body": [] }
        ]);
        fs::write(&example_file, serde_json::to_string_pretty(&example)?)?;
        println!("  {} Created welcome.json", "✓".green());
    }

    let config = Config {
        documents_dir: args.documents_dir.clone(),
        engine: EngineConfig {
            commit_delay_ms: args.commit_delay_ms,
            ..EngineConfig::default()
        },
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Workspace initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/welcome.json", args.documents_dir);
    println!("  2. Run: folio check {}", args.documents_dir);
    println!("  3. Run: folio render {}/welcome.json", args.documents_dir);

    Ok(())
}
