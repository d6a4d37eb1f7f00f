use super::{find_documents, read_document};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_editor::{check as audit, Builder, CheckReport};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Document file or directory to check
    pub input: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn check(args: CheckArgs, _cwd: &Path) -> Result<()> {
    let files = find_documents(&args.input)?;
    let json = args.format == "json";
    if !json {
        println!("🔍 {} Folio document check", "Starting".green().bold());
        println!("   Found {} document(s)", files.len());
        println!();
    }

    let mut failed = 0;
    let mut reports = Vec::new();
    for file in &files {
        let report = check_file(file)?;
        if !report.is_clean() {
            failed += 1;
        }
        if json {
            reports.push(serde_json::json!({ "file": file.display().to_string(), "report": report }));
        } else {
            print_report(file, &report);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!();
        println!(
            "✨ {} {} checked, {} with violations",
            if failed > 0 { "Done".red().bold() } else { "Done".green().bold() },
            files.len(),
            failed
        );
    }

    if failed > 0 {
        return Err(anyhow::anyhow!("{} document(s) are not normalized", failed));
    }
    Ok(())
}

/// Load exactly as stored, without repairs
fn check_file(path: &Path) -> Result<CheckReport> {
    let records = read_document(path)?;
    let mut builder = Builder::default();
    let root = builder.root();
    let fragment = builder.parse_json(&records);
    builder.attach(root, fragment, None);
    Ok(audit(&builder))
}

fn print_report(path: &Path, report: &CheckReport) {
    if report.is_clean() {
        println!("   {} {} ({} nodes, length {})", "✓".green(), path.display(), report.nodes, report.length);
        return;
    }
    println!("   {} {}", "✗".red(), path.display());
    for violation in &report.violations {
        println!("     {} {}", "-".yellow(), violation);
    }
}
