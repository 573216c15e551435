//! Import command - bulk load question/answer rows

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use faq_match::core::item::ImportRow;
use faq_match::core::reconcile::ImportMode;
use faq_match::search::FaqEngine;

/// Rows from a `.json` array or a `.yaml`/`.yml` sequence.
pub fn read_rows(path: &Path) -> Result<Vec<ImportRow>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let rows = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML rows in {}", path.display()))?,
        _ => serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON rows in {}", path.display()))?,
    };
    Ok(rows)
}

pub fn run(engine: &FaqEngine, file: &Path, mode: &str, dry_run: bool, json: bool) -> Result<()> {
    let rows = read_rows(file)?;
    let mode = ImportMode::parse(mode);

    let outcome = if dry_run {
        engine.preview_import(&rows, mode)?
    } else {
        engine.import(&rows, mode)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "{} {} rows from {} ({} mode{})",
            "→".dimmed(),
            rows.len(),
            file.display().to_string().cyan(),
            mode,
            if dry_run { ", dry run" } else { "" }
        );
        println!();

        if !outcome.errors.is_empty() {
            for error in &outcome.errors {
                println!("{} {}", "✗".red(), error);
            }
            println!();
            println!("{}", "Import rejected. Knowledge base unchanged.".red());
        } else {
            println!("Added:        {}", outcome.stats.added.to_string().green());
            println!("Updated:      {}", outcome.stats.updated.to_string().yellow());
            println!("Removed:      {}", outcome.stats.removed);
            println!("Deduplicated: {}", outcome.stats.deduplicated);
            println!("Total items:  {}", outcome.item_count.to_string().bold());

            if let Some(backup) = &outcome.backup {
                println!();
                println!("{} Previous knowledge base saved to {}", "✓".green(), backup.display());
            }
            if dry_run {
                println!();
                println!("{}", "Dry run: nothing was written.".yellow());
            }
        }
    }

    if !outcome.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
