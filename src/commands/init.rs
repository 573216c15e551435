use anyhow::{Context, Result};
use colored::*;
use std::fs;

use faq_match::core::config::Config;
use faq_match::core::paths::KbPaths;

pub fn run(paths: &KbPaths, force: bool) -> Result<()> {
    println!("{}", "FAQ Knowledge Base Setup".bold());
    println!("{}", "=".repeat(50));
    println!();

    let mut created = 0;

    for (path, purpose) in paths.required_folders() {
        if path.exists() {
            println!("{} {} exists ({})", "✓".green(), path.display(), purpose);
        } else {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            created += 1;
            println!("{} Created {} ({})", "✓".green(), path.display(), purpose);
        }
    }

    println!();
    if paths.config_file.exists() && !force {
        println!(
            "{} {} exists (use --force to overwrite with defaults)",
            "✓".green(),
            paths.config_file.display()
        );
    } else {
        fs::write(&paths.config_file, Config::default().to_yaml()?)
            .with_context(|| format!("Failed to write {}", paths.config_file.display()))?;
        println!("{} Wrote default config to {}", "✓".green(), paths.config_file.display());
    }

    println!();
    println!("Created: {} folders", created.to_string().green());
    if !paths.kb_file.exists() {
        println!(
            "{}",
            "Knowledge base is empty. Run `faq import <file>` to load questions.".yellow()
        );
    }
    Ok(())
}
