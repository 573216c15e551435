//! Unmatched command - review queries the knowledge base could not answer

use anyhow::Result;
use colored::Colorize;

use faq_match::core::querylog::QueryLog;

pub fn run(log: &QueryLog, limit: Option<usize>, json: bool) -> Result<()> {
    let entries = log.read_unmatched()?;
    let limit = limit.unwrap_or(20);
    // Most recent first
    let recent: Vec<_> = entries.iter().rev().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&recent)?);
        return Ok(());
    }

    if recent.is_empty() {
        println!("{} No unmatched queries recorded", "→".dimmed());
        return Ok(());
    }

    println!(
        "{} {} of {} unmatched queries",
        "→".dimmed(),
        recent.len(),
        entries.len()
    );
    println!();

    for entry in recent {
        println!("{} {}", entry.timestamp.dimmed(), entry.query.cyan());
        if !entry.top_suggestions.is_empty() {
            println!("   {}", entry.top_suggestions.join(" | ").dimmed());
        }
    }
    Ok(())
}
