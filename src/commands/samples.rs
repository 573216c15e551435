use anyhow::Result;
use colored::Colorize;

use faq_match::search::FaqEngine;

pub fn run(engine: &FaqEngine, json: bool) -> Result<()> {
    let samples = engine.samples();

    if json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
    } else if samples.is_empty() {
        println!("{} Knowledge base is empty", "→".dimmed());
    } else {
        for question in samples {
            println!("{} {}", "•".dimmed(), question);
        }
    }
    Ok(())
}
