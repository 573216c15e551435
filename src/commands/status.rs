use anyhow::Result;
use colored::*;
use serde::Serialize;

use faq_match::core::store::list_backups;
use faq_match::search::FaqEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticState {
    Enabled,
    /// Model loaded, but the current snapshot has no vectors.
    Inactive,
    DisabledByConfig,
    ModelMissing,
}

#[derive(Debug, Serialize)]
pub struct KbStatus {
    pub root: String,
    pub items: usize,
    pub generation: u64,
    pub keywords: usize,
    pub tagged: usize,
    pub semantic_enabled: bool,
    pub semantic_state: SemanticState,
    pub model: Option<String>,
    pub backups: usize,
    pub unmatched: usize,
}

pub fn collect(engine: &FaqEngine) -> Result<KbStatus> {
    let snapshot = engine.snapshot();
    let backups = list_backups(engine.paths())?.len();
    let unmatched = engine.query_log().read_unmatched()?.len();

    let semantic_state = if snapshot.semantic_enabled() {
        SemanticState::Enabled
    } else if !engine.config().semantic.enabled {
        SemanticState::DisabledByConfig
    } else if engine.semantic_backend().is_enabled() {
        SemanticState::Inactive
    } else {
        SemanticState::ModelMissing
    };

    Ok(KbStatus {
        root: engine.paths().root.display().to_string(),
        items: snapshot.items.len(),
        generation: snapshot.generation,
        keywords: snapshot.items.iter().map(|it| it.keywords.len()).sum(),
        tagged: snapshot.items.iter().filter(|it| !it.tags.is_empty()).count(),
        semantic_enabled: snapshot.semantic_enabled(),
        semantic_state,
        model: engine.semantic_backend().model_id().map(str::to_string),
        backups,
        unmatched,
    })
}

pub fn run(engine: &FaqEngine, brief: bool, json: bool) -> Result<()> {
    let status = collect(engine)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if brief {
        println!(
            "Items: {} | Semantic: {} | Unmatched: {}",
            status.items,
            if status.semantic_enabled { "on" } else { "off" },
            status.unmatched
        );
        return Ok(());
    }

    println!("{}", "Knowledge Base Status".bold());
    println!("{}", "=".repeat(50));
    println!();
    println!("Root:       {}", status.root.cyan());
    println!(
        "Items:      {}",
        if status.items == 0 {
            status.items.to_string().red()
        } else {
            status.items.to_string().green()
        }
    );
    println!("Keywords:   {}", status.keywords);
    println!("Tagged:     {}", status.tagged);
    println!("Backups:    {}", status.backups);
    println!(
        "Unmatched:  {}",
        if status.unmatched > 0 {
            status.unmatched.to_string().yellow()
        } else {
            status.unmatched.to_string().green()
        }
    );
    println!();

    println!("{}", "Semantic scoring".cyan());
    let model = status.model.as_deref().unwrap_or("unknown");
    match status.semantic_state {
        SemanticState::Enabled => println!("{} enabled ({})", "✓".green(), model),
        SemanticState::Inactive => println!(
            "{} model {} loaded but not active for this snapshot",
            "!".yellow(),
            model
        ),
        SemanticState::DisabledByConfig => println!(
            "{} disabled by config (semantic.enabled: false in {})",
            "✗".dimmed(),
            engine.paths().config_file.display()
        ),
        SemanticState::ModelMissing => println!(
            "{} disabled (lexical only). Install a model under {}",
            "✗".dimmed(),
            engine.config().model_dir(engine.paths()).display()
        ),
    }

    Ok(())
}
