//! Ask command - answer a question from the knowledge base

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use faq_match::search::{FaqEngine, ReplyKind, Signals};

#[derive(Debug, Serialize)]
struct ExplainRow {
    question: String,
    score: f32,
    #[serde(flatten)]
    signals: Signals,
}

pub fn run(engine: &FaqEngine, query: &str, json: bool, explain: bool) -> Result<()> {
    let reply = engine.ask(query);
    let explained = if explain { explain_rows(engine, query) } else { Vec::new() };

    if json {
        let mut value = serde_json::to_value(&reply)?;
        if explain {
            value["explain"] = serde_json::to_value(&explained)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match reply.kind {
        ReplyKind::Direct => println!("{}", reply.reply.green()),
        ReplyKind::Disambiguate => println!("{}", reply.reply.yellow()),
        ReplyKind::NoMatch | ReplyKind::EmptyKnowledgeBase => println!("{}", reply.reply.red()),
    }

    if !reply.suggestions.is_empty() {
        println!();
        for (i, suggestion) in reply.suggestions.iter().enumerate() {
            println!("{}. {}", (i + 1).to_string().bold(), suggestion.cyan());
        }
    }

    if explain && !explained.is_empty() {
        println!();
        println!("{}", "Scoring".bold());
        for row in &explained {
            let score_str = format!("{:.3}", row.score);
            let score_colored = if row.score >= engine.config().direct_threshold {
                score_str.green()
            } else if row.score >= engine.config().min_suggestion_score {
                score_str.yellow()
            } else {
                score_str.dimmed()
            };
            println!("[{}] {}", score_colored, row.question);
            println!(
                "   {}",
                format!(
                    "exact {:.2} | fuzzy {:.2} | bm25 {:.2} | keyword {:.2} | lexical {:.3}",
                    row.signals.exact,
                    row.signals.fuzzy,
                    row.signals.bm25,
                    row.signals.keyword,
                    row.signals.blended
                )
                .dimmed()
            );
        }
    }

    Ok(())
}

fn explain_rows(engine: &FaqEngine, query: &str) -> Vec<ExplainRow> {
    let snapshot = engine.snapshot();
    snapshot
        .rank(query, engine.config())
        .into_iter()
        .take(engine.config().top_k)
        .filter_map(|c| {
            let signals = snapshot.signals(query, c.index)?;
            Some(ExplainRow {
                question: snapshot.items[c.index].question.clone(),
                score: c.score,
                signals,
            })
        })
        .collect()
}
