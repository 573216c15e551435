use std::fs;

use anyhow::Result;
use faq_match::core::store::{list_backups, load_kb};
use faq_match::search::SemanticBackend;
use faq_match::{Config, FaqEngine, ImportMode, ImportRow, KbPaths, ReplyKind};
use tempfile::TempDir;

fn rows() -> Vec<ImportRow> {
    vec![
        ImportRow::new("How to reset password?", "Use the reset link on the login page.")
            .with_keywords("reset password; forgot password"),
        ImportRow::new("How to change email?", "Open account settings and edit your email.")
            .with_keywords("change email"),
        ImportRow::new("What is refund policy?", "Refunds are accepted within 30 days.")
            .with_keywords("refund; money back")
            .with_tags("billing"),
    ]
}

#[test]
fn import_persist_reload_ask() -> Result<()> {
    let tmp = TempDir::new()?;
    let paths = KbPaths::from_root(tmp.path().to_path_buf());
    paths.ensure_dirs()?;

    let engine = FaqEngine::open(KbPaths::from_root(tmp.path().to_path_buf()))?;
    assert_eq!(engine.ask("anything").kind, ReplyKind::EmptyKnowledgeBase);

    let outcome = engine.import(&rows(), ImportMode::Replace)?;
    assert!(outcome.persisted);
    assert!(outcome.backup.is_none());
    assert_eq!(outcome.stats.added, 3);

    // A second engine over the same root sees the persisted snapshot
    let reopened = FaqEngine::open(KbPaths::from_root(tmp.path().to_path_buf()))?;
    assert_eq!(reopened.snapshot().items.len(), 3);

    let ranked = reopened.rank("I forgot my password");
    let top = &reopened.snapshot().items[ranked[0].index];
    assert_eq!(top.question, "How to reset password?");

    let reply = reopened.ask("reset password");
    assert_eq!(reply.kind, ReplyKind::Disambiguate);
    assert_eq!(reply.suggestions, vec!["How to reset password?"]);

    let reply = reopened.ask("How to change email?");
    assert_eq!(reply.kind, ReplyKind::Direct);
    assert!(!reply.suggestions.contains(&"How to change email?".to_string()));

    // Re-importing the same rows keeps the identities stable
    let ids: Vec<String> = load_kb(&paths)?.into_iter().map(|it| it.id).collect();
    let again = engine.import(&rows(), ImportMode::Replace)?;
    assert_eq!(again.stats.added, 0);
    assert_eq!(again.stats.updated, 3);
    assert!(again.backup.is_some());
    assert_eq!(list_backups(&paths)?.len(), 1);

    let ids_after: Vec<String> = load_kb(&paths)?.into_iter().map(|it| it.id).collect();
    assert_eq!(ids, ids_after);
    Ok(())
}

#[test]
fn append_merges_and_rejects_bad_batches() -> Result<()> {
    let tmp = TempDir::new()?;
    let paths = KbPaths::from_root(tmp.path().to_path_buf());
    let engine = FaqEngine::with_backend(
        KbPaths::from_root(tmp.path().to_path_buf()),
        Config::default(),
        SemanticBackend::Disabled,
    )?;
    engine.import(&rows(), ImportMode::Replace)?;

    let extra = vec![
        ImportRow::new("how to reset  PASSWORD?", "Use the reset link.").with_keywords("password help"),
        ImportRow::new("Where is my order?", "Check the tracking page."),
    ];
    let outcome = engine.import(&extra, ImportMode::Append)?;
    assert_eq!(outcome.stats.added, 1);
    assert_eq!(outcome.stats.updated, 1);

    let items = load_kb(&paths)?;
    assert_eq!(items.len(), 4);
    let reset = items
        .iter()
        .find(|it| it.keywords.contains(&"password help".to_string()))
        .expect("merged item");
    assert_eq!(reset.answer, "Use the reset link.");
    assert_eq!(reset.keywords[0], "reset password");

    let bad = vec![
        ImportRow::new("A?", "a").with_id("dup"),
        ImportRow::new("B?", "b").with_id("dup"),
    ];
    let before = fs::read_to_string(&paths.kb_file)?;
    let outcome = engine.import(&bad, ImportMode::Append)?;
    assert!(!outcome.persisted);
    assert_eq!(outcome.errors[0].to_string(), "Row 2: duplicate id dup");
    assert_eq!(fs::read_to_string(&paths.kb_file)?, before);
    Ok(())
}

#[test]
fn config_file_overrides_thresholds() -> Result<()> {
    let tmp = TempDir::new()?;
    let paths = KbPaths::from_root(tmp.path().to_path_buf());
    fs::write(
        &paths.config_file,
        "direct_threshold: 0.99\nsuggest_threshold: 0.9\nsemantic:\n  enabled: false\n",
    )?;

    let engine = FaqEngine::open(KbPaths::from_root(tmp.path().to_path_buf()))?;
    assert!(!engine.semantic_backend().is_enabled());
    engine.import(&rows(), ImportMode::Replace)?;

    let reply = engine.ask("reset password");
    assert_ne!(reply.kind, ReplyKind::Direct);
    Ok(())
}

#[test]
fn append_after_loading_legacy_duplicates_keeps_items() -> Result<()> {
    let tmp = TempDir::new()?;
    let paths = KbPaths::from_root(tmp.path().to_path_buf());
    fs::create_dir_all(&paths.data)?;
    fs::write(
        &paths.kb_file,
        r#"[
            {"question": "How to reset password?", "answer": "Use the link."},
            {"question": "how to reset  password?", "answer": "Use the link."},
            {"question": "Refund?", "answer": "30 days."}
        ]"#,
    )?;

    let engine = FaqEngine::with_backend(
        KbPaths::from_root(tmp.path().to_path_buf()),
        Config::default(),
        SemanticBackend::Disabled,
    )?;
    let before = engine.snapshot().items.len();
    assert_eq!(before, 2);

    let outcome = engine.import(&[ImportRow::new("Where is my order?", "Tracking page.")], ImportMode::Append)?;
    assert_eq!(outcome.stats.added, 1);
    assert_eq!(outcome.stats.removed, 0);
    assert_eq!(outcome.item_count, before + 1);
    assert_eq!(load_kb(&paths)?.len(), before + 1);
    Ok(())
}
