//! FAQ engine - owns the active knowledge-base snapshot
//!
//! Queries grab the current `Arc<Snapshot>` and use it for their whole
//! duration. Imports are serialized by a writer lock, build the next
//! snapshot off to the side and install it with a single pointer swap, so
//! a query sees either the old or the new knowledge base, never a mix.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::lexical::{LexicalScorer, Signals};
use super::ranker::{decide, Decision, Reply};
use super::scored::ScoredCandidate;
use super::semantic::{SemanticBackend, SemanticIndex};
use crate::core::config::Config;
use crate::core::item::{ImportRow, KnowledgeItem};
use crate::core::paths::KbPaths;
use crate::core::querylog::QueryLog;
use crate::core::reconcile::{reconcile, ImportMode, ImportStats};
use crate::core::store::{load_kb, save_kb};
use crate::core::validation::RowError;

const SAMPLE_COUNT: usize = 8;

/// Immutable knowledge base plus the scorer structures derived from it.
pub struct Snapshot {
    pub generation: u64,
    pub items: Vec<KnowledgeItem>,
    lexical: LexicalScorer,
    semantic: SemanticIndex,
}

impl Snapshot {
    fn build(generation: u64, items: Vec<KnowledgeItem>, backend: &SemanticBackend) -> Self {
        let questions: Vec<String> = items.iter().map(|it| it.question.clone()).collect();
        let lexical = LexicalScorer::from_items(&items);
        let semantic = if items.is_empty() {
            SemanticIndex::Disabled
        } else {
            backend.build_index(&questions)
        };

        Self {
            generation,
            items,
            lexical,
            semantic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn semantic_enabled(&self) -> bool {
        self.semantic.is_enabled()
    }

    /// Lexical ranking, blended with semantic similarity when available.
    pub fn rank(&self, query: &str, config: &Config) -> Vec<ScoredCandidate> {
        let lexical = self.lexical.score_all(query);
        self.semantic
            .blend(lexical, query, config.lexical_weight, config.semantic_weight)
    }

    pub fn signals(&self, query: &str, index: usize) -> Option<Signals> {
        (index < self.items.len()).then(|| self.lexical.signals(query, index))
    }
}

/// Result of an import attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub mode: ImportMode,
    pub stats: ImportStats,
    #[serde(serialize_with = "errors_as_strings")]
    pub errors: Vec<RowError>,
    /// False when row errors rejected the batch or on a dry run.
    pub persisted: bool,
    pub backup: Option<PathBuf>,
    pub item_count: usize,
}

fn errors_as_strings<S: serde::Serializer>(errors: &[RowError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(errors.iter().map(|e| e.to_string()))
}

pub struct FaqEngine {
    paths: KbPaths,
    config: Config,
    backend: SemanticBackend,
    log: QueryLog,
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl FaqEngine {
    /// Load configuration and the knowledge base from `paths`.
    pub fn open(paths: KbPaths) -> Result<Self> {
        let config = Config::load(&paths)?;
        let backend = SemanticBackend::from_config(&config, &paths);
        Self::with_backend(paths, config, backend)
    }

    pub fn with_backend(paths: KbPaths, config: Config, backend: SemanticBackend) -> Result<Self> {
        let items = load_kb(&paths)?;
        let log = QueryLog::new(&paths);
        let snapshot = Snapshot::build(1, items, &backend);

        Ok(Self {
            paths,
            config,
            backend,
            log,
            current: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
            generation: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &KbPaths {
        &self.paths
    }

    pub fn query_log(&self) -> &QueryLog {
        &self.log
    }

    pub fn semantic_backend(&self) -> &SemanticBackend {
        &self.backend
    }

    /// The snapshot active right now.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Answer a user query and record the outcome in the query logs.
    pub fn ask(&self, query: &str) -> Reply {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Decision::empty_knowledge_base(&self.config).reply;
        }

        let ranked = snapshot.rank(query, &self.config);
        let decision = decide(&snapshot.items, &ranked, &self.config);
        debug!(
            generation = snapshot.generation,
            kind = ?decision.reply.kind,
            top_score = ?decision.reply.top_score,
            "Query decided"
        );

        if let Some(top) = &decision.unmatched {
            if let Err(e) = self.log.log_unmatched(query, top) {
                warn!(error = %e, "Failed to write unmatched log");
            }
        }
        if let Err(e) = self.log.log_matched(query, &decision.top) {
            warn!(error = %e, "Failed to write matched log");
        }

        decision.reply
    }

    /// Ranked candidates against the current snapshot, without logging.
    pub fn rank(&self, query: &str) -> Vec<ScoredCandidate> {
        self.snapshot().rank(query, &self.config)
    }

    /// First few questions, offered as example queries.
    pub fn samples(&self) -> Vec<String> {
        self.snapshot()
            .items
            .iter()
            .take(SAMPLE_COUNT)
            .map(|it| it.question.clone())
            .collect()
    }

    /// Reconcile, persist and hot-swap. Row errors reject the whole batch
    /// and leave both disk and memory untouched.
    pub fn import(&self, rows: &[ImportRow], mode: ImportMode) -> Result<ImportOutcome> {
        self.import_inner(rows, mode, false)
    }

    /// Reconcile only; reports what an import would do.
    pub fn preview_import(&self, rows: &[ImportRow], mode: ImportMode) -> Result<ImportOutcome> {
        self.import_inner(rows, mode, true)
    }

    fn import_inner(&self, rows: &[ImportRow], mode: ImportMode, dry_run: bool) -> Result<ImportOutcome> {
        let _writer = self.writer.lock();
        let current = self.snapshot();
        let result = reconcile(rows, mode, &current.items);

        let mut outcome = ImportOutcome {
            mode,
            stats: result.stats,
            errors: result.errors.clone(),
            persisted: false,
            backup: None,
            item_count: result.items.len(),
        };

        if !result.is_accepted() {
            warn!(
                %mode,
                errors = result.errors.len(),
                "Import rejected"
            );
            return Ok(outcome);
        }
        if dry_run {
            return Ok(outcome);
        }

        outcome.backup = save_kb(&self.paths, &result.items)?;
        outcome.persisted = true;
        self.reload_locked()?;

        info!(
            %mode,
            added = outcome.stats.added,
            updated = outcome.stats.updated,
            removed = outcome.stats.removed,
            deduplicated = outcome.stats.deduplicated,
            "Import applied"
        );
        Ok(outcome)
    }

    /// Re-read the knowledge base from disk and swap it in.
    pub fn reload(&self) -> Result<u64> {
        let _writer = self.writer.lock();
        self.reload_locked()
    }

    fn reload_locked(&self) -> Result<u64> {
        let items = load_kb(&self.paths)?;
        Ok(self.install(items))
    }

    fn install(&self, items: Vec<KnowledgeItem>) -> u64 {
        let start = Instant::now();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(Snapshot::build(generation, items, &self.backend));

        info!(
            generation,
            items = snapshot.items.len(),
            semantic = snapshot.semantic_enabled(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Knowledge base snapshot installed"
        );
        *self.current.write() = snapshot;
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ranker::ReplyKind;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn engine(tmp: &TempDir) -> Result<FaqEngine> {
        let paths = KbPaths::from_root(tmp.path().to_path_buf());
        FaqEngine::with_backend(paths, Config::default(), SemanticBackend::Disabled)
    }

    fn faq_rows() -> Vec<ImportRow> {
        vec![
            ImportRow::new("How to reset password?", "Use the reset link on the login page.")
                .with_keywords("reset password; change password"),
            ImportRow::new("What is refund policy?", "Refunds within 30 days.")
                .with_keywords("refund, return"),
            ImportRow::new("Where is my order?", "Check the tracking page.")
                .with_keywords("order tracking"),
        ]
    }

    #[test]
    fn test_empty_kb_reply_without_logging() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = engine(&tmp)?;
        let reply = engine.ask("hello");
        assert_eq!(reply.kind, ReplyKind::EmptyKnowledgeBase);
        assert!(!engine.paths().matched_log.exists());
        assert!(!engine.paths().unmatched_log.exists());
        Ok(())
    }

    #[test]
    fn test_import_then_ask() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = engine(&tmp)?;

        let outcome = engine.import(&faq_rows(), ImportMode::Replace)?;
        assert!(outcome.persisted);
        assert_eq!(outcome.stats.added, 3);
        assert_eq!(engine.snapshot().generation, 2);

        let reply = engine.ask("what is refund policy?");
        assert_eq!(reply.kind, ReplyKind::Direct);
        assert_eq!(reply.reply, "Refunds within 30 days.");
        assert!(engine.paths().matched_log.exists());
        Ok(())
    }

    #[test]
    fn test_rejected_import_changes_nothing() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = engine(&tmp)?;
        engine.import(&faq_rows(), ImportMode::Replace)?;
        let before = engine.snapshot();

        let outcome = engine.import(&[ImportRow::new("", "x")], ImportMode::Replace)?;
        assert!(!outcome.persisted);
        assert_eq!(outcome.errors, vec![RowError::MissingField { row: 1 }]);
        assert!(Arc::ptr_eq(&before, &engine.snapshot()));
        assert_eq!(load_kb(engine.paths())?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_preview_does_not_persist() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = engine(&tmp)?;
        let outcome = engine.preview_import(&faq_rows(), ImportMode::Append)?;
        assert_eq!(outcome.stats.added, 3);
        assert!(!outcome.persisted);
        assert!(!engine.paths().kb_file.exists());
        assert!(engine.snapshot().is_empty());
        Ok(())
    }

    #[test]
    fn test_readers_keep_their_snapshot() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = engine(&tmp)?;
        engine.import(&faq_rows(), ImportMode::Replace)?;

        let held = engine.snapshot();
        engine.import(&[ImportRow::new("Only question?", "Only answer.")], ImportMode::Replace)?;

        assert_eq!(held.items.len(), 3);
        assert_eq!(engine.snapshot().items.len(), 1);
        Ok(())
    }

    #[test]
    fn test_unmatched_query_is_logged() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = engine(&tmp)?;
        engine.import(&faq_rows(), ImportMode::Replace)?;

        let reply = engine.ask("zzzz qqqq");
        assert_eq!(reply.kind, ReplyKind::NoMatch);
        assert!(reply.suggestions.is_empty());

        let entries = engine.query_log().read_unmatched()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].query, "zzzz qqqq");
        assert_eq!(entries[0].top_suggestions.len(), 3);
        Ok(())
    }

    #[test]
    fn test_concurrent_queries_during_import() -> Result<()> {
        let tmp = TempDir::new()?;
        let engine = Arc::new(engine(&tmp)?);
        engine.import(&faq_rows(), ImportMode::Replace)?;

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let snap = engine.snapshot();
                        let ranked = snap.rank("refund", engine.config());
                        assert_eq!(ranked.len(), snap.items.len());
                    }
                })
            })
            .collect();

        for i in 0..5 {
            let rows = vec![ImportRow::new(&format!("Question {}?", i), "Answer.")];
            engine.import(&rows, ImportMode::Append)?;
        }
        for r in readers {
            r.join().expect("reader thread panicked");
        }
        assert_eq!(engine.snapshot().items.len(), 8);
        Ok(())
    }
}
