//! faq-match library
//!
//! Small-FAQ question matching with hot-swappable knowledge bases.
//!
//! # Modules
//!
//! - `core`: Knowledge items, import reconciliation, persistence, query logs
//! - `search`: Lexical + semantic scoring and the reply policy

pub mod core;
pub mod search;

// Re-exports for convenience
pub use core::config::Config;
pub use core::item::{ImportRow, KnowledgeItem};
pub use core::paths::KbPaths;
pub use core::reconcile::{reconcile, ImportMode, ImportStats};
pub use core::validation::RowError;
pub use search::{FaqEngine, ImportOutcome, Reply, ReplyKind};
