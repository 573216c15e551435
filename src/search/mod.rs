//! FAQ matching engine
//!
//! Lexical scoring (exact, fuzzy, BM25, keyword hint), optional semantic
//! re-ranking, and the reply policy on top.

pub mod cache;
pub mod embedding;
pub mod engine;
pub mod fuzzy;
pub mod lexical;
pub mod ranker;
pub mod scored;
pub mod semantic;
pub mod tokenizer;

pub use embedding::{Encoder, HarmonicEncoder};
pub use engine::{FaqEngine, ImportOutcome, Snapshot};
pub use lexical::{LexicalScorer, Signals};
pub use ranker::{Reply, ReplyKind};
pub use scored::ScoredCandidate;
pub use semantic::SemanticBackend;
