//! Bulk-import reconciliation
//!
//! Turns raw import rows into knowledge items, resolves their identities
//! and merges them into the current knowledge base under `replace` or
//! `append` semantics. Nothing here touches the disk; callers persist the
//! result only when [`Reconciliation::is_accepted`] holds.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::item::{derive_id, merge_items, ImportRow, KnowledgeItem};
use super::validation::RowError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    #[default]
    Replace,
    Append,
}

impl ImportMode {
    /// Anything other than `append` means `replace`.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("append") {
            Self::Append
        } else {
            Self::Replace
        }
    }
}

impl std::fmt::Display for ImportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Append => write!(f, "append"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub added: usize,
    pub updated: usize,
    /// Net shrinkage of the knowledge base in replace mode, not the size
    /// of the actually removed set.
    pub removed: usize,
    pub deduplicated: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub items: Vec<KnowledgeItem>,
    pub stats: ImportStats,
    pub errors: Vec<RowError>,
}

impl Reconciliation {
    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Ordered ID → item map.
#[derive(Default)]
struct ItemSet {
    items: Vec<KnowledgeItem>,
    index: HashMap<String, usize>,
}

impl ItemSet {
    fn from_items(items: &[KnowledgeItem]) -> Self {
        let mut set = Self::default();
        for item in items {
            set.upsert(item.clone());
        }
        set
    }

    fn get(&self, id: &str) -> Option<&KnowledgeItem> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    fn upsert(&mut self, item: KnowledgeItem) {
        match self.index.get(&item.id) {
            Some(&i) => self.items[i] = item,
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    fn into_items(self) -> Vec<KnowledgeItem> {
        self.items
    }
}

pub fn reconcile(rows: &[ImportRow], mode: ImportMode, current: &[KnowledgeItem]) -> Reconciliation {
    reconcile_at(rows, mode, current, Utc::now())
}

/// [`reconcile`] with an explicit clock.
pub fn reconcile_at(
    rows: &[ImportRow],
    mode: ImportMode,
    current: &[KnowledgeItem],
    now: DateTime<Utc>,
) -> Reconciliation {
    let current_ids: HashSet<&str> = current.iter().map(|it| it.id.as_str()).collect();
    let (batch, deduplicated, errors) = collect_batch(rows, &current_ids, now);

    let (items, mut stats) = match mode {
        ImportMode::Replace => {
            let items = batch.into_items();
            let existing = items
                .iter()
                .filter(|it| current_ids.contains(it.id.as_str()))
                .count();
            let stats = ImportStats {
                added: items.len() - existing,
                updated: existing,
                removed: current.len().saturating_sub(items.len()),
                deduplicated: 0,
            };
            (items, stats)
        }
        ImportMode::Append => {
            let mut merged = ItemSet::from_items(current);
            let mut stats = ImportStats::default();
            for incoming in batch.into_items() {
                let next = match merged.get(&incoming.id) {
                    Some(previous) => {
                        stats.updated += 1;
                        merge_items(previous, &incoming, now)
                    }
                    None => {
                        stats.added += 1;
                        incoming
                    }
                };
                merged.upsert(next);
            }
            (merged.into_items(), stats)
        }
    };
    stats.deduplicated = deduplicated;

    Reconciliation {
        items,
        stats,
        errors,
    }
}

/// Validate rows and fold them into a batch keyed by resolved ID.
fn collect_batch(
    rows: &[ImportRow],
    current_ids: &HashSet<&str>,
    now: DateTime<Utc>,
) -> (ItemSet, usize, Vec<RowError>) {
    let mut batch = ItemSet::default();
    let mut deduplicated = 0;
    let mut errors = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let row_no = i + 1;
        let (question, answer) = (row.question(), row.answer());
        if question.is_empty() || answer.is_empty() {
            errors.push(RowError::MissingField { row: row_no });
            continue;
        }

        let explicit = row.explicit_id();
        let id = match explicit {
            Some(id) => id.to_string(),
            None => derive_id(question, |candidate| current_ids.contains(candidate)),
        };

        let incoming = KnowledgeItem {
            id: id.clone(),
            question: question.to_string(),
            answer: answer.to_string(),
            keywords: row.keywords(),
            tags: row.tags(),
            updated_at: now,
        };

        let next = match batch.get(&id) {
            Some(_) if explicit.is_some() => {
                errors.push(RowError::DuplicateId { row: row_no, id });
                continue;
            }
            Some(previous) => {
                deduplicated += 1;
                merge_items(previous, &incoming, now)
            }
            None => incoming,
        };
        batch.upsert(next);
    }

    (batch, deduplicated, errors)
}
