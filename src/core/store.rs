//! Knowledge-base snapshot persistence
//!
//! The snapshot is a pretty-printed JSON array at `data/data.json`. Every
//! save first moves the previous file into `data/backups/` under a
//! timestamped name; backups are never pruned here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::item::{derive_id, merge_items, KnowledgeItem};
use super::paths::KbPaths;

/// On-disk record. Older files may lack `id` and `updated_at`.
#[derive(Debug, Deserialize)]
struct StoredItem {
    #[serde(default)]
    id: Option<serde_json::Value>,
    question: String,
    answer: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl StoredItem {
    fn into_item(self, now: DateTime<Utc>) -> KnowledgeItem {
        let id = match self.id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => derive_id(&self.question, |_| false),
        };

        let updated_at = match self.updated_at.as_deref() {
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                warn!(id = %id, raw, "Unparseable updated_at, using load time");
                now
            }),
            None => now,
        };

        KnowledgeItem {
            id,
            question: self.question,
            answer: self.answer,
            keywords: self.keywords,
            tags: self.tags,
            updated_at,
        }
    }
}

/// Accept RFC 3339 as well as naive ISO timestamps with or without a
/// trailing `Z`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|n| n.and_utc())
}

/// Load the active knowledge base. A missing file is an empty KB.
pub fn load_kb(paths: &KbPaths) -> Result<Vec<KnowledgeItem>> {
    if !paths.kb_file.exists() {
        debug!(path = %paths.kb_file.display(), "No knowledge base file yet");
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(&paths.kb_file)
        .with_context(|| format!("Failed to read {}", paths.kb_file.display()))?;
    parse_kb(&raw).with_context(|| format!("Malformed knowledge base {}", paths.kb_file.display()))
}

/// Parse a snapshot. Records resolving to an ID already seen are folded
/// into the first one so IDs stay unique.
pub fn parse_kb(raw: &str) -> Result<Vec<KnowledgeItem>> {
    let stored: Vec<StoredItem> = serde_json::from_str(raw)?;
    let now = Utc::now();

    let mut items: Vec<KnowledgeItem> = Vec::with_capacity(stored.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for item in stored.into_iter().map(|s| s.into_item(now)) {
        match positions.get(&item.id) {
            Some(&pos) => {
                warn!(id = %item.id, question = %item.question, "Duplicate id in knowledge base, merging");
                let updated_at = items[pos].updated_at.max(item.updated_at);
                let merged = merge_items(&items[pos], &item, updated_at);
                items[pos] = merged;
            }
            None => {
                positions.insert(item.id.clone(), items.len());
                items.push(item);
            }
        }
    }
    Ok(items)
}

/// Persist `items`, moving the previous snapshot into the backups folder.
///
/// Returns the backup path when a previous snapshot existed.
pub fn save_kb(paths: &KbPaths, items: &[KnowledgeItem]) -> Result<Option<PathBuf>> {
    fs::create_dir_all(&paths.data)
        .with_context(|| format!("Failed to create {}", paths.data.display()))?;

    let json = serde_json::to_string_pretty(items)?;
    let staging = paths.kb_file.with_extension("json.tmp");
    fs::write(&staging, json)
        .with_context(|| format!("Failed to write {}", staging.display()))?;

    let backup = if paths.kb_file.exists() {
        fs::create_dir_all(&paths.backups)
            .with_context(|| format!("Failed to create {}", paths.backups.display()))?;
        let target = backup_path(&paths.backups, Utc::now());
        fs::rename(&paths.kb_file, &target)
            .with_context(|| format!("Failed to back up to {}", target.display()))?;
        Some(target)
    } else {
        None
    };

    fs::rename(&staging, &paths.kb_file)
        .with_context(|| format!("Failed to install {}", paths.kb_file.display()))?;

    info!(
        items = items.len(),
        backup = ?backup.as_ref().map(|p| p.display().to_string()),
        "Saved knowledge base"
    );
    Ok(backup)
}

fn backup_path(dir: &Path, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.format("%Y%m%d-%H%M%S").to_string();
    let mut candidate = dir.join(format!("data-{}.json", stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("data-{}-{}.json", stamp, n));
        n += 1;
    }
    candidate
}

/// Existing backups, oldest first.
pub fn list_backups(paths: &KbPaths) -> Result<Vec<PathBuf>> {
    let pattern = paths.backups.join("data-*.json");
    let mut backups: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.ok())
        .collect();
    backups.sort();
    Ok(backups)
}
