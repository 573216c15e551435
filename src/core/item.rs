use std::collections::HashSet;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

pub const MAX_KEYWORDS: usize = 20;
pub const MAX_TAGS: usize = 10;
pub const MIN_KEYWORD_CHARS: usize = 3;

/// Namespace mixed into generated IDs so they never collide with other
/// hash-derived identifiers built from the same text.
const ID_NAMESPACE: &str = "faq-match/kb-item";
const ID_PREFIX: &str = "kb-";
const ID_HEX_LEN: usize = 12;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref MULTI_SPLIT_RE: Regex = Regex::new(r"[;,]").unwrap();
}

/// One question/answer record of the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// A raw bulk-import row before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub keywords: Option<MultiValue>,
    #[serde(default)]
    pub tags: Option<MultiValue>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Keyword and tag cells arrive either as a `;`/`,` separated string
/// (spreadsheet exports) or as an already split list (JSON/YAML files).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MultiValue {
    Text(String),
    List(Vec<String>),
}

impl MultiValue {
    fn parts(&self) -> Vec<String> {
        match self {
            Self::Text(s) => MULTI_SPLIT_RE.split(s).map(str::to_string).collect(),
            Self::List(items) => items
                .iter()
                .flat_map(|s| MULTI_SPLIT_RE.split(s).map(str::to_string).collect::<Vec<_>>())
                .collect(),
        }
    }
}

impl From<&str> for MultiValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl ImportRow {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            question: Some(question.to_string()),
            answer: Some(answer.to_string()),
            ..Default::default()
        }
    }

    pub fn with_keywords(mut self, keywords: &str) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = Some(tags.into());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn question(&self) -> &str {
        self.question.as_deref().unwrap_or("").trim()
    }

    pub fn answer(&self) -> &str {
        self.answer.as_deref().unwrap_or("").trim()
    }

    /// Explicit ID supplied by the uploader, if any.
    pub fn explicit_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn keywords(&self) -> Vec<String> {
        let raw = self.keywords.as_ref().map(MultiValue::parts).unwrap_or_default();
        clean_list(raw, MIN_KEYWORD_CHARS, MAX_KEYWORDS)
    }

    pub fn tags(&self) -> Vec<String> {
        let raw = self.tags.as_ref().map(MultiValue::parts).unwrap_or_default();
        clean_list(raw, 1, MAX_TAGS)
    }
}

/// Trim, drop entries shorter than `min_chars`, dedup keeping first-seen
/// order, then cap.
fn clean_list(raw: Vec<String>, min_chars: usize, cap: usize) -> Vec<String> {
    let cleaned = raw
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().count() >= min_chars);
    dedup_ordered(cleaned, cap)
}

fn dedup_ordered(values: impl IntoIterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .take(cap)
        .collect()
}

/// Ordered union of two lists: everything from `first`, then the unseen
/// entries of `second`, capped at `cap`.
pub fn union_ordered(first: &[String], second: &[String], cap: usize) -> Vec<String> {
    dedup_ordered(first.iter().chain(second.iter()).cloned(), cap)
}

/// NFKC, trim, collapse internal whitespace, lowercase.
pub fn normalize_question(text: &str) -> String {
    let nfkc: String = text.nfkc().collect();
    WHITESPACE_RE
        .replace_all(nfkc.trim(), " ")
        .to_lowercase()
}

/// Deterministic identifier for a normalized question.
pub fn generate_id(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ID_NAMESPACE.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}{}", ID_PREFIX, &digest[..ID_HEX_LEN])
}

/// Resolve the ID for a question without an explicit one.
///
/// Knowledge bases written before hash IDs existed used the normalized
/// question itself as the ID; when `existing` still contains such an ID it
/// is reused so the item keeps its identity.
pub fn derive_id<F>(question: &str, existing: F) -> String
where
    F: Fn(&str) -> bool,
{
    let normalized = normalize_question(question);
    if existing(&normalized) {
        normalized
    } else {
        generate_id(&normalized)
    }
}

/// Merge an incoming version of an item into the previous one.
///
/// Non-empty incoming question/answer win; keywords and tags are unioned
/// with the previous entries first.
pub fn merge_items(
    previous: &KnowledgeItem,
    incoming: &KnowledgeItem,
    now: DateTime<Utc>,
) -> KnowledgeItem {
    let pick = |new: &str, old: &str| {
        if new.trim().is_empty() {
            old.to_string()
        } else {
            new.to_string()
        }
    };

    KnowledgeItem {
        id: previous.id.clone(),
        question: pick(&incoming.question, &previous.question),
        answer: pick(&incoming.answer, &previous.answer),
        keywords: union_ordered(&previous.keywords, &incoming.keywords, MAX_KEYWORDS),
        tags: union_ordered(&previous.tags, &incoming.tags, MAX_TAGS),
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, answer: &str, keywords: &[&str]) -> KnowledgeItem {
        KnowledgeItem {
            id: id.to_string(),
            question: "How to reset password?".to_string(),
            answer: answer.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            tags: vec![],
            updated_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    #[test]
    fn test_normalize_question() {
        assert_eq!(
            normalize_question("  How   to\tReset\nPassword? "),
            "how to reset password?"
        );
        // Fullwidth letters fold to ASCII under NFKC
        assert_eq!(normalize_question("ＦＡＱ"), "faq");
    }

    #[test]
    fn test_generate_id_is_stable() {
        let a = generate_id(&normalize_question("How to reset password?"));
        let b = generate_id(&normalize_question("how  to RESET password?"));
        let c = generate_id(&normalize_question("What is refund policy?"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("kb-"));
        assert_eq!(a.len(), 3 + 12);
    }

    #[test]
    fn test_derive_id_reuses_legacy() {
        let legacy = derive_id("How to Reset Password?", |id| id == "how to reset password?");
        assert_eq!(legacy, "how to reset password?");

        let fresh = derive_id("How to Reset Password?", |_| false);
        assert_eq!(fresh, generate_id("how to reset password?"));
    }

    #[test]
    fn test_keyword_cleaning() {
        let row = ImportRow::new("q", "a").with_keywords("reset; pw, reset ,password;;");
        assert_eq!(row.keywords(), vec!["reset", "password"]);

        let many: Vec<String> = (0..30).map(|i| format!("kw{:02}", i)).collect();
        let row = ImportRow::new("q", "a").with_keywords(&many.join(","));
        assert_eq!(row.keywords().len(), MAX_KEYWORDS);
    }

    #[test]
    fn test_tags_keep_short_entries() {
        let row = ImportRow::new("q", "a").with_tags("ui, ux ,ui");
        assert_eq!(row.tags(), vec!["ui", "ux"]);
    }

    #[test]
    fn test_list_values_are_split_too() {
        let row = ImportRow {
            keywords: Some(MultiValue::List(vec!["refund;return".into(), "money back".into()])),
            ..ImportRow::new("q", "a")
        };
        assert_eq!(row.keywords(), vec!["refund", "return", "money back"]);
    }

    #[test]
    fn test_merge_items() {
        let prev = item("x", "old", &["reset", "login"]);
        let new = item("x", "", &["login", "password"]);
        let merged = merge_items(&prev, &new, Utc::now());
        assert_eq!(merged.answer, "old");
        assert_eq!(merged.keywords, vec!["reset", "login", "password"]);

        let newer = item("x", "fresh", &[]);
        assert_eq!(merge_items(&prev, &newer, Utc::now()).answer, "fresh");
    }
}
