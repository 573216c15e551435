//! Lexical relevance scorer
//!
//! Blends four signals per knowledge item:
//! - exact match of the trimmed, case-folded query and question
//! - token-sort fuzzy ratio
//! - BM25 over the tokenized questions
//! - keyword containment in either direction
//!
//! Built once per knowledge-base snapshot; there is no incremental update.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::fuzzy::{ratio, token_sort_key};
use super::scored::{rank, ScoredCandidate};
use super::tokenizer::tokenize;
use crate::core::item::KnowledgeItem;

pub const BM25_K1: f64 = 1.5;
pub const BM25_B: f64 = 0.75;
/// Empirical scale for BM25 in the blend. Not a cap.
pub const BM25_SCALE: f64 = 5.0;

const FUZZY_WEIGHT: f32 = 0.55;
const BM25_WEIGHT: f32 = 0.35;
const KEYWORD_WEIGHT: f32 = 0.10;
const KEYWORD_HIT: f32 = 0.5;

/// Individual signal values for one query/item pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signals {
    pub exact: f32,
    pub fuzzy: f32,
    pub bm25: f32,
    pub keyword: f32,
    pub blended: f32,
}

struct Document {
    exact_key: String,
    sort_key: String,
    term_freq: HashMap<String, usize>,
    len: usize,
    keywords: Vec<String>,
}

/// Query-side values shared across every document.
struct PreparedQuery {
    exact_key: String,
    sort_key: String,
    lowered: String,
    terms: Vec<String>,
}

pub struct LexicalScorer {
    docs: Vec<Document>,
    doc_freq: HashMap<String, usize>,
    avgdl: f64,
}

impl LexicalScorer {
    pub fn new(questions: &[String], keywords: &[Vec<String>]) -> Self {
        let docs: Vec<Document> = questions
            .iter()
            .enumerate()
            .map(|(i, question)| {
                let tokens = tokenize(question);
                let mut term_freq = HashMap::new();
                for token in &tokens {
                    *term_freq.entry(token.clone()).or_insert(0) += 1;
                }
                Document {
                    exact_key: exact_key(question),
                    sort_key: token_sort_key(question),
                    len: tokens.len(),
                    term_freq,
                    keywords: keywords
                        .get(i)
                        .map(|kws| {
                            kws.iter()
                                .map(|k| k.trim().to_lowercase())
                                .filter(|k| !k.is_empty())
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect();

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in &docs {
            for term in doc.term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let total: usize = docs.iter().map(|d| d.len).sum();
        let avgdl = total as f64 / docs.len().max(1) as f64;

        Self {
            docs,
            doc_freq,
            avgdl,
        }
    }

    pub fn from_items(items: &[KnowledgeItem]) -> Self {
        let questions: Vec<String> = items.iter().map(|it| it.question.clone()).collect();
        let keywords: Vec<Vec<String>> = items.iter().map(|it| it.keywords.clone()).collect();
        Self::new(&questions, &keywords)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Blended score for every item, best first.
    pub fn score_all(&self, query: &str) -> Vec<ScoredCandidate> {
        let prepared = prepare(query);
        let candidates = (0..self.docs.len())
            .map(|i| ScoredCandidate::new(i, self.signals_prepared(&prepared, i).blended))
            .collect();
        rank(candidates)
    }

    /// Signal breakdown for one item. Panics if `index` is out of range.
    pub fn signals(&self, query: &str, index: usize) -> Signals {
        self.signals_prepared(&prepare(query), index)
    }

    pub fn bm25(&self, query: &str, index: usize) -> f64 {
        self.bm25_prepared(&prepare(query).terms, index)
    }

    fn signals_prepared(&self, query: &PreparedQuery, index: usize) -> Signals {
        let doc = &self.docs[index];

        let exact = if query.exact_key == doc.exact_key { 1.0 } else { 0.0 };
        let fuzzy = ratio(&query.sort_key, &doc.sort_key);
        let bm25 = self.bm25_prepared(&query.terms, index) as f32;
        let keyword = if keyword_hit(&query.lowered, &doc.keywords) {
            KEYWORD_HIT
        } else {
            0.0
        };

        let weighted = FUZZY_WEIGHT * fuzzy
            + BM25_WEIGHT * (bm25 / BM25_SCALE as f32)
            + KEYWORD_WEIGHT * keyword;

        Signals {
            exact,
            fuzzy,
            bm25,
            keyword,
            blended: exact.max(weighted),
        }
    }

    fn bm25_prepared(&self, terms: &[String], index: usize) -> f64 {
        let doc = &self.docs[index];
        let n = self.docs.len() as f64;
        let dl = doc.len.max(1) as f64;

        terms
            .iter()
            .filter_map(|term| {
                let df = *self.doc_freq.get(term)? as f64;
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                let tf = doc.term_freq.get(term).copied().unwrap_or(0) as f64;
                let norm = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * dl / self.avgdl);
                Some(idf * tf * (BM25_K1 + 1.0) / norm)
            })
            .sum()
    }
}

fn exact_key(text: &str) -> String {
    text.trim().to_lowercase()
}

fn prepare(query: &str) -> PreparedQuery {
    let mut seen = HashSet::new();
    let terms = tokenize(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    PreparedQuery {
        exact_key: exact_key(query),
        sort_key: token_sort_key(query),
        lowered: query.trim().to_lowercase(),
        terms,
    }
}

/// Substring test in either direction. An empty query is contained in
/// every keyword, so it hits any item that has one.
fn keyword_hit(query: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| query.contains(k.as_str()) || k.contains(query))
}
