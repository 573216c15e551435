//! Token-sort similarity ratio
//!
//! Both strings are reduced to their sorted, space-joined lowercase tokens
//! and compared with the normalized indel similarity
//! `2 * LCS(a, b) / (|a| + |b|)`, so word order never matters.

use super::tokenizer::tokenize;

/// Sorted, space-joined tokens of `text`.
pub fn token_sort_key(text: &str) -> String {
    let mut tokens = tokenize(text);
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Similarity in `[0, 1]` of two texts regardless of word order.
pub fn token_sort_ratio(a: &str, b: &str) -> f32 {
    ratio(&token_sort_key(a), &token_sort_key(b))
}

/// Normalized indel similarity of two strings. An empty side scores 0.
pub fn ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (2 * lcs_len(&a, &b)) as f32 / total as f32
}

/// Longest common subsequence length, single rolling row.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut diagonal = 0;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}
