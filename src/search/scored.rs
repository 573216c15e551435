use std::cmp::Ordering;

use serde::Serialize;

/// Relevance of one knowledge item for one query. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub index: usize,
    pub score: f32,
}

impl ScoredCandidate {
    pub fn new(index: usize, score: f32) -> Self {
        Self { index, score }
    }
}

/// Sort by descending score; ties keep ascending item index.
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_tie_break() {
        let ranked = rank(vec![
            ScoredCandidate::new(2, 0.5),
            ScoredCandidate::new(0, 0.1),
            ScoredCandidate::new(1, 0.5),
        ]);
        let order: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
