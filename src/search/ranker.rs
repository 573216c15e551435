//! Reply policy
//!
//! Turns a ranked candidate list into the reply shown to the user:
//!
//! | top score                       | reply                                         |
//! |---------------------------------|-----------------------------------------------|
//! | `>= direct_threshold`           | best answer, other relevant questions         |
//! | `>= suggest_threshold`          | suggestions if any qualify, else best answer  |
//! | below                           | suggestions if any qualify, else "no match"   |
//!
//! Only the final "no match" branch is recorded as unmatched.

use serde::Serialize;

use super::scored::ScoredCandidate;
use crate::core::config::Config;
use crate::core::item::KnowledgeItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Direct,
    Disambiguate,
    NoMatch,
    EmptyKnowledgeBase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub reply: String,
    pub suggestions: Vec<String>,
    pub kind: ReplyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_score: Option<f32>,
}

/// Reply plus what the caller should write to the query logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub reply: Reply,
    /// Top candidates as `(question, score)`, always logged as matched.
    pub top: Vec<(String, f32)>,
    /// Set only when the query must be logged as unmatched.
    pub unmatched: Option<Vec<String>>,
}

impl Decision {
    pub fn empty_knowledge_base(config: &Config) -> Self {
        Self {
            reply: Reply {
                reply: config.messages.empty_kb.clone(),
                suggestions: Vec::new(),
                kind: ReplyKind::EmptyKnowledgeBase,
                top_score: None,
            },
            top: Vec::new(),
            unmatched: None,
        }
    }
}

pub fn decide(items: &[KnowledgeItem], ranked: &[ScoredCandidate], config: &Config) -> Decision {
    let Some(best) = ranked.first() else {
        return Decision::empty_knowledge_base(config);
    };
    let best_item = &items[best.index];

    let top: Vec<(String, f32)> = ranked
        .iter()
        .take(config.top_k)
        .map(|c| (items[c.index].question.clone(), c.score))
        .collect();

    let relevant: Vec<String> = top
        .iter()
        .filter(|(_, score)| *score >= config.min_suggestion_score)
        .map(|(q, _)| q.clone())
        .collect();

    let build = |text: &str, suggestions: Vec<String>, kind| Reply {
        reply: text.to_string(),
        suggestions,
        kind,
        top_score: Some(best.score),
    };

    let mut unmatched = None;
    let reply = if best.score >= config.direct_threshold {
        let others = relevant
            .into_iter()
            .filter(|q| *q != best_item.question)
            .collect();
        build(&best_item.answer, others, ReplyKind::Direct)
    } else if !relevant.is_empty() {
        build(&config.messages.choose, relevant, ReplyKind::Disambiguate)
    } else if best.score >= config.suggest_threshold {
        build(&best_item.answer, Vec::new(), ReplyKind::Direct)
    } else {
        unmatched = Some(top.iter().map(|(q, _)| q.clone()).collect());
        build(&config.messages.no_match, Vec::new(), ReplyKind::NoMatch)
    };

    Decision {
        reply,
        top,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn items(questions: &[&str]) -> Vec<KnowledgeItem> {
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| KnowledgeItem {
                id: format!("kb-{}", i),
                question: q.to_string(),
                answer: format!("answer {}", i),
                keywords: vec![],
                tags: vec![],
                updated_at: Utc::now(),
            })
            .collect()
    }

    fn ranked(scores: &[(usize, f32)]) -> Vec<ScoredCandidate> {
        scores.iter().map(|&(i, s)| ScoredCandidate::new(i, s)).collect()
    }

    #[test]
    fn test_direct_answer_excludes_own_question() {
        let kb = items(&["A?", "B?", "C?"]);
        let d = decide(&kb, &ranked(&[(1, 0.9), (0, 0.5), (2, 0.1)]), &Config::default());
        assert_eq!(d.reply.kind, ReplyKind::Direct);
        assert_eq!(d.reply.reply, "answer 1");
        assert_eq!(d.reply.suggestions, vec!["A?"]);
        assert!(d.unmatched.is_none());
        assert_eq!(d.top.len(), 3);
    }

    #[test]
    fn test_middle_band_prefers_suggestions() {
        let kb = items(&["A?", "B?"]);
        let d = decide(&kb, &ranked(&[(0, 0.65), (1, 0.45)]), &Config::default());
        assert_eq!(d.reply.kind, ReplyKind::Disambiguate);
        // The top item itself is included in this band
        assert_eq!(d.reply.suggestions, vec!["A?", "B?"]);
    }

    #[test]
    fn test_middle_band_falls_back_to_answer() {
        // A suggestion floor above the top score leaves nothing to suggest
        let config = Config {
            min_suggestion_score: 0.7,
            ..Config::default()
        };
        let kb = items(&["A?", "B?"]);
        let d = decide(&kb, &ranked(&[(0, 0.65), (1, 0.3)]), &config);
        assert_eq!(d.reply.kind, ReplyKind::Direct);
        assert_eq!(d.reply.reply, "answer 0");
        assert!(d.reply.suggestions.is_empty());
        assert!(d.unmatched.is_none());
    }

    #[test]
    fn test_low_band_with_suggestions_is_not_unmatched() {
        let kb = items(&["A?", "B?"]);
        let d = decide(&kb, &ranked(&[(0, 0.5), (1, 0.2)]), &Config::default());
        assert_eq!(d.reply.kind, ReplyKind::Disambiguate);
        assert_eq!(d.reply.suggestions, vec!["A?"]);
        assert!(d.unmatched.is_none());
    }

    #[test]
    fn test_no_match_is_recorded() {
        let kb = items(&["A?", "B?"]);
        let config = Config::default();
        let d = decide(&kb, &ranked(&[(1, 0.35), (0, 0.1)]), &config);
        assert_eq!(d.reply.kind, ReplyKind::NoMatch);
        assert_eq!(d.reply.reply, config.messages.no_match);
        assert!(d.reply.suggestions.is_empty());
        assert_eq!(d.unmatched, Some(vec!["B?".to_string(), "A?".to_string()]));
    }

    #[test]
    fn test_top_k_limits_suggestions() {
        let kb = items(&["A?", "B?", "C?", "D?", "E?", "F?", "G?"]);
        let scores: Vec<(usize, f32)> = (0..7).map(|i| (i, 0.95 - i as f32 * 0.05)).collect();
        let d = decide(&kb, &ranked(&scores), &Config::default());
        assert_eq!(d.top.len(), 5);
        assert_eq!(d.reply.suggestions, vec!["B?", "C?", "D?", "E?"]);
    }

    #[test]
    fn test_empty_ranking() {
        let d = decide(&[], &[], &Config::default());
        assert_eq!(d.reply.kind, ReplyKind::EmptyKnowledgeBase);
        assert!(d.top.is_empty());
        assert!(d.unmatched.is_none());
    }
}
