//! Optional semantic scoring
//!
//! [`SemanticBackend`] is chosen once at startup: `Enabled` when a local
//! model could be loaded, `Disabled` otherwise. Each knowledge-base
//! snapshot gets a [`SemanticIndex`] built from it. Failures anywhere in
//! this module degrade to `Disabled` and are only logged.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::cache::{corpus_hash, EmbeddingCache};
use super::embedding::{dot, Encoder, HarmonicEncoder};
use super::scored::{rank, ScoredCandidate};
use crate::core::config::Config;
use crate::core::paths::KbPaths;

#[derive(Clone)]
pub enum SemanticBackend {
    Enabled {
        encoder: Arc<dyn Encoder>,
        cache_path: Option<PathBuf>,
    },
    Disabled,
}

impl SemanticBackend {
    pub fn from_config(config: &Config, paths: &KbPaths) -> Self {
        if !config.semantic.enabled {
            debug!("Semantic scoring disabled by config");
            return Self::Disabled;
        }

        let model_dir = config.model_dir(paths);
        match HarmonicEncoder::load(&model_dir) {
            Ok(encoder) => {
                info!(model = encoder.model_id(), "Semantic scoring enabled");
                Self::Enabled {
                    encoder: Arc::new(encoder),
                    cache_path: Some(paths.embedding_cache.clone()),
                }
            }
            Err(e) => {
                info!(error = %e, "Semantic scoring unavailable");
                Self::Disabled
            }
        }
    }

    pub fn with_encoder(encoder: Arc<dyn Encoder>, cache_path: Option<PathBuf>) -> Self {
        Self::Enabled {
            encoder,
            cache_path,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    pub fn model_id(&self) -> Option<&str> {
        match self {
            Self::Enabled { encoder, .. } => Some(encoder.model_id()),
            Self::Disabled => None,
        }
    }

    /// Embed every question, reusing the on-disk cache when it matches.
    pub fn build_index(&self, questions: &[String]) -> SemanticIndex {
        let Self::Enabled {
            encoder,
            cache_path,
        } = self
        else {
            return SemanticIndex::Disabled;
        };

        match load_vectors(encoder.as_ref(), cache_path.as_ref(), questions) {
            Ok(vectors) => SemanticIndex::Enabled {
                encoder: Arc::clone(encoder),
                vectors,
            },
            Err(e) => {
                warn!(error = %e, "Failed to embed questions, semantic scoring off for this snapshot");
                SemanticIndex::Disabled
            }
        }
    }
}

fn open_cache(path: Option<&PathBuf>) -> Option<EmbeddingCache> {
    let path = path?;
    match EmbeddingCache::open(path) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Embedding cache unavailable");
            None
        }
    }
}

fn load_vectors(
    encoder: &dyn Encoder,
    cache_path: Option<&PathBuf>,
    questions: &[String],
) -> Result<Vec<Vec<f32>>> {
    let hash = corpus_hash(questions);
    let model_id = encoder.model_id();
    let cache = open_cache(cache_path);

    if let Some(cache) = &cache {
        match cache.get(&hash, model_id) {
            Ok(Some(vectors)) if vectors.len() == questions.len() => {
                debug!(model = model_id, rows = vectors.len(), "Embedding cache hit");
                return Ok(vectors);
            }
            Ok(_) => debug!(model = model_id, "Embedding cache miss"),
            Err(e) => warn!(error = %e, "Embedding cache read failed, recomputing"),
        }
    }

    let vectors = encoder.encode_batch(questions)?;

    if let Some(cache) = &cache {
        if let Err(e) = cache.put(&hash, model_id, &vectors) {
            warn!(error = %e, "Embedding cache write failed");
        }
    }
    Ok(vectors)
}

/// Per-snapshot semantic vectors.
pub enum SemanticIndex {
    Enabled {
        encoder: Arc<dyn Encoder>,
        vectors: Vec<Vec<f32>>,
    },
    Disabled,
}

impl SemanticIndex {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    /// Cosine similarity against every question, best first. Empty when
    /// disabled or when the query cannot be encoded.
    pub fn score_all(&self, query: &str) -> Vec<ScoredCandidate> {
        let Self::Enabled { encoder, vectors } = self else {
            return Vec::new();
        };

        let q = match encoder.encode(query) {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "Failed to encode query");
                return Vec::new();
            }
        };

        let candidates = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| ScoredCandidate::new(i, dot(v, &q)))
            .collect();
        rank(candidates)
    }

    /// Blend lexical scores with semantic similarity. Disabled indexes
    /// return the lexical ranking untouched.
    pub fn blend(
        &self,
        lexical: Vec<ScoredCandidate>,
        query: &str,
        lexical_weight: f32,
        semantic_weight: f32,
    ) -> Vec<ScoredCandidate> {
        if !self.is_enabled() {
            return lexical;
        }

        let mut semantic = vec![0.0f32; lexical.len()];
        for c in self.score_all(query) {
            if let Some(slot) = semantic.get_mut(c.index) {
                *slot = c.score;
            }
        }

        let blended = lexical
            .into_iter()
            .map(|c| {
                let s = semantic.get(c.index).copied().unwrap_or(0.0);
                ScoredCandidate::new(c.index, lexical_weight * c.score + semantic_weight * s)
            })
            .collect();
        rank(blended)
    }
}
