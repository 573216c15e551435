//! Matching policy configuration
//!
//! Loaded from `faq.yaml` at the data root when present. Every field has a
//! default, so an empty or missing file yields the stock policy.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::paths::KbPaths;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Top score at or above which the best answer is returned directly.
    pub direct_threshold: f32,
    /// Top score at or above which the best answer is the fallback when
    /// no suggestions qualify.
    pub suggest_threshold: f32,
    /// Minimum score for a candidate to be offered as a suggestion.
    pub min_suggestion_score: f32,
    /// Number of ranked candidates considered for suggestions and logs.
    pub top_k: usize,
    pub lexical_weight: f32,
    pub semantic_weight: f32,
    pub semantic: SemanticConfig,
    pub messages: ReplyMessages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemanticConfig {
    pub enabled: bool,
    /// Model directory, relative to the data root unless absolute.
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplyMessages {
    pub choose: String,
    pub no_match: String,
    pub empty_kb: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            direct_threshold: 0.78,
            suggest_threshold: 0.6,
            min_suggestion_score: 0.4,
            top_k: 5,
            lexical_weight: 0.6,
            semantic_weight: 0.4,
            semantic: SemanticConfig::default(),
            messages: ReplyMessages::default(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2-optimized"),
        }
    }
}

impl Default for ReplyMessages {
    fn default() -> Self {
        Self {
            choose: "I found similar questions. Please choose one.".to_string(),
            no_match: "Sorry, I couldn't find a good match. Please rephrase your question."
                .to_string(),
            empty_kb: "Knowledge base is empty. Please try later.".to_string(),
        }
    }
}

impl Config {
    /// Load `faq.yaml` from the data root, falling back to defaults.
    pub fn load(paths: &KbPaths) -> Result<Self> {
        if !paths.config_file.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&paths.config_file)
            .with_context(|| format!("Failed to read {}", paths.config_file.display()))?;
        let config = Self::from_yaml(&raw)
            .with_context(|| format!("Invalid config in {}", paths.config_file.display()))?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.suggest_threshold > self.direct_threshold {
            bail!(
                "suggest_threshold ({}) must not exceed direct_threshold ({})",
                self.suggest_threshold,
                self.direct_threshold
            );
        }
        if self.min_suggestion_score < 0.0 {
            bail!("min_suggestion_score must be non-negative");
        }
        if self.top_k == 0 {
            bail!("top_k must be at least 1");
        }
        if self.lexical_weight < 0.0 || self.semantic_weight < 0.0 {
            bail!("blend weights must be non-negative");
        }
        Ok(())
    }

    pub fn model_dir(&self, paths: &KbPaths) -> PathBuf {
        if self.semantic.model_dir.is_absolute() {
            self.semantic.model_dir.clone()
        } else {
            paths.root.join(&self.semantic.model_dir)
        }
    }
}
