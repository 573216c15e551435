//! Local sentence encoders
//!
//! [`Encoder`] is the seam for whatever embedding backend is installed.
//! The bundled [`HarmonicEncoder`] implements Harmonic Token Projection
//! (https://arxiv.org/html/2511.20665): every token is read as a base-2^16
//! integer, reduced modulo a set of coprime moduli, and each residue is
//! projected onto the unit circle. Token vectors are mean-pooled and
//! L2-normalized. No weights, no network, fully deterministic.

use std::f64::consts::PI;
use std::path::Path;

use anyhow::{bail, Result};

use super::tokenizer::tokenize;

/// Two components (sin, cos) per modulus.
pub const EMBEDDING_DIM: usize = 384;

const NUM_MODULI: usize = EMBEDDING_DIM / 2;

/// Longer tokens are truncated before projection.
const MAX_TOKEN_CHARS: usize = 64;

pub trait Encoder: Send + Sync {
    /// Identifier stored with cached vectors; changes invalidate the cache.
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Unit-length embedding of `text` (all zeros for token-free text).
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

pub struct HarmonicEncoder {
    moduli: Vec<u64>,
    model_id: String,
}

impl HarmonicEncoder {
    /// Bind the encoder to an installed model directory.
    ///
    /// The directory only names the model; a missing directory means the
    /// model is not installed.
    pub fn load(model_dir: &Path) -> Result<Self> {
        if !model_dir.is_dir() {
            bail!("Model directory not found: {}", model_dir.display());
        }
        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "default".to_string());
        Ok(Self::with_id(format!("htp-{}/{}", EMBEDDING_DIM, name)))
    }

    pub fn with_id(model_id: String) -> Self {
        Self {
            moduli: first_primes(NUM_MODULI),
            model_id,
        }
    }

    fn project_token(&self, token: &str, acc: &mut [f64]) {
        let n = token
            .chars()
            .take(MAX_TOKEN_CHARS)
            .fold(0u64, |n, c| n.wrapping_mul(1 << 16).wrapping_add(c as u64));

        for (i, &m) in self.moduli.iter().enumerate() {
            let theta = 2.0 * PI * (n % m) as f64 / m as f64;
            acc[2 * i] += theta.sin();
            acc[2 * i + 1] += theta.cos();
        }
    }
}

impl Encoder for HarmonicEncoder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let tokens = tokenize(text);
        let mut acc = vec![0.0f64; EMBEDDING_DIM];
        if tokens.is_empty() {
            return Ok(vec![0.0; EMBEDDING_DIM]);
        }

        for token in &tokens {
            self.project_token(token, &mut acc);
        }

        // Mean pooling does not change the direction, so normalize directly
        Ok(normalize(&acc))
    }
}

fn normalize(values: &[f64]) -> Vec<f32> {
    let norm = values.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| (x / norm) as f32).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// First `count` primes; pairwise coprime by construction.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Dot product; equals cosine similarity for unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn encoder() -> HarmonicEncoder {
        HarmonicEncoder::with_id("htp-test".to_string())
    }

    #[test]
    fn test_primes() {
        let primes = first_primes(NUM_MODULI);
        assert_eq!(&primes[..6], &[2, 3, 5, 7, 11, 13]);
        assert_eq!(primes.len(), NUM_MODULI);
        assert_eq!(*primes.last().unwrap(), 1163);
    }

    #[test]
    fn test_deterministic_and_normalized() -> Result<()> {
        let a = encoder().encode("How to reset password?")?;
        let b = encoder().encode("how to RESET password")?;
        assert_eq!(a, b);
        assert_eq!(a.len(), EMBEDDING_DIM);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn test_shared_tokens_are_closer() -> Result<()> {
        let enc = encoder();
        let base = enc.encode("reset my password")?;
        let near = enc.encode("password reset help")?;
        let far = enc.encode("cooking recipes")?;
        assert!(dot(&base, &near) > dot(&base, &far));
        Ok(())
    }

    #[test]
    fn test_empty_text() -> Result<()> {
        let v = encoder().encode("?!")?;
        assert!(v.iter().all(|x| *x == 0.0));
        Ok(())
    }

    #[test]
    fn test_load_requires_directory() -> Result<()> {
        let tmp = TempDir::new()?;
        assert!(HarmonicEncoder::load(&tmp.path().join("missing")).is_err());

        let dir = tmp.path().join("mini");
        std::fs::create_dir(&dir)?;
        let enc = HarmonicEncoder::load(&dir)?;
        assert_eq!(enc.model_id(), "htp-384/mini");
        Ok(())
    }
}
