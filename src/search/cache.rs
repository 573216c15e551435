//! Embedding cache using SQLite
//!
//! One row per model: the question-set hash, the matrix shape and the
//! matrix itself as a little-endian f32 BLOB. A lookup only hits when both
//! the corpus hash and the model identifier match.

use std::path::Path;

use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

pub struct EmbeddingCache {
    conn: Connection,
}

impl EmbeddingCache {
    /// Open or create the cache at path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let cache = Self { conn };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Open in-memory cache (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS question_embeddings (
                model_id TEXT PRIMARY KEY,
                corpus_hash TEXT NOT NULL,
                rows INTEGER NOT NULL,
                dim INTEGER NOT NULL,
                matrix BLOB NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Cached matrix for `(corpus_hash, model_id)`, if present and intact.
    pub fn get(&self, corpus_hash: &str, model_id: &str) -> Result<Option<Vec<Vec<f32>>>> {
        let row: Option<(i64, i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT rows, dim, matrix FROM question_embeddings WHERE model_id = ?1 AND corpus_hash = ?2",
                params![model_id, corpus_hash],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((rows, dim, blob)) = row else {
            return Ok(None);
        };
        let (Ok(rows), Ok(dim)) = (usize::try_from(rows), usize::try_from(dim)) else {
            bail!("Corrupt embedding cache entry: shape {}x{}", rows, dim);
        };
        let expected = rows.checked_mul(dim).and_then(|n| n.checked_mul(4));
        if expected != Some(blob.len()) {
            bail!(
                "Corrupt embedding cache entry: {} bytes for {}x{}",
                blob.len(),
                rows,
                dim
            );
        }

        let flat = blob_to_floats(&blob);
        if dim == 0 {
            return Ok(Some(vec![Vec::new(); rows]));
        }
        Ok(Some(flat.chunks_exact(dim).map(<[f32]>::to_vec).collect()))
    }

    /// Store `matrix`, replacing whatever was cached for the model.
    pub fn put(&self, corpus_hash: &str, model_id: &str, matrix: &[Vec<f32>]) -> Result<()> {
        let dim = matrix.first().map(Vec::len).unwrap_or(0);
        if matrix.iter().any(|row| row.len() != dim) {
            bail!("Embedding rows have inconsistent dimensions");
        }

        let flat: Vec<f32> = matrix.iter().flatten().copied().collect();
        self.conn.execute(
            r#"
            INSERT INTO question_embeddings (model_id, corpus_hash, rows, dim, matrix, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(model_id) DO UPDATE SET
                corpus_hash = excluded.corpus_hash,
                rows = excluded.rows,
                dim = excluded.dim,
                matrix = excluded.matrix,
                created_at = excluded.created_at
            "#,
            params![
                model_id,
                corpus_hash,
                matrix.len() as i64,
                dim as i64,
                floats_to_blob(&flat),
                chrono::Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    /// Number of cached models.
    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM question_embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Hash of the exact question sequence: count, order and text.
pub fn corpus_hash(questions: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((questions.len() as u64).to_le_bytes());
    for q in questions {
        hasher.update((q.len() as u64).to_le_bytes());
        hasher.update(q.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn floats_to_blob(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_floats(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_corpus_hash_sensitivity() {
        let base = corpus_hash(&strings(&["a", "b"]));
        assert_eq!(base, corpus_hash(&strings(&["a", "b"])));
        assert_ne!(base, corpus_hash(&strings(&["b", "a"])));
        assert_ne!(base, corpus_hash(&strings(&["ab"])));
        assert_ne!(base, corpus_hash(&strings(&["a", "b", ""])));
    }

    #[test]
    fn test_hit_requires_hash_and_model() -> Result<()> {
        let cache = EmbeddingCache::open_in_memory()?;
        let matrix = vec![vec![1.0, 0.0], vec![0.0, -0.5]];
        cache.put("h1", "model-a", &matrix)?;

        assert_eq!(cache.get("h1", "model-a")?, Some(matrix));
        assert_eq!(cache.get("h2", "model-a")?, None);
        assert_eq!(cache.get("h1", "model-b")?, None);
        Ok(())
    }

    #[test]
    fn test_put_overwrites_stale_entry() -> Result<()> {
        let cache = EmbeddingCache::open_in_memory()?;
        cache.put("old", "model-a", &[vec![1.0]])?;
        cache.put("new", "model-a", &[vec![2.0], vec![3.0]])?;

        assert_eq!(cache.entry_count()?, 1);
        assert_eq!(cache.get("old", "model-a")?, None);
        assert_eq!(cache.get("new", "model-a")?, Some(vec![vec![2.0], vec![3.0]]));
        Ok(())
    }

    #[test]
    fn test_corrupt_shape_is_an_error() -> Result<()> {
        let cache = EmbeddingCache::open_in_memory()?;
        cache.put("h", "m", &[vec![1.0, 2.0]])?;

        cache.conn.execute("UPDATE question_embeddings SET rows = -1", [])?;
        assert!(cache.get("h", "m").is_err());

        cache.conn.execute("UPDATE question_embeddings SET rows = ?1, dim = ?1", [i64::MAX])?;
        assert!(cache.get("h", "m").is_err());
        Ok(())
    }

    #[test]
    fn test_rejects_ragged_matrix() -> Result<()> {
        let cache = EmbeddingCache::open_in_memory()?;
        assert!(cache.put("h", "m", &[vec![1.0, 2.0], vec![3.0]]).is_err());
        Ok(())
    }
}
