use std::path::PathBuf;

use anyhow::{Context, Result};

pub const CONFIG_FILE_NAME: &str = "faq.yaml";

pub struct KbPaths {
    pub root: PathBuf,
    pub data: PathBuf,
    pub kb_file: PathBuf,
    pub backups: PathBuf,
    pub unmatched_log: PathBuf,
    pub matched_log: PathBuf,
    pub embedding_cache: PathBuf,
    pub models: PathBuf,
    pub config_file: PathBuf,
}

impl KbPaths {
    pub fn current() -> Result<Self> {
        let root = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::from_root(root))
    }

    pub fn from_root(root: PathBuf) -> Self {
        let data = root.join("data");
        Self {
            kb_file: data.join("data.json"),
            backups: data.join("backups"),
            unmatched_log: data.join("unmatched.csv"),
            matched_log: data.join("matched.log"),
            embedding_cache: data.join("embeddings.db"),
            models: root.join("models"),
            config_file: root.join(CONFIG_FILE_NAME),
            data,
            root,
        }
    }

    pub fn required_folders(&self) -> Vec<(&PathBuf, &str)> {
        vec![
            (&self.data, "Knowledge base and query logs"),
            (&self.backups, "Snapshots replaced by imports"),
            (&self.models, "Local embedding models"),
        ]
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for (dir, _) in self.required_folders() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
