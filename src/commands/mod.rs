pub mod ask;
pub mod import;
pub mod init;
pub mod samples;
pub mod status;
pub mod unmatched;

use std::path::PathBuf;

use anyhow::Result;
use faq_match::core::paths::KbPaths;

/// Resolve the data root: `--root` when given, else the working directory.
pub fn kb_paths(root: Option<PathBuf>) -> Result<KbPaths> {
    match root {
        Some(root) => Ok(KbPaths::from_root(root)),
        None => KbPaths::current(),
    }
}
