//! Content-addressed externalisation of oversized context payloads.
//!
//! Over-cap note bodies and compacted history observations are written
//! under `<vault_root>/.arcanum/externalized/<sha256>.md` and represented
//! in-context by a path reference. Content addressing makes repeated
//! externalisation of identical content idempotent, and the compaction it
//! backs is lossless: the original text never leaves disk.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

const EXTERNALIZED_DIR: &str = ".arcanum/externalized";

/// Returns the path the content would be (or already is) stored at, without
/// touching the filesystem.
pub fn content_path(vault_root: &Path, content: &str) -> PathBuf {
    let digest = Sha256::digest(content.as_bytes());
    let hex = hex::encode(digest);
    vault_root.join(EXTERNALIZED_DIR).join(format!("{hex}.md"))
}

/// Write `content` to its content-addressed path if not already present,
/// and return that path.
pub fn externalize(vault_root: &Path, content: &str) -> std::io::Result<PathBuf> {
    let path = content_path(vault_root, content);
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
    }
    Ok(path)
}

/// Read back previously externalised content.
pub fn read_externalized(path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn externalizing_same_content_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path1 = externalize(dir.path(), "hello world").unwrap();
        let path2 = externalize(dir.path(), "hello world").unwrap();
        assert_eq!(path1, path2);
        assert_eq!(read_externalized(&path1).unwrap(), "hello world");
    }

    #[test]
    fn different_content_yields_different_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path1 = externalize(dir.path(), "a").unwrap();
        let path2 = externalize(dir.path(), "b").unwrap();
        assert_ne!(path1, path2);
    }
}
