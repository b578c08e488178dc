//! File-backed note storage.
//!
//! All operations resolve paths under a fixed vault root and reject any
//! slug whose relative path would escape it. Writes are atomic: the full
//! file is built in memory, written to a temp file in the note's directory,
//! then renamed over the destination.

mod error;

use std::fs;
use std::path::{Component, Path, PathBuf};

use arc_core::{FrontMatter, Note};
use chrono::Utc;

pub use error::{VaultError, VaultResult};

const EXTENSION: &str = "md";

/// A directory of markdown notes, addressed by slug.
pub struct NoteStore {
    root: PathBuf,
}

impl NoteStore {
    /// Open (creating if absent) a vault rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> VaultResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List every slug currently in the vault, derived from `.md` file
    /// stems relative to the root. Order is lexicographic.
    pub fn list(&self) -> VaultResult<Vec<String>> {
        let mut slugs = Vec::new();
        self.walk(&self.root, &mut slugs)?;
        slugs.sort();
        Ok(slugs)
    }

    fn walk(&self, dir: &Path, out: &mut Vec<String>) -> VaultResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, out)?;
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    let slug = relative.with_extension("").to_string_lossy().replace('\\', "/");
                    out.push(slug);
                }
            }
        }
        Ok(())
    }

    /// Read and parse a note. Returns `NotFound` if no file backs `slug`.
    #[tracing::instrument(skip(self))]
    pub fn read(&self, slug: &str) -> VaultResult<Note> {
        let path = self.resolve(slug)?;
        let raw = fs::read_to_string(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                VaultError::NotFound(slug.to_string())
            } else {
                VaultError::Io(err)
            }
        })?;
        Ok(arc_parser::parse_note(slug, &raw))
    }

    /// Atomically write `slug`'s front-matter and body. `modified` is
    /// stamped with the current time; `created` is preserved from the
    /// existing note if present, otherwise set once.
    #[tracing::instrument(skip(self, front_matter, body))]
    pub fn write(&self, slug: &str, mut front_matter: FrontMatter, body: &str) -> VaultResult<()> {
        let path = self.resolve(slug)?;
        let now = Utc::now();

        let created = match self.read(slug) {
            Ok(existing) => existing.front_matter.created.or(Some(now)),
            Err(VaultError::NotFound(_)) => Some(now),
            Err(other) => return Err(other),
        };
        front_matter.created = created;
        front_matter.modified = Some(now);

        let yaml = serde_yaml::to_string(&front_matter)?;
        let contents = format!("---\n{yaml}---\n{body}");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let parent = path.parent().unwrap_or(&self.root);
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        use std::io::Write;
        temp.write_all(contents.as_bytes())?;
        temp.persist(&path).map_err(|err| VaultError::Io(err.error))?;
        tracing::debug!(%slug, "note written");
        Ok(())
    }

    /// Delete a note. Returns `NotFound` if no file backs `slug`.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, slug: &str) -> VaultResult<()> {
        let path = self.resolve(slug)?;
        fs::remove_file(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                VaultError::NotFound(slug.to_string())
            } else {
                VaultError::Io(err)
            }
        })
    }

    /// Resolve `slug` to an absolute path under the vault root, rejecting
    /// any slug whose relative path would escape it.
    fn resolve(&self, slug: &str) -> VaultResult<PathBuf> {
        let relative = Path::new(slug);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            return Err(VaultError::PathEscape(slug.to_string()));
        }
        let path = self.root.join(relative).with_extension(EXTENSION);

        if let Some(parent) = path.parent() {
            if let Ok(canonical_parent) = parent.canonicalize() {
                if !canonical_parent.starts_with(&self.root) {
                    return Err(VaultError::PathEscape(slug.to_string()));
                }
            }
        }
        Ok(path)
    }
}
