//! Blob storage for intermediate assets.
//!
//! Remote generators take assets by reference, so clips and masks are
//! uploaded first and results are downloaded by the reference returned.

use std::path::{Component, Path, PathBuf};

use cutline_common::error::{CutlineError, CutlineResult};

const FILE_SCHEME: &str = "file://";

/// Object storage addressed by string keys.
pub trait BlobStore: Send + Sync {
    /// Store `local` under `key` and return a reference other services can read.
    fn upload(&self, local: &Path, key: &str) -> CutlineResult<String>;

    /// Fetch the object behind `reference` (a URL or key) into `dest`.
    fn download(&self, reference: &str, dest: &Path) -> CutlineResult<PathBuf>;

    /// Whether an object is stored under `key`.
    fn exists(&self, key: &str) -> CutlineResult<bool>;

    /// Store name.
    fn name(&self) -> &str;
}

/// Blob store rooted at a local directory, handing out `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> CutlineResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `key` inside the store. Keys are relative paths that
    /// may not climb out of the root.
    fn key_path(&self, key: &str) -> CutlineResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(CutlineError::invalid_input(format!(
                "blob key '{key}' must be a relative path without '..'"
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Resolve a `file://` URL or bare key to a path inside the store.
    fn resolve(&self, reference: &str) -> CutlineResult<PathBuf> {
        match reference.strip_prefix(FILE_SCHEME) {
            Some(path) => {
                let path = PathBuf::from(path);
                let climbs = path.components().any(|c| c == Component::ParentDir);
                if climbs || !path.starts_with(&self.root) {
                    return Err(CutlineError::invalid_input(format!(
                        "{reference} is outside the store at {}",
                        self.root.display()
                    )));
                }
                Ok(path)
            }
            None if reference.contains("://") => Err(CutlineError::unsupported(format!(
                "local store cannot fetch {reference}"
            ))),
            None => self.key_path(reference),
        }
    }
}

impl BlobStore for LocalBlobStore {
    fn upload(&self, local: &Path, key: &str) -> CutlineResult<String> {
        if !local.is_file() {
            return Err(CutlineError::FileNotFound {
                path: local.to_path_buf(),
            });
        }
        let target = self.key_path(key)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = std::fs::copy(local, &target)?;
        tracing::debug!(key, bytes, "Stored blob");
        Ok(format!("{FILE_SCHEME}{}", target.display()))
    }

    fn download(&self, reference: &str, dest: &Path) -> CutlineResult<PathBuf> {
        let source = self.resolve(reference)?;
        if !source.is_file() {
            return Err(CutlineError::FileNotFound { path: source });
        }
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::copy(&source, dest)?;
        tracing::debug!(reference, dest = %dest.display(), "Fetched blob");
        Ok(dest.to_path_buf())
    }

    fn exists(&self, key: &str) -> CutlineResult<bool> {
        Ok(self.key_path(key)?.is_file())
    }

    fn name(&self) -> &str {
        "local"
    }
}
