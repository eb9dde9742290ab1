//! Upload Storage
//!
//! Named byte payloads written under the uploads directory and served back at
//! `/uploads/<name>` by the static-file route.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Storage failures surfaced to the transfer path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The client-supplied name reduces to nothing usable.
    #[error("unusable filename {0:?}")]
    InvalidName(String),
    #[error("upload write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Public identity of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Final on-disk name (may carry a collision suffix).
    pub name: String,
    /// Retrieval path, `/uploads/<name>`.
    pub url: String,
}

/// Byte storage rooted at the uploads directory.
///
/// Concurrent writes are safe: each upload claims its path with
/// `create_new`, so two uploads of the same name land in distinct files.
#[derive(Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open the store, creating the uploads directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory served at `/uploads`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `bytes` under `name`.
    ///
    /// The name is reduced to its final path component. An existing file is
    /// never overwritten: a numeric suffix is inserted before the extension
    /// (`pic.png` → `pic-1.png`) until a free name is found.
    pub async fn put(&self, name: &str, bytes: &[u8]) -> Result<StoredBlob, StoreError> {
        let base = sanitize(name).ok_or_else(|| StoreError::InvalidName(name.to_string()))?;
        let (final_name, mut file) = self.claim(&base).await?;

        file.write_all(bytes).await?;
        file.flush().await?;

        debug!(name = %final_name, size = bytes.len(), "stored upload");
        Ok(StoredBlob {
            url: format!("/uploads/{final_name}"),
            name: final_name,
        })
    }

    /// Claim a free path for `base`, suffixing past collisions. `create_new`
    /// makes the claim atomic against concurrent uploads of the same name.
    async fn claim(&self, base: &str) -> Result<(String, tokio::fs::File), StoreError> {
        let (stem, ext) = split_name(base);
        let mut attempt: u32 = 0;
        loop {
            let candidate = match (attempt, ext) {
                (0, _) => base.to_string(),
                (n, Some(ext)) => format!("{stem}-{n}.{ext}"),
                (n, None) => format!("{stem}-{n}"),
            };
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&candidate))
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Reduce a client-supplied name to a bare final path component, refusing
/// names that would escape the uploads directory or vanish entirely.
fn sanitize(name: &str) -> Option<String> {
    let candidate = Path::new(name).file_name()?.to_str()?;
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        return None;
    }
    Some(candidate.to_string())
}

/// Split `base` into stem and extension for collision suffixing. A leading
/// dot counts as part of the stem, not an extension separator.
fn split_name(base: &str) -> (&str, Option<&str>) {
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (base, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, BlobStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlobStore::new(tmp.path().join("uploads")).unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn put_writes_bytes_and_returns_url() {
        let (_tmp, store) = store();
        let blob = store.put("pic.png", &[0x89, 0x50, 0x4e, 0x47]).await.unwrap();

        assert_eq!(blob.name, "pic.png");
        assert_eq!(blob.url, "/uploads/pic.png");
        let on_disk = std::fs::read(store.root().join("pic.png")).unwrap();
        assert_eq!(on_disk, vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[tokio::test]
    async fn collision_gets_numeric_suffix() {
        let (_tmp, store) = store();
        let first = store.put("pic.png", b"one").await.unwrap();
        let second = store.put("pic.png", b"two").await.unwrap();
        let third = store.put("pic.png", b"three").await.unwrap();

        assert_eq!(first.name, "pic.png");
        assert_eq!(second.name, "pic-1.png");
        assert_eq!(second.url, "/uploads/pic-1.png");
        assert_eq!(third.name, "pic-2.png");
        // The earlier upload is untouched.
        assert_eq!(std::fs::read(store.root().join("pic.png")).unwrap(), b"one");
    }

    #[tokio::test]
    async fn collision_without_extension() {
        let (_tmp, store) = store();
        store.put("notes", b"a").await.unwrap();
        let second = store.put("notes", b"b").await.unwrap();
        assert_eq!(second.name, "notes-1");
    }

    #[tokio::test]
    async fn traversal_components_are_stripped() {
        let (_tmp, store) = store();
        let blob = store.put("../../etc/evil.txt", b"x").await.unwrap();
        assert_eq!(blob.name, "evil.txt");
        assert!(store.root().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn unusable_names_are_rejected() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.put("", b"x").await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.put("..", b"x").await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.put("/", b"x").await,
            Err(StoreError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn write_failure_surfaces_as_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = BlobStore::new(tmp.path().join("uploads")).unwrap();
        std::fs::remove_dir_all(store.root()).unwrap();

        assert!(matches!(
            store.put("pic.png", b"x").await,
            Err(StoreError::Io(_))
        ));
    }

    #[test]
    fn split_name_cases() {
        assert_eq!(split_name("pic.png"), ("pic", Some("png")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name("noext"), ("noext", None));
        assert_eq!(split_name(".env"), (".env", None));
        assert_eq!(split_name("trailing."), ("trailing.", None));
    }
}
