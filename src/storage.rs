//! On-disk store for uploaded images.
//!
//! Files live flat in one directory and are served read-only under
//! [`UPLOAD_URL_PREFIX`]. Names are generated server-side and every
//! destination is resolved through the upload [`PathBoundary`], so nothing
//! can land outside it.

use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use strict_path::{PathBoundary, StrictPath, StrictPathError};
use tokio::io::AsyncWriteExt;

pub const UPLOAD_URL_PREFIX: &str = "/uploads";

const MAX_NAME_ATTEMPTS: usize = 5;
const MAX_EXTENSION_LEN: usize = 10;

/// Marker for paths inside the profile photo directory.
#[derive(Debug, Clone)]
pub struct ProfilePhotos;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload path rejected: {0}")]
    Path(#[from] StrictPathError),
    #[error("could not write upload {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("no free file name after {0} attempts")]
    Exhausted(usize),
}

/// A file that has been written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    /// Relative path persisted in users.profile_picture, e.g. `uploads/x.jpg`.
    pub public_path: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBoundary<ProfilePhotos>,
}

impl UploadStore {
    /// Opens the store, creating the directory on first run.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = PathBoundary::try_new_create(dir)?;
        Ok(Self { root })
    }

    pub fn dir(&self) -> &Path {
        Path::new(self.root.interop_path())
    }

    /// Writes `bytes` under a fresh generated name. Never overwrites.
    pub async fn save(
        &self,
        field: &str,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, StorageError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = generate_file_name(field, original_name);
            let dest: StrictPath<ProfilePhotos> = self.root.strict_join(&file_name)?;

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dest.interop_path())
                .await
            {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(StorageError::Write {
                        path: dest.unstrict(),
                        source,
                    });
                }
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(source) = written {
                let _ = dest.remove_file();
                return Err(StorageError::Write {
                    path: dest.unstrict(),
                    source,
                });
            }

            return Ok(StoredFile {
                public_path: public_path(&file_name),
                file_name,
            });
        }
        Err(StorageError::Exhausted(MAX_NAME_ATTEMPTS))
    }

    /// Best-effort removal, used when the owning row turned out not to exist.
    pub async fn remove(&self, stored: &StoredFile) {
        let removed = self
            .root
            .strict_join(&stored.file_name)
            .map_err(|e| e.to_string())
            .and_then(|path| path.remove_file().map_err(|e| e.to_string()));
        if let Err(error) = removed {
            tracing::warn!(file = %stored.file_name, %error, "could not remove orphaned upload");
        }
    }
}

pub fn public_path(file_name: &str) -> String {
    format!("{}/{file_name}", UPLOAD_URL_PREFIX.trim_start_matches('/'))
}

/// `<field>-<unix millis>-<0..1e9>[.<ext>]`
pub fn generate_file_name(field: &str, original_name: Option<&str>) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    match original_name.and_then(safe_extension) {
        Some(ext) => format!("{field}-{millis}-{suffix}.{ext}"),
        None => format!("{field}-{millis}-{suffix}"),
    }
}

/// Extension of the client's file name, kept only if it is short and alphanumeric.
fn safe_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(name: &str) -> Vec<&str> {
        name.split('.').next().unwrap().split('-').collect()
    }

    #[test]
    fn test_generated_name_shape() {
        let name = generate_file_name("profilePhoto", Some("me at the beach.JPG"));
        assert!(name.starts_with("profilePhoto-"));
        assert!(name.ends_with(".jpg"));

        let p = parts(&name);
        assert_eq!(p.len(), 3);
        assert!(p[1].parse::<i64>().unwrap() > 0);
        assert!(p[2].parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(safe_extension("photo.png").as_deref(), Some("png"));
        assert_eq!(safe_extension("pics/photo.JPEG").as_deref(), Some("jpeg"));
        assert_eq!(safe_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(safe_extension("noext"), None);
        assert_eq!(safe_extension(".bashrc"), None);
        assert_eq!(safe_extension("evil.ph p"), None);
        assert_eq!(safe_extension("long.abcdefghijkl"), None);
    }

    #[test]
    fn test_public_path() {
        assert_eq!(public_path("a.png"), "uploads/a.png");
    }

    #[test]
    fn test_open_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("uploads");
        let store = UploadStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert!(store.dir().is_dir());
        assert_eq!(store.dir(), dir.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_save_writes_bytes_under_fresh_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::open(tmp.path()).unwrap();
        let bytes = b"\x89PNG\r\n\x1a\nnot really a png";

        let a = store.save("profilePhoto", Some("a.png"), bytes).await.unwrap();
        let b = store.save("profilePhoto", Some("a.png"), bytes).await.unwrap();
        assert_ne!(a.file_name, b.file_name);
        assert_eq!(a.public_path, format!("uploads/{}", a.file_name));

        let on_disk = std::fs::read(tmp.path().join(&a.file_name)).unwrap();
        assert_eq!(on_disk, bytes);
    }

    #[tokio::test]
    async fn test_save_stays_inside_boundary() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("uploads");
        let store = UploadStore::open(&root).unwrap();

        let err = store.save("../escaped", Some("x.png"), b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::Path(_)), "{err}");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let tmp = tempfile::tempdir().unwrap();
        let store = UploadStore::open(tmp.path()).unwrap();
        let f = store.save("profilePhoto", None, b"x").await.unwrap();
        store.remove(&f).await;
        assert!(!tmp.path().join(&f.file_name).exists());
    }
}
