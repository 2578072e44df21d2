use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{extension_for, ImageError, ImageStore, ImageUpload};
use crate::constants::{API_NAME, UPLOADS_ROUTE};

/// Writes images under a directory that the router serves at `/uploads`.
pub struct FilesystemImageStore {
    base_path: PathBuf,
}

impl FilesystemImageStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    async fn write(&self, upload: &ImageUpload) -> Result<String, ImageError> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(&upload.mime()));
        let path = self.base_path.join(&file_name);

        let mut file = fs::File::create(&path).await?;
        file.write_all(&upload.bytes).await?;
        file.sync_all().await?;

        Ok(format!("{}/{}", UPLOADS_ROUTE, file_name))
    }

    /// Maps a reference back to its file, refusing anything that is not a
    /// bare file name under this store.
    fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(UPLOADS_ROUTE)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return None;
        }
        Some(self.base_path.join(name))
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn store(&self, uploads: Vec<ImageUpload>) -> Result<Vec<String>, ImageError> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }
        fs::create_dir_all(&self.base_path).await?;

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            match self.write(upload).await {
                Ok(reference) => stored.push(reference),
                Err(e) => {
                    tracing::error!(
                        "{} Failed to write image '{}': {}",
                        API_NAME,
                        upload.file_name,
                        e
                    );
                    self.discard(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    async fn discard(&self, references: &[String]) {
        for reference in references {
            let Some(path) = self.path_for(reference) else {
                continue;
            };
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!("{} Could not remove image {}: {}", API_NAME, path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn uploads(count: usize) -> Vec<ImageUpload> {
        (0..count)
            .map(|i| ImageUpload::new(format!("{}.jpg", i), "image/jpeg", vec![i as u8 + 1; 4]))
            .collect()
    }

    #[tokio::test]
    async fn stores_files_and_returns_references_in_order() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemImageStore::new(dir.path());

        let refs = store.store(uploads(3)).await.unwrap();

        assert_eq!(refs.len(), 3);
        for (i, reference) in refs.iter().enumerate() {
            assert!(reference.starts_with("/uploads/"));
            assert!(reference.ends_with(".jpg"));
            let bytes = std::fs::read(store.path_for(reference).unwrap()).unwrap();
            assert_eq!(bytes, vec![i as u8 + 1; 4]);
        }
    }

    #[tokio::test]
    async fn discard_removes_stored_files() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemImageStore::new(dir.path());
        let refs = store.store(uploads(2)).await.unwrap();

        store.discard(&refs).await;

        for reference in &refs {
            assert!(!store.path_for(reference).unwrap().exists());
        }
    }

    #[test]
    fn foreign_references_are_not_mapped_to_paths() {
        let store = FilesystemImageStore::new("/srv/uploads");
        assert!(store.path_for("/uploads/../etc/passwd").is_none());
        assert!(store.path_for("data:image/png;base64,AAAA").is_none());
        assert!(store.path_for("https://cdn.example.com/a.jpg").is_none());
        assert_eq!(
            store.path_for("/uploads/abc.png"),
            Some(PathBuf::from("/srv/uploads/abc.png"))
        );
    }

    #[tokio::test]
    async fn creates_the_directory_on_first_use() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("cars").join("photos");
        let store = FilesystemImageStore::new(&nested);

        store.store(uploads(1)).await.unwrap();

        assert!(nested.is_dir());
    }
}
