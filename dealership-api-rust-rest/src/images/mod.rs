//! Turning uploaded car photos into stored image references.
//!
//! A batch is checked against the [`ImagePolicy`] as a whole before anything
//! is written, then handed to the configured [`ImageStore`], which returns
//! one reference per upload in submission order.

pub mod filesystem;
pub mod inline;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::{Config, ImageStorage};

pub use filesystem::FilesystemImageStore;
pub use inline::InlineImageStore;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image '{file}' is {size} bytes; the limit is {max} bytes")]
    TooLarge { file: String, size: usize, max: usize },

    #[error("Image '{file}' has unsupported content type '{content_type}'")]
    UnsupportedType { file: String, content_type: String },

    #[error("Image '{file}' is empty")]
    Empty { file: String },

    #[error("{count} images were uploaded; at most {max} are accepted per request")]
    TooMany { count: usize, max: usize },

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    /// Whether the client sent something unacceptable, as opposed to the
    /// store failing.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ImageError::Io(_))
    }
}

/// One uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Content type without parameters, lowercased.
    pub fn mime(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    pub max_bytes: usize,
    pub max_files: usize,
}

impl ImagePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_bytes: config.max_image_bytes,
            max_files: config.max_images_per_request,
        }
    }

    /// Rejects the whole batch on the first offending upload.
    pub fn check(&self, uploads: &[ImageUpload]) -> Result<(), ImageError> {
        if uploads.len() > self.max_files {
            return Err(ImageError::TooMany {
                count: uploads.len(),
                max: self.max_files,
            });
        }

        for upload in uploads {
            if upload.bytes.is_empty() {
                return Err(ImageError::Empty {
                    file: upload.file_name.clone(),
                });
            }
            if upload.bytes.len() > self.max_bytes {
                return Err(ImageError::TooLarge {
                    file: upload.file_name.clone(),
                    size: upload.bytes.len(),
                    max: self.max_bytes,
                });
            }
            let mime = upload.mime();
            if !ALLOWED_CONTENT_TYPES.contains(&mime.as_str()) {
                return Err(ImageError::UnsupportedType {
                    file: upload.file_name.clone(),
                    content_type: upload.content_type.clone(),
                });
            }
        }
        Ok(())
    }

    /// Largest request body a car form can legitimately need.
    pub fn body_limit(&self, fields_allowance: usize) -> usize {
        self.max_bytes
            .saturating_mul(self.max_files)
            .saturating_add(fields_allowance)
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persists every upload and returns their references in the same order.
    /// Either all uploads are stored or none are.
    async fn store(&self, uploads: Vec<ImageUpload>) -> Result<Vec<String>, ImageError>;

    /// Best-effort removal of references previously returned by `store`.
    async fn discard(&self, references: &[String]);
}

pub fn build_image_store(config: &Config) -> Arc<dyn ImageStore> {
    match config.image_storage {
        ImageStorage::Inline => Arc::new(InlineImageStore),
        ImageStorage::Filesystem => Arc::new(FilesystemImageStore::new(&config.upload_dir)),
    }
}

/// File extension for an accepted content type.
pub(crate) fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
