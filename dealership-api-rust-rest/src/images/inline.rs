use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

use super::{ImageError, ImageStore, ImageUpload};

/// Embeds each image in the record as a `data:` URI. Nothing lives outside
/// the database, so there is nothing to clean up.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineImageStore;

#[async_trait]
impl ImageStore for InlineImageStore {
    async fn store(&self, uploads: Vec<ImageUpload>) -> Result<Vec<String>, ImageError> {
        Ok(uploads
            .iter()
            .map(|upload| format!("data:{};base64,{}", upload.mime(), STANDARD.encode(&upload.bytes)))
            .collect())
    }

    async fn discard(&self, _references: &[String]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_each_upload_in_order() {
        let refs = InlineImageStore
            .store(vec![
                ImageUpload::new("a.png", "image/png", b"abc".to_vec()),
                ImageUpload::new("b.gif", "image/gif", b"xyz".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(
            refs,
            vec![
                "data:image/png;base64,YWJj".to_string(),
                "data:image/gif;base64,eHl6".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn no_uploads_no_references() {
        assert!(InlineImageStore.store(Vec::new()).await.unwrap().is_empty());
    }
}
