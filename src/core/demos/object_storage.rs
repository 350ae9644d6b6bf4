use crate::domain::ports::{BlobStore, Demo};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Uploads a local file under a fresh random name.
pub struct ObjectStorageDemo<B: BlobStore> {
    store: B,
    image_path: PathBuf,
    create_container: bool,
}

impl<B: BlobStore> ObjectStorageDemo<B> {
    pub fn new(store: B, image_path: impl Into<PathBuf>, create_container: bool) -> Self {
        Self {
            store,
            image_path: image_path.into(),
            create_container,
        }
    }
}

/// `cat.jpg` becomes `cat-<uuid>.jpg`.
pub fn random_blob_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("blob");
    let id = uuid::Uuid::new_v4();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, id, ext),
        None => format!("{}-{}", stem, id),
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl<B: BlobStore> Demo for ObjectStorageDemo<B> {
    fn name(&self) -> &str {
        "object-storage"
    }

    async fn run(&self) -> Result<()> {
        if self.create_container {
            self.store.ensure_container().await?;
        }

        let data = tokio::fs::read(&self.image_path).await?;
        let name = random_blob_name(&self.image_path);
        let blob = self
            .store
            .upload(&name, data, content_type_for(&self.image_path))
            .await?;

        tracing::info!("uploaded blockblob to {}", blob.url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_blob_name_keeps_stem_and_extension() {
        let name = random_blob_name(Path::new("assets/cat.jpg"));
        let id = name
            .strip_prefix("cat-")
            .and_then(|rest| rest.strip_suffix(".jpg"))
            .unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_ne!(name, random_blob_name(Path::new("assets/cat.jpg")));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("cat.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("dog.png")), "image/png");
        assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
    }
}
