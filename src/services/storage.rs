//! File storage for uploaded images (item pictures, proofs of return)

use std::path::{Path, PathBuf};

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

/// Folder for item pictures
pub const ITEMS_FOLDER: &str = "items";
/// Folder for proof-of-return photos
pub const RETURN_PROOFS_FOLDER: &str = "return_proofs";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// An uploaded file held in memory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct StorageService {
    root: PathBuf,
    max_bytes: usize,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.upload_dir),
            max_bytes: config.max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an image under `folder` and return its reference
    /// (`folder/<uuid>.<ext>`), relative to the storage root.
    pub async fn save_image(&self, folder: &str, file: &UploadedFile) -> AppResult<String> {
        if file.bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "Uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }
        let ext = image_extension(file.file_name.as_deref())?;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot create {}: {}", dir.display(), e)))?;

        let name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
        let path = dir.join(&name);
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot write {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), size = file.bytes.len(), "stored upload");
        Ok(format!("{}/{}", folder, name))
    }

    /// Remove a stored file. Missing files are not an error.
    pub async fn remove(&self, reference: &str) -> AppResult<()> {
        if reference.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(AppError::BadRequest(format!("Invalid file reference {}", reference)));
        }
        match tokio::fs::remove_file(self.root.join(reference)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(format!("Cannot remove {}: {}", reference, e))),
        }
    }
}

fn image_extension(file_name: Option<&str>) -> AppResult<String> {
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| AppError::Validation("Uploaded file has no extension".to_string()))?;

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::Validation(format!("Unsupported image type .{}", ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(max_bytes: usize) -> StorageService {
        let dir = std::env::temp_dir().join(format!("perpustakaan-test-{}", uuid::Uuid::new_v4()));
        StorageService::new(&StorageConfig {
            upload_dir: dir.to_string_lossy().into_owned(),
            max_upload_bytes: max_bytes,
        })
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("bukti.JPG")).unwrap(), "jpg");
        assert_eq!(image_extension(Some("a.b.png")).unwrap(), "png");
        assert!(image_extension(Some("script.sh")).is_err());
        assert!(image_extension(Some("noext")).is_err());
        assert!(image_extension(None).is_err());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let storage = service(1024);
        let file = UploadedFile {
            file_name: Some("proof.png".into()),
            bytes: vec![1, 2, 3],
        };
        let reference = storage.save_image(RETURN_PROOFS_FOLDER, &file).await.unwrap();
        assert!(reference.starts_with("return_proofs/"));
        assert!(reference.ends_with(".png"));
        assert_eq!(tokio::fs::read(storage.root().join(&reference)).await.unwrap(), vec![1, 2, 3]);

        storage.remove(&reference).await.unwrap();
        assert!(!storage.root().join(&reference).exists());
        // second removal is a no-op
        storage.remove(&reference).await.unwrap();

        let _ = tokio::fs::remove_dir_all(storage.root()).await;
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_traversal() {
        let storage = service(2);
        let file = UploadedFile {
            file_name: Some("big.png".into()),
            bytes: vec![0; 3],
        };
        assert!(matches!(
            storage.save_image(ITEMS_FOLDER, &file).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            storage.remove("../etc/passwd").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
