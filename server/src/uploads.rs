//! File uploads stored on local disk under the upload root, one directory
//! per conversation

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "pdf", "doc", "docx", "txt", "mp4", "mov",
];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file provided")]
    NoFile,
    #[error("No file selected")]
    NoFilename,
    #[error("File type not allowed")]
    FileType,
    #[error("conversation_id is required")]
    MissingConversation,
    #[error("Invalid conversation_id")]
    InvalidConversation,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a stored upload
#[derive(Debug, Serialize)]
pub struct StoredUpload {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Whether the filename carries an allowed extension
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduce a client filename to a safe basename of ASCII letters, digits,
/// `.`, `-` and `_`
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Conversation ids become directory names, so they are restricted to a
/// single safe path segment
pub fn valid_conversation_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

pub struct UploadService {
    root: PathBuf,
}

impl UploadService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `data` to `<root>/<conversation_id>/<timestamp>_<suffix>_<name>`
    pub async fn store(
        &self,
        conversation_id: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        if conversation_id.trim().is_empty() {
            return Err(UploadError::MissingConversation);
        }
        if !valid_conversation_id(conversation_id) {
            return Err(UploadError::InvalidConversation);
        }
        if original_name.trim().is_empty() {
            return Err(UploadError::NoFilename);
        }
        if !allowed_file(original_name) {
            return Err(UploadError::FileType);
        }
        let filename = sanitize_filename(original_name);
        if !allowed_file(&filename) {
            return Err(UploadError::FileType);
        }

        let dir = self.root.join(conversation_id);
        tokio::fs::create_dir_all(&dir).await?;

        let now = Utc::now();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let stored_name = format!("{}_{}_{}", now.format("%Y%m%d_%H%M%S"), suffix, filename);
        tokio::fs::write(dir.join(&stored_name), data).await?;

        tracing::info!(conversation_id, file = %stored_name, size = data.len(), "file uploaded");
        Ok(StoredUpload {
            url: format!("/api/uploads/{}/{}", conversation_id, stored_name),
            filename,
            size: data.len() as u64,
            uploaded_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_whitelist() {
        assert!(allowed_file("scan.PDF"));
        assert!(allowed_file("clip.mov"));
        assert!(!allowed_file("script.sh"));
        assert!(!allowed_file("noextension"));
    }

    #[test]
    fn sanitizes_paths_and_spaces() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\my scan.pdf"), "my_scan.pdf");
        assert_eq!(sanitize_filename(".hidden.txt"), "hidden.txt");
        assert_eq!(sanitize_filename("résumé.doc"), "rsum.doc");
    }

    #[test]
    fn conversation_ids_are_single_segments() {
        assert!(valid_conversation_id("conv_123-abc"));
        assert!(!valid_conversation_id("../etc"));
        assert!(!valid_conversation_id("a/b"));
        assert!(!valid_conversation_id(""));
    }

    #[tokio::test]
    async fn stores_file_under_conversation() {
        let root = std::env::temp_dir().join(format!("sdc-uploads-{}", uuid::Uuid::new_v4()));
        let service = UploadService::new(&root);

        let stored = service.store("conv1", "photo.png", b"png-bytes").await.unwrap();
        assert_eq!(stored.filename, "photo.png");
        assert_eq!(stored.size, 9);
        assert!(stored.url.starts_with("/api/uploads/conv1/"));
        assert!(stored.url.ends_with("_photo.png"));

        let name = stored.url.rsplit('/').next().unwrap();
        let on_disk = tokio::fs::read(root.join("conv1").join(name)).await.unwrap();
        assert_eq!(on_disk, b"png-bytes");

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn rejects_disallowed_types() {
        let service = UploadService::new(std::env::temp_dir());
        assert!(matches!(
            service.store("conv1", "run.exe", b"x").await,
            Err(UploadError::FileType)
        ));
        assert!(matches!(
            service.store("../x", "a.png", b"x").await,
            Err(UploadError::InvalidConversation)
        ));
    }
}
