use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::util::multipart::UploadedFile;

const ATTACHMENT_DIR: &str = "incident_attachments";

/// Incident attachments on local disk under the media root. Stored names are
/// generated, so user-supplied file names never reach the filesystem.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub stored_name: String,
    pub original_name: String,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self) -> PathBuf {
        self.root.join(ATTACHMENT_DIR)
    }

    pub fn path_of(&self, stored_name: &str) -> Option<PathBuf> {
        if stored_name.is_empty() || stored_name.contains(['/', '\\']) || stored_name.starts_with('.') {
            return None;
        }
        Some(self.dir().join(stored_name))
    }

    pub async fn save(&self, file: &UploadedFile) -> std::io::Result<StoredFile> {
        fs::create_dir_all(self.dir()).await?;

        let original_name = sanitize_file_name(&file.filename);
        let stored_name = match Path::new(&original_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", uuid::Uuid::new_v4().simple(), ext.to_ascii_lowercase()),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };

        let mut out = fs::File::create(self.dir().join(&stored_name)).await?;
        out.write_all(&file.content).await?;
        out.flush().await?;

        info!(stored_name = %stored_name, bytes = file.content.len(), "stored attachment");
        Ok(StoredFile { stored_name, original_name })
    }

    pub async fn read(&self, stored_name: &str) -> std::io::Result<Vec<u8>> {
        match self.path_of(stored_name) {
            Some(path) => fs::read(path).await,
            None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "invalid attachment name")),
        }
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, stored_name: &str) {
        let Some(path) = self.path_of(stored_name) else {
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => info!(stored_name, "deleted attachment"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(stored_name, error = %err, "could not delete attachment"),
        }
    }
}

/// Keeps only the final path component and drops characters that would break
/// a Content-Disposition header.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}
