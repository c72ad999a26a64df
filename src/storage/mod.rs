//! Local file storage
//!
//! Two directories: a staging area holding uploads under their original
//! file names, and an output area for generated SVG pages. Same-named
//! uploads overwrite each other.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;

#[derive(Debug, Clone)]
pub struct FileStore {
    upload_dir: PathBuf,
    analyzed_dir: PathBuf,
}

impl FileStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            analyzed_dir: config.analyzed_dir.clone(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn analyzed_dir(&self) -> &Path {
        &self.analyzed_dir
    }

    /// Create both directories if missing
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.analyzed_dir).await?;
        Ok(())
    }

    /// Write an upload to the staging directory, replacing any previous file
    /// of the same name. Returns the stored path.
    pub async fn save_upload(&self, file_name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        let name = base_name(file_name).ok_or_else(|| {
            std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("Not a usable file name: {:?}", file_name),
            )
        })?;

        let path = self.upload_dir.join(name);
        tokio::fs::write(&path, data).await?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "Stored upload");
        Ok(path)
    }

    /// Read a previously uploaded file.
    ///
    /// Returns `None` when the file does not exist or the name is not a
    /// plain file name.
    pub async fn read_upload(&self, file_name: &str) -> std::io::Result<Option<Vec<u8>>> {
        if !is_plain_name(file_name) {
            return Ok(None);
        }

        match tokio::fs::read(self.upload_dir.join(file_name)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Output path for a page's SVG (1-based page number)
    pub fn svg_path(&self, page_number: usize) -> PathBuf {
        self.analyzed_dir.join(svg_file_name(page_number))
    }
}

/// `page_{n}_combined.svg`
pub fn svg_file_name(page_number: usize) -> String {
    format!("page_{}_combined.svg", page_number)
}

/// Final component of a client-supplied name, which may carry a path
fn base_name(file_name: &str) -> Option<&str> {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    is_plain_name(name).then_some(name)
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
