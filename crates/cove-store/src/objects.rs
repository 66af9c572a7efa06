//! Filesystem-backed [`ObjectStorage`].
//!
//! Objects live under a base directory at their storage path
//! (`reels/1700000000000-ab12cd3`). Paths are validated segment by segment
//! so nothing can be written outside the base directory. Characters that
//! some filesystems reject (`:` in timestamped keys, for one) are
//! percent-encoded in the on-disk name only; callers always use the key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use cove_shared::constants::MAX_UPLOAD_SIZE;
use cove_shared::{ObjectStorage, StoredObject};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct FsObjectStorage {
    base_path: PathBuf,
    max_size: usize,
    /// Public prefix for download URLs; `file://` URLs when unset.
    base_url: Option<String>,
}

impl FsObjectStorage {
    pub async fn new(base_path: PathBuf, base_url: Option<String>) -> Result<Self> {
        Self::with_max_size(base_path, base_url, MAX_UPLOAD_SIZE).await
    }

    pub async fn with_max_size(
        base_path: PathBuf,
        base_url: Option<String>,
        max_size: usize,
    ) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;
        let base_path = base_path.canonicalize().unwrap_or(base_path);

        info!(path = %base_path.display(), "object storage initialized");

        Ok(Self {
            base_path,
            max_size,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn store(&self, path: &str, data: &[u8]) -> Result<StoredObject> {
        if data.is_empty() {
            return Err(StoreError::EmptyObject);
        }
        if data.len() > self.max_size {
            return Err(StoreError::ObjectTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, data).await?;

        let content_hash = blake3::hash(data).to_hex().to_string();
        debug!(path, size = data.len(), hash = %content_hash, "stored object");

        Ok(StoredObject {
            path: path.to_string(),
            size: data.len(),
            content_hash,
        })
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        if !target.exists() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(fs::read(&target).await?)
    }

    pub fn url_for(&self, path: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if !target.exists() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(match &self.base_url {
            Some(base) => format!("{base}/{path}"),
            None => format!("file://{}", target.display()),
        })
    }

    /// Map a storage path to a file under the base directory.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        if path.is_empty() || path.contains('\\') {
            return Err(StoreError::InvalidPath(path.to_string()));
        }

        let mut resolved = self.base_path.clone();
        for segment in path.split('/') {
            // empty segments cover absolute paths and `//`
            if matches!(segment, "" | "." | "..") {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            resolved.push(encode_segment(segment));
        }

        if !resolved.starts_with(&self.base_path) || resolved == self.base_path {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(resolved)
    }
}

/// Percent-encode characters that are not portable in file names.
fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for c in segment.chars() {
        if matches!(c, '%' | ':' | '<' | '>' | '"' | '|' | '?' | '*') || c.is_control() {
            encoded.push_str(&format!("%{:02X}", c as u32));
        } else {
            encoded.push(c);
        }
    }
    encoded
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> cove_shared::Result<StoredObject> {
        debug!(path, content_type, "uploading object");
        Ok(self.store(path, &data).await?)
    }

    async fn download_url(&self, path: &str) -> cove_shared::Result<String> {
        Ok(self.url_for(path)?)
    }
}
