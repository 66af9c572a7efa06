//! Handles to the backend services, passed explicitly to every operation.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use cove_lang::LanguageClient;
use cove_shared::types::UserId;
use cove_shared::{AuthProvider, CoveError, DocumentStore, LanguageService, ObjectStorage, Result};
use cove_store::{default_data_dir, Database, FsObjectStorage};

use crate::config::ClientConfig;

/// Everything an operation needs to reach the outside world.
///
/// Cloning is cheap; all services are shared behind `Arc`s.
#[derive(Clone)]
pub struct ClientContext {
    pub store: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStorage>,
    pub auth: Arc<dyn AuthProvider>,
    pub language: Arc<dyn LanguageService>,
    /// Viewer language code; the translation target.
    pub locale: String,
}

impl ClientContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStorage>,
        auth: Arc<dyn AuthProvider>,
        language: Arc<dyn LanguageService>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            auth,
            language,
            locale: locale.into(),
        }
    }

    /// Build a context on the local backend: SQLite documents and
    /// filesystem objects under the configured data directory, plus the
    /// HTTP language client.
    pub async fn open(config: &ClientConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| CoveError::unavailable(format!("data dir {}: {e}", data_dir.display())))?;

        let database = Database::open_at(&data_dir.join("cove.db"))?;
        let objects =
            FsObjectStorage::new(data_dir.join("objects"), config.object_base_url.clone()).await?;
        let language = LanguageClient::new(config.language.clone())?;

        if !config.language.is_configured() {
            info!("no language API key; translation will return original text");
        }
        info!(data_dir = %data_dir.display(), locale = %config.locale, "client context ready");

        Ok(Self::new(
            Arc::new(database),
            Arc::new(objects),
            auth,
            Arc::new(language),
            config.locale.clone(),
        ))
    }

    /// The signed-in user, or `AuthRequired`.
    pub fn require_user(&self) -> Result<UserId> {
        self.auth.current_user().ok_or(CoveError::AuthRequired)
    }
}

/// A binary payload headed for object storage.
#[derive(Debug, Clone)]
pub struct Upload {
    pub data: Bytes,
    pub content_type: String,
}

impl Upload {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }
}

/// Upload a blob, then resolve the URL it can be fetched from.
pub(crate) async fn upload_and_resolve(ctx: &ClientContext, path: &str, upload: Upload) -> Result<String> {
    if upload.data.is_empty() {
        return Err(CoveError::validation("upload is empty"));
    }
    let stored = ctx
        .objects
        .upload(path, upload.data, &upload.content_type)
        .await?;
    debug!(path = %stored.path, size = stored.size, "upload complete");
    ctx.objects.download_url(&stored.path).await
}

#[cfg(test)]
mod tests {
    use crate::testing::TestBackend;

    use super::*;

    #[tokio::test]
    async fn require_user_without_session() {
        let backend = TestBackend::new();
        let ctx = backend.context();
        assert_eq!(ctx.require_user().unwrap_err(), CoveError::AuthRequired);

        backend.auth.sign_in("u1");
        assert_eq!(ctx.require_user().unwrap(), UserId::from("u1"));
    }

    #[tokio::test]
    async fn empty_upload_rejected() {
        let backend = TestBackend::new();
        let err = upload_and_resolve(&backend.context(), "a/b", Upload::new(Bytes::new(), "image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoveError::Validation(_)));
    }

    #[tokio::test]
    async fn open_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            data_dir: Some(dir.path().join("cove")),
            ..ClientConfig::default()
        };
        let ctx = ClientContext::open(&config, Arc::new(crate::SessionAuth::signed_in("u1")))
            .await
            .unwrap();

        let url = upload_and_resolve(&ctx, "profilePictures/u1", Upload::new(&b"png"[..], "image/png"))
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(dir.path().join("cove").join("cove.db").exists());
    }
}
