//! Seams to the external services.
//!
//! The client never talks to a concrete backend; it receives these traits
//! through its context, so tests and the local backend can stand in for the
//! hosted services.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::query::{CollectionPath, Document, Query};
use crate::types::UserId;

// ---------------------------------------------------------------------------
// Document database
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>>;

    /// Create or replace a document. With `merge`, the given fields are
    /// merged into an existing document instead of replacing it.
    async fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
        merge: bool,
    ) -> Result<()>;

    /// Create a document with a backend-assigned id and return the id.
    async fn add(&self, collection: &CollectionPath, data: Map<String, Value>) -> Result<String>;

    /// Merge fields into an existing document. `NotFound` if absent.
    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<()>;

    /// One-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Live query: the current result set is delivered immediately, then
    /// again in full after every change to the collection.
    async fn watch(&self, query: Query) -> Result<LiveQuery>;
}

/// Handle to a live query.
///
/// Snapshots arrive in order. Cancelling (or dropping) the handle stops the
/// producer; no snapshot is delivered afterwards.
pub struct LiveQuery {
    rx: mpsc::Receiver<Vec<Document>>,
    producer: Option<JoinHandle<()>>,
}

impl LiveQuery {
    /// Wrap a snapshot channel and the task feeding it.
    pub fn new(rx: mpsc::Receiver<Vec<Document>>, producer: Option<JoinHandle<()>>) -> Self {
        Self { rx, producer }
    }

    /// Next full snapshot, or `None` once the feed has ended.
    pub async fn next_snapshot(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Tear the feed down. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.producer.take() {
            task.abort();
        }
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.producer.is_none()
    }
}

impl Stream for LiveQuery {
    type Item = Vec<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub size: usize,
    /// BLAKE3 of the content, hex.
    pub content_hash: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<StoredObject>;

    /// A URL the object can be fetched from.
    async fn download_url(&self, path: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

pub trait AuthProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;
}

// ---------------------------------------------------------------------------
// Language service
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Translate `text` into the language identified by `target` (e.g. `en`).
    async fn translate(&self, text: &str, target: &str) -> Result<String>;

    /// Language code of `text`.
    async fn detect(&self, text: &str) -> Result<String>;
}
