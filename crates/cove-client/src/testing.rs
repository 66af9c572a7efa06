//! Fakes for the service traits, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Map, Value};

use cove_shared::constants::USER_DETAILS;
use cove_shared::query::{CollectionPath, Document, Query};
use cove_shared::{
    CoveError, DocumentStore, LanguageService, LiveQuery, ObjectStorage, Result, StoredObject,
};
use cove_store::Database;

use crate::auth::SessionAuth;
use crate::context::ClientContext;

pub fn fields(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => Map::new(),
    }
}

/// In-memory database whose profile reads can be made to fail per user.
pub struct FlakyStore {
    pub inner: Database,
    failing_profiles: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn fail_profile(&self, user: &str) {
        self.failing_profiles.lock().unwrap().insert(user.to_string());
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>> {
        if collection.as_str() == USER_DETAILS && self.failing_profiles.lock().unwrap().contains(id) {
            return Err(CoveError::unavailable("profile lookup failed"));
        }
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
        merge: bool,
    ) -> Result<()> {
        self.inner.set(collection, id, data, merge).await
    }

    async fn add(&self, collection: &CollectionPath, data: Map<String, Value>) -> Result<String> {
        self.inner.add(collection, data).await
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<()> {
        self.inner.update(collection, id, data).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.inner.query(query).await
    }

    async fn watch(&self, query: Query) -> Result<LiveQuery> {
        self.inner.watch(query).await
    }
}

#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryObjects {
    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjects {
    async fn upload(&self, path: &str, data: Bytes, _content_type: &str) -> Result<StoredObject> {
        let size = data.len();
        self.objects.lock().unwrap().insert(path.to_string(), data);
        Ok(StoredObject {
            path: path.to_string(),
            size,
            content_hash: String::new(),
        })
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        if self.objects.lock().unwrap().contains_key(path) {
            Ok(format!("mem://{path}"))
        } else {
            Err(CoveError::not_found(path))
        }
    }
}

/// Translates to `[{target}] {text}` and detects a fixed code, counting calls.
pub struct FakeLanguage {
    pub translate_calls: AtomicUsize,
    pub detect_calls: AtomicUsize,
    pub fail_translate: AtomicBool,
    pub fail_detect: AtomicBool,
    pub detected: Mutex<String>,
}

impl Default for FakeLanguage {
    fn default() -> Self {
        Self {
            translate_calls: AtomicUsize::new(0),
            detect_calls: AtomicUsize::new(0),
            fail_translate: AtomicBool::new(false),
            fail_detect: AtomicBool::new(false),
            detected: Mutex::new("fr".to_string()),
        }
    }
}

impl FakeLanguage {
    pub fn failing() -> Self {
        let fake = Self::default();
        fake.fail_translate.store(true, Ordering::SeqCst);
        fake.fail_detect.store(true, Ordering::SeqCst);
        fake
    }

    pub fn translations(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageService for FakeLanguage {
    async fn translate(&self, text: &str, target: &str) -> Result<String> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_translate.load(Ordering::SeqCst) {
            return Err(CoveError::unavailable("quota exceeded"));
        }
        Ok(format!("[{target}] {text}"))
    }

    async fn detect(&self, _text: &str) -> Result<String> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_detect.load(Ordering::SeqCst) {
            return Err(CoveError::unavailable("quota exceeded"));
        }
        Ok(self.detected.lock().unwrap().clone())
    }
}

pub struct TestBackend {
    pub store: Arc<FlakyStore>,
    pub objects: Arc<MemoryObjects>,
    pub auth: Arc<SessionAuth>,
    pub language: Arc<FakeLanguage>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::with_language(FakeLanguage::default())
    }

    pub fn with_language(language: FakeLanguage) -> Self {
        Self {
            store: Arc::new(FlakyStore {
                inner: Database::open_in_memory().unwrap(),
                failing_profiles: Mutex::new(HashSet::new()),
            }),
            objects: Arc::new(MemoryObjects::default()),
            auth: Arc::new(SessionAuth::new()),
            language: Arc::new(language),
        }
    }

    pub fn context(&self) -> ClientContext {
        ClientContext::new(
            self.store.clone(),
            self.objects.clone(),
            self.auth.clone(),
            self.language.clone(),
            "en",
        )
    }

    /// Write a `userDetails/{id}` document directly.
    pub fn seed_profile(&self, id: &str, display_name: &str, picture: Option<&str>) {
        self.store
            .inner
            .put_document(
                &CollectionPath::root(USER_DETAILS),
                id,
                fields(json!({
                    "username": id,
                    "displayName": display_name,
                    "profilePicture": picture,
                })),
                false,
            )
            .unwrap();
    }
}
