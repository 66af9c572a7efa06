//! [`DocumentStore`] implementation for the local database.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use cove_shared::query::{CollectionPath, Document, Query};
use cove_shared::{DocumentStore, LiveQuery, Result};

use crate::database::Database;

#[async_trait]
impl DocumentStore for Database {
    async fn get(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>> {
        Ok(self.get_document(collection, id)?)
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
        merge: bool,
    ) -> Result<()> {
        self.put_document(collection, id, data, merge)?;
        debug!(path = %collection.doc(id), merge, "document set");
        Ok(())
    }

    async fn add(&self, collection: &CollectionPath, data: Map<String, Value>) -> Result<String> {
        let id = self.insert_document(collection, data)?;
        debug!(path = %collection.doc(&id), "document added");
        Ok(id)
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<()> {
        self.update_document(collection, id, data)?;
        debug!(path = %collection.doc(id), "document updated");
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        Ok(self.run_query(query)?)
    }

    async fn watch(&self, query: Query) -> Result<LiveQuery> {
        Ok(self.watch_query(query)?)
    }
}
