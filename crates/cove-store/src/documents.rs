//! CRUD operations on stored documents.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use uuid::Uuid;

use cove_shared::query::{CollectionPath, Document, Query};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_document(&self, collection: &CollectionPath, id: &str) -> Result<Option<Document>> {
        self.with_conn(|conn| read_document(conn, collection, id))
    }

    /// Every document of `collection`, in arrival order.
    pub fn list_collection(&self, collection: &CollectionPath) -> Result<Vec<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, data FROM documents
                 WHERE collection = ?1
                 ORDER BY seq ASC",
            )?;

            let rows = stmt.query_map(params![collection.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut docs = Vec::new();
            for row in rows {
                let (id, data) = row?;
                docs.push(Document::new(id, parse_object(&data)?));
            }
            Ok(docs)
        })
    }

    pub fn run_query(&self, query: &Query) -> Result<Vec<Document>> {
        Ok(query.apply(self.list_collection(&query.collection)?))
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Create or replace a document; with `merge`, fold `data` into the
    /// existing fields instead.
    pub fn put_document(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
        merge: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let data = match (merge, read_document(conn, collection, id)?) {
                (true, Some(existing)) => merge_fields(existing.data, data),
                _ => data,
            };
            upsert(conn, collection, id, &data)
        })?;
        self.notify(collection.as_str());
        Ok(())
    }

    /// Insert under a fresh id and return it.
    pub fn insert_document(&self, collection: &CollectionPath, data: Map<String, Value>) -> Result<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.with_conn(|conn| upsert(conn, collection, &id, &data))?;
        self.notify(collection.as_str());
        Ok(id)
    }

    /// Merge into an existing document.
    pub fn update_document(
        &self,
        collection: &CollectionPath,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let existing = read_document(conn, collection, id)?
                .ok_or_else(|| StoreError::NotFound(collection.doc(id).to_string()))?;
            upsert(conn, collection, id, &merge_fields(existing.data, data))
        })?;
        self.notify(collection.as_str());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_document(conn: &Connection, collection: &CollectionPath, id: &str) -> Result<Option<Document>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            |row| row.get(0),
        )
        .optional()?;

    data.map(|d| parse_object(&d).map(|fields| Document::new(id, fields)))
        .transpose()
}

// ON CONFLICT keeps the original seq, so arrival order is stable across updates
fn upsert(conn: &Connection, collection: &CollectionPath, id: &str, data: &Map<String, Value>) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (collection, id, data, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (collection, id)
         DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
        params![
            collection.as_str(),
            id,
            serde_json::to_string(data)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn parse_object(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::CorruptDocument(
            "document body is not a JSON object".to_string(),
        )),
    }
}

/// Nested objects merge key by key; any other value replaces.
fn merge_fields(mut base: Map<String, Value>, patch: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in patch {
        if let Value::Object(incoming) = value {
            if let Some(Value::Object(existing)) = base.get_mut(&key) {
                let merged = merge_fields(std::mem::take(existing), incoming);
                *existing = merged;
                continue;
            }
            base.insert(key, Value::Object(incoming));
        } else {
            base.insert(key, value);
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    fn users() -> CollectionPath {
        CollectionPath::root("userDetails")
    }

    #[test]
    fn insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert_document(&users(), fields(json!({"displayName": "Ann"})))
            .unwrap();

        let doc = db.get_document(&users(), &id).unwrap().expect("exists");
        assert_eq!(doc.data["displayName"], "Ann");
        assert!(db.get_document(&users(), "missing").unwrap().is_none());
    }

    #[test]
    fn merge_keeps_other_fields() {
        let db = Database::open_in_memory().unwrap();
        db.put_document(&users(), "u1", fields(json!({"username": "ann", "displayName": "Ann"})), false)
            .unwrap();
        db.put_document(&users(), "u1", fields(json!({"profilePicture": "p.png"})), true)
            .unwrap();

        let doc = db.get_document(&users(), "u1").unwrap().unwrap();
        assert_eq!(doc.data["username"], "ann");
        assert_eq!(doc.data["profilePicture"], "p.png");

        // Without merge the document is replaced.
        db.put_document(&users(), "u1", fields(json!({"username": "bea"})), false)
            .unwrap();
        let doc = db.get_document(&users(), "u1").unwrap().unwrap();
        assert!(doc.data.get("profilePicture").is_none());
    }

    #[test]
    fn update_requires_existing() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .update_document(&users(), "nobody", fields(json!({"a": 1})))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn list_keeps_arrival_order_across_updates() {
        let db = Database::open_in_memory().unwrap();
        db.put_document(&users(), "b", fields(json!({"n": 1})), false).unwrap();
        db.put_document(&users(), "a", fields(json!({"n": 2})), false).unwrap();
        db.update_document(&users(), "b", fields(json!({"n": 3}))).unwrap();

        let ids: Vec<_> = db
            .list_collection(&users())
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn collections_are_isolated() {
        let db = Database::open_in_memory().unwrap();
        let a = CollectionPath::root("chats").doc("x").collection("messages");
        let b = CollectionPath::root("chats").doc("y").collection("messages");
        db.insert_document(&a, fields(json!({"lastMessage": "hi"}))).unwrap();

        assert_eq!(db.list_collection(&a).unwrap().len(), 1);
        assert!(db.list_collection(&b).unwrap().is_empty());
    }

    #[test]
    fn writes_only_ever_add_or_replace() {
        let db = Database::open_in_memory().unwrap();
        let mut changes = db.changes();
        db.put_document(&users(), "u1", fields(json!({"n": 1})), false).unwrap();
        db.put_document(&users(), "u1", fields(json!({})), false).unwrap();
        db.put_document(&users(), "u1", fields(json!({"n": 2})), true).unwrap();
        db.update_document(&users(), "u1", fields(json!({"n": 3}))).unwrap();

        let docs = db.list_collection(&users()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].data["n"], 3);

        for _ in 0..4 {
            assert_eq!(changes.try_recv().unwrap(), "userDetails");
        }
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn nested_merge() {
        let merged = merge_fields(
            fields(json!({"meta": {"a": 1, "b": 2}, "x": 1})),
            fields(json!({"meta": {"b": 3}})),
        );
        assert_eq!(Value::Object(merged), json!({"meta": {"a": 1, "b": 3}, "x": 1}));
    }
}
