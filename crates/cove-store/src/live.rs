//! Live queries over the local database.
//!
//! Each live query is a tokio task that delivers the current result set,
//! then waits on the database's change channel and re-runs the query every
//! time its collection is written. The task ends when the consumer drops or
//! cancels the [`LiveQuery`] handle.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use cove_shared::query::Query;
use cove_shared::LiveQuery;

use crate::database::Database;
use crate::error::Result;

/// Snapshots buffered per live query before the producer waits.
const SNAPSHOT_BUFFER: usize = 16;

impl Database {
    /// Start a live query. Must be called from within a tokio runtime.
    pub fn watch_query(&self, query: Query) -> Result<LiveQuery> {
        // Subscribe before the first read so no write slips between them.
        let mut changes = self.changes();
        let initial = self.run_query(&query)?;

        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let db = self.clone();

        let producer = tokio::spawn(async move {
            let collection = query.collection.as_str().to_string();
            debug!(collection = %collection, "live query started");

            if tx.send(initial).await.is_err() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(path) if path == collection => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(collection = %collection, skipped, "live query lagged, re-reading");
                    }
                    Err(RecvError::Closed) => break,
                }

                match db.run_query(&query) {
                    Ok(snapshot) => {
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(collection = %collection, error = %e, "live query re-read failed");
                    }
                }
            }

            debug!(collection = %collection, "live query stopped");
        });

        Ok(LiveQuery::new(rx, Some(producer)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Map, Value};

    use cove_shared::query::{CollectionPath, Direction};

    use super::*;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    fn messages() -> CollectionPath {
        CollectionPath::root("chats").doc("a_b").collection("messages")
    }

    async fn next(live: &mut LiveQuery) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(2), live.next_snapshot())
            .await
            .expect("snapshot in time")
            .expect("feed open")
            .into_iter()
            .map(|d| d.id)
            .collect()
    }

    #[tokio::test]
    async fn initial_snapshot_then_updates() {
        let db = Database::open_in_memory().unwrap();
        db.put_document(&messages(), "m2", fields(json!({"timestamp": "2024-01-01T00:00:02.000Z"})), false)
            .unwrap();

        let query = Query::new(messages()).order_by("timestamp", Direction::Ascending);
        let mut live = db.watch_query(query).unwrap();
        assert_eq!(next(&mut live).await, vec!["m2"]);

        db.put_document(&messages(), "m1", fields(json!({"timestamp": "2024-01-01T00:00:01.000Z"})), false)
            .unwrap();
        assert_eq!(next(&mut live).await, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn other_collections_do_not_trigger() {
        let db = Database::open_in_memory().unwrap();
        let mut live = db.watch_query(Query::new(messages())).unwrap();
        assert!(next(&mut live).await.is_empty());

        let other = CollectionPath::root("chats").doc("c_d").collection("messages");
        db.insert_document(&other, fields(json!({"lastMessage": "x"}))).unwrap();
        db.insert_document(&messages(), fields(json!({"lastMessage": "y"}))).unwrap();

        // The only delivery is the one for our collection.
        assert_eq!(next(&mut live).await.len(), 1);
    }

    #[tokio::test]
    async fn cancel_stops_delivery() {
        let db = Database::open_in_memory().unwrap();
        let mut live = db.watch_query(Query::new(messages())).unwrap();
        let _ = next(&mut live).await;

        live.cancel();
        assert!(live.is_cancelled());
        db.insert_document(&messages(), fields(json!({"lastMessage": "late"}))).unwrap();

        let got = tokio::time::timeout(Duration::from_millis(200), live.next_snapshot()).await;
        assert!(matches!(got, Ok(None)));
    }
}
