//! Typed wrapper over a raw [`LiveQuery`].

use tracing::warn;

use cove_shared::query::Document;
use cove_shared::{LiveQuery, Result};

/// A live query whose snapshots are decoded into records.
///
/// Documents that fail decoding are logged and skipped; one bad document
/// never hides the rest of the snapshot.
pub struct Live<T> {
    inner: LiveQuery,
    decode: fn(&Document) -> Result<T>,
}

impl<T> Live<T> {
    pub fn new(inner: LiveQuery, decode: fn(&Document) -> Result<T>) -> Self {
        Self { inner, decode }
    }

    /// Next full snapshot, or `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        let docs = self.inner.next_snapshot().await?;
        Some(decode_all(&docs, self.decode))
    }

    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}

pub(crate) fn decode_all<T>(docs: &[Document], decode: fn(&Document) -> Result<T>) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match decode(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use cove_shared::models::Space;

    use crate::testing::fields;

    use super::*;

    #[test]
    fn malformed_documents_are_skipped() {
        let docs = vec![
            Document::new("s1", fields(json!({"name": "Rust"}))),
            Document::new("s2", fields(json!({"name": 7}))),
            Document::new("s3", fields(json!({"name": "Go"}))),
        ];
        let spaces = decode_all(&docs, Space::from_document);
        let names: Vec<_> = spaces.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Rust", "Go"]);
    }
}
