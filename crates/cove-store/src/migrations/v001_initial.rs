//! v001 -- Initial schema creation.
//!
//! Creates the `documents` table. Every collection shares it; `seq` records
//! arrival order and survives updates, so snapshots list documents in the
//! order they were first written.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Documents
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,                 -- e.g. spaces/{id}/channels
    id         TEXT NOT NULL,
    data       TEXT NOT NULL,                 -- JSON object
    updated_at TEXT NOT NULL,                 -- ISO-8601 / RFC-3339

    UNIQUE (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection
    ON documents(collection, seq);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
