//! # cove-shared
//!
//! Identifiers, typed records, the query model and the backend traits shared
//! by every Cove crate.

pub mod backend;
pub mod constants;
pub mod error;
pub mod models;
pub mod query;
pub mod time;
pub mod types;

pub use backend::{AuthProvider, DocumentStore, LanguageService, LiveQuery, ObjectStorage, StoredObject};
pub use error::{CoveError, Result};
pub use query::{CollectionPath, Direction, Document, Query};
