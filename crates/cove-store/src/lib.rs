//! # cove-store
//!
//! Local backend for Cove: a SQLite document store with live queries and a
//! filesystem object store. Both implement the `cove-shared` backend traits,
//! so the client can run against them in development and tests.

pub mod database;
pub mod documents;
pub mod live;
pub mod migrations;
pub mod objects;
pub mod store;

mod error;

pub use database::{default_data_dir, Database};
pub use error::StoreError;
pub use objects::FsObjectStorage;
