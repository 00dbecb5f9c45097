//! Persistent `DraftStorage` backends.
//!
//! `SqliteDraftStorage` keeps entries in the `client_kv` table;
//! `FileDraftStorage` keeps one JSON file per key under a directory.

pub mod file;
pub mod sqlite;

pub use file::FileDraftStorage;
pub use sqlite::SqliteDraftStorage;
