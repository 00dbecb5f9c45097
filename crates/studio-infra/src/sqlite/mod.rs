//! SQLite storage layer.
//!
//! WAL-mode database with split read/write connection pools. Migrations live
//! in the workspace `migrations/` directory.

pub mod pool;
