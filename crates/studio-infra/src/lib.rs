//! Infrastructure layer for the publish studio.
//!
//! Implements the ports defined in `studio-core`: the HTTP backend client,
//! SQLite and file-backed draft storage, and the `studio.toml` loader.

pub mod config;
pub mod draft;
pub mod http;
pub mod sqlite;
