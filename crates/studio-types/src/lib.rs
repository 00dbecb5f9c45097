//! Shared domain types for the publish studio.
//!
//! Wire and domain types for connectors, binding wizards, publish records and
//! drafts, plus the error taxonomy shared by the engine crates.
//!
//! Zero infrastructure dependencies -- only serde, chrono, semver, regex, thiserror.

pub mod config;
pub mod connector;
pub mod draft;
pub mod error;
pub mod publish;
pub mod version;
pub mod wizard;
