//! Publish/bind orchestration logic and backend port traits.
//!
//! This crate defines the "ports" (`PublishApi`, `AuthRedirector`,
//! `DraftStorage`) that the infrastructure layer implements, plus the pure
//! state machines built on them. It depends only on `studio-types` -- never
//! on `studio-infra` or any HTTP/database crate.

pub mod api;
pub mod catalog;
pub mod draft;
pub mod publish;
pub mod readiness;
pub mod session;
pub mod wizard;

#[cfg(test)]
pub(crate) mod test_support;
