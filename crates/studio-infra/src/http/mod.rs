//! HTTP/JSON implementation of the backend port.

pub mod client;
pub mod envelope;

pub use client::HttpPublishApi;
