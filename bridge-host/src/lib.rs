//! # Host Bridge Implementations
//!
//! Concrete adapters for the bridge traits, suitable for native hosts:
//! - [`ReqwestHttpClient`] - HTTP operations via `reqwest` with rustls TLS
//! - [`MemoryKeyValueStore`] - volatile in-memory storage for tests and tooling
//! - [`JsonFileKeyValueStore`] - durable key-value storage backed by a JSON file

pub mod http;
pub mod storage;

pub use http::ReqwestHttpClient;
pub use storage::{JsonFileKeyValueStore, MemoryKeyValueStore};
