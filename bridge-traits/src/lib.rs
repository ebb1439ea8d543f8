//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host environment.
//!
//! ## Overview
//!
//! This crate defines the contract between the storefront core and the host it is
//! embedded in. Each trait represents a capability the core requires but that is
//! provided differently per host (desktop shell, test harness, embedded runtime).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations against the store API
//! - [`KeyValueStore`](storage::KeyValueStore) - String key-value persistence for
//!   session snapshots and tokens
//! - [`Clock`](time::Clock) - Time source for deterministic cache-expiry testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform-specific errors to `BridgeError` and
//! provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be shared
//! freely across async tasks behind `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::KeyValueStore;
pub use time::{Clock, SystemClock};
