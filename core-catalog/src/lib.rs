//! # Core Catalog Module
//!
//! Product listing, search, and the read-through cache in front of the
//! store API's catalog endpoints.
//!
//! ## Overview
//!
//! - **CatalogService**: paginated listing and title search with a
//!   cache-first load path and last-write-wins state updates
//! - **ListingCache**: TTL-bounded cache of listing pages, keyed by query
//!   shape, with an optional background sweeper
//! - **SearchDebouncer**: collapses keystroke bursts into one dispatched
//!   search term
//!
//! Catalog requests go through whatever [`HttpClient`](bridge_traits::HttpClient)
//! the service is built with; in a full assembly that is the session crate's
//! `RequestAuthenticator`, so authentication concerns never surface here.

pub mod cache;
pub mod debounce;
pub mod service;
pub mod types;

pub use cache::ListingCache;
pub use debounce::SearchDebouncer;
pub use service::CatalogService;
pub use types::{Category, ListingPage, ListingState, Product};
