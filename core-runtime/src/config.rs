//! # Core Configuration Module
//!
//! Provides configuration management for the storefront core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core
//! library. It enforces fail-fast validation to ensure all required bridges are
//! provided before initialization.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Required for all store API calls
//! - `KeyValueStore` - Required for session persistence
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source (defaults to the system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .key_value_store(Arc::new(MyStore))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable
//! error messages when capabilities are missing.

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{Clock, HttpClient, KeyValueStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Base URL of the public store API used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://api.escuelajs.co/api/v1";

/// How long a cached listing page stays valid (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Quiet period before a search term is dispatched.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Fixed session lifetime after which the user is signed out (24 hours).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Core configuration for the storefront core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the store API, without a trailing slash
    pub api_base_url: String,

    /// HTTP client for making API requests (required)
    pub http_client: Arc<dyn HttpClient>,

    /// Key-value storage for session persistence (required)
    pub key_value_store: Arc<dyn KeyValueStore>,

    /// Time source (defaults to the system clock)
    pub clock: Arc<dyn Clock>,

    /// Listing cache time-to-live
    pub cache_ttl: Duration,

    /// Search input debounce window
    pub search_debounce: Duration,

    /// Fixed session lifetime
    pub session_ttl: Duration,

    /// Event bus buffer size
    pub event_buffer: usize,

    /// URL path fragments whose failures are logged quietly (probe endpoints)
    pub quiet_paths: Vec<String>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("key_value_store", &"KeyValueStore { ... }")
            .field("clock", &"Clock { ... }")
            .field("cache_ttl", &self.cache_ttl)
            .field("search_debounce", &self.search_debounce)
            .field("session_ttl", &self.session_ttl)
            .field("event_buffer", &self.event_buffer)
            .field("quiet_paths", &self.quiet_paths)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Creates the event bus with the configured buffer size.
    ///
    /// Hosts call this once and hand clones of the bus to each subsystem.
    pub fn build_event_bus(&self) -> EventBus {
        EventBus::new(self.event_buffer)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - API base URL is present and well-formed
    /// - Durations are sane (non-zero TTLs, sub-10s debounce)
    /// - Event buffer is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(Error::Config(
                "API base URL must start with http:// or https://".to_string(),
            ));
        }

        if self.api_base_url.ends_with('/') {
            return Err(Error::Config(
                "API base URL must not end with a trailing slash".to_string(),
            ));
        }

        if self.cache_ttl.is_zero() {
            return Err(Error::Config(
                "Cache TTL must be greater than zero".to_string(),
            ));
        }

        if self.session_ttl.is_zero() {
            return Err(Error::Config(
                "Session lifetime must be greater than zero".to_string(),
            ));
        }

        if self.search_debounce > Duration::from_secs(10) {
            return Err(Error::Config(
                "Search debounce exceeds maximum of 10 seconds".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides helpful error
/// messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    cache_ttl: Option<Duration>,
    search_debounce: Option<Duration>,
    session_ttl: Option<Duration>,
    event_buffer: Option<usize>,
    quiet_paths: Vec<String>,
}

impl CoreConfigBuilder {
    /// Sets the API base URL.
    ///
    /// Default: the public store API.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP client implementation (required).
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the key-value store implementation (required).
    ///
    /// The store is used for persisting the session snapshot and tokens
    /// between launches.
    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the time source.
    ///
    /// Default: the system clock. Tests inject a manual clock to control
    /// cache expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the listing cache time-to-live.
    ///
    /// Default: 5 minutes.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Sets the search debounce window.
    ///
    /// Default: 300 milliseconds.
    pub fn search_debounce(mut self, window: Duration) -> Self {
        self.search_debounce = Some(window);
        self
    }

    /// Sets the fixed session lifetime.
    ///
    /// Default: 24 hours.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events.
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Adds a URL path fragment whose failures should be logged quietly.
    ///
    /// Probe endpoints that are expected to fail in normal operation go
    /// here so they don't produce user-facing error noise.
    pub fn quiet_path(mut self, path: impl Into<String>) -> Self {
        self.quiet_paths.push(path.into());
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// This validates all required dependencies are provided and returns
    /// an error with an actionable message if anything is missing.
    pub fn build(self) -> Result<CoreConfig> {
        let http_client = self.http_client.ok_or_else(|| Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "No HTTP client implementation provided. \
                      Native hosts: inject bridge_host::ReqwestHttpClient. \
                      Tests: inject a scripted mock."
                .to_string(),
        })?;

        let key_value_store = self
            .key_value_store
            .ok_or_else(|| Error::CapabilityMissing {
                capability: "KeyValueStore".to_string(),
                message: "No key-value store implementation provided. \
                          Native hosts: inject bridge_host::JsonFileKeyValueStore. \
                          Tests: inject bridge_host::MemoryKeyValueStore."
                    .to_string(),
            })?;

        let config = CoreConfig {
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            http_client,
            key_value_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            cache_ttl: self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL),
            search_debounce: self.search_debounce.unwrap_or(DEFAULT_SEARCH_DEBOUNCE),
            session_ttl: self.session_ttl.unwrap_or(DEFAULT_SESSION_TTL),
            event_buffer: self
                .event_buffer
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            quiet_paths: self.quiet_paths,
        };

        config.validate()?;

        Ok(config)
    }
}
