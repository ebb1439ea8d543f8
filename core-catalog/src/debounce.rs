//! # Search Debouncer
//!
//! Collapses a burst of keystrokes into one dispatched search term.
//!
//! Each [`submit`](SearchDebouncer::submit) aborts the previous pending
//! dispatch and starts a fresh delay; only a term that survives the full
//! quiet window reaches the receiver. The receiver side is a plain mpsc
//! channel, so the consumer (typically a task that calls
//! [`CatalogService::search_products`](crate::service::CatalogService::search_products))
//! decides how to react to each dispatched term.

use core_runtime::config::CoreConfig;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::trace;

/// Buffered terms the consumer may lag behind by before submits block.
const DISPATCH_BUFFER: usize = 16;

pub struct SearchDebouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
    tx: mpsc::Sender<String>,
}

impl SearchDebouncer {
    /// Creates a debouncer with the configured quiet window.
    pub fn from_config(config: &CoreConfig) -> (Self, mpsc::Receiver<String>) {
        Self::new(config.search_debounce)
    }

    /// Creates a debouncer and the receiver its surviving terms arrive on.
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(DISPATCH_BUFFER);
        (
            Self {
                delay,
                pending: Mutex::new(None),
                tx,
            },
            rx,
        )
    }

    /// Submits a term, displacing any term still inside its quiet window.
    pub async fn submit(&self, term: impl Into<String>) {
        let term = term.into();
        let tx = self.tx.clone();
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(term = %term, "Dispatching debounced term");
            let _ = tx.send(term).await;
        });

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drops any pending term without dispatching it.
    pub async fn cancel(&self) {
        let mut pending = self.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bridge_traits::KeyValueStore;
    use std::sync::Arc;

    struct NullHttpClient;

    #[async_trait]
    impl HttpClient for NullHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::OperationFailed(
                "no HTTP traffic expected".to_string(),
            ))
        }
    }

    struct NullKeyValueStore;

    #[async_trait]
    impl KeyValueStore for NullKeyValueStore {
        async fn set(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn remove(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_uses_configured_window() {
        let config = CoreConfig::builder()
            .http_client(Arc::new(NullHttpClient))
            .key_value_store(Arc::new(NullKeyValueStore))
            .search_debounce(Duration::from_millis(100))
            .build()
            .unwrap();
        let (debouncer, mut rx) = SearchDebouncer::from_config(&config);

        debouncer.submit("shirt").await;
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().unwrap(), "shirt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_submit_dispatches_after_delay() {
        let (debouncer, mut rx) = SearchDebouncer::new(Duration::from_millis(300));

        debouncer.submit("shirt").await;
        tokio::time::sleep(Duration::from_millis(301)).await;

        assert_eq!(rx.try_recv().unwrap(), "shirt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_submits_dispatch_only_final_term() {
        let (debouncer, mut rx) = SearchDebouncer::new(Duration::from_millis(300));

        for term in ["s", "sh", "shi", "shir", "shirt"] {
            debouncer.submit(term).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(rx.try_recv().unwrap(), "shirt");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_typing_dispatches_each_term() {
        let (debouncer, mut rx) = SearchDebouncer::new(Duration::from_millis(300));

        debouncer.submit("table").await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.submit("chair").await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(rx.try_recv().unwrap(), "table");
        assert_eq!(rx.try_recv().unwrap(), "chair");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_term() {
        let (debouncer, mut rx) = SearchDebouncer::new(Duration::from_millis(300));

        debouncer.submit("shirt").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.cancel().await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_cancel_works() {
        let (debouncer, mut rx) = SearchDebouncer::new(Duration::from_millis(300));

        debouncer.submit("shirt").await;
        debouncer.cancel().await;
        debouncer.submit("table").await;
        tokio::time::sleep(Duration::from_millis(301)).await;

        assert_eq!(rx.try_recv().unwrap(), "table");
    }
}
