//! # Catalog Service
//!
//! Paginated product listing and title search with a cache-first load path.
//!
//! ## Load path
//!
//! 1. Build the cache key from the query shape
//! 2. On a fresh hit, serve the cached page without touching the network
//! 3. On a miss, fetch, read the total from the `x-total-count` header,
//!    cache the page, and publish it
//!
//! Every completed load (hit or miss) overwrites the shared
//! [`ListingState`] snapshot and emits a
//! [`CatalogEvent::ListingLoaded`](core_runtime::events::CatalogEvent).
//! Concurrent loads race last-write-wins; the page returned to each caller
//! is always the one that caller asked for.

use crate::cache::ListingCache;
use crate::types::{ListingPage, ListingState, Product};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use core_session::error::{ApiError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Header carrying the total result count for paginated endpoints.
const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Serialize)]
struct ListingQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    offset: u32,
    limit: u32,
}

pub struct CatalogService {
    http: Arc<dyn HttpClient>,
    base_url: String,
    cache: Arc<ListingCache>,
    state: Arc<RwLock<ListingState>>,
    event_bus: EventBus,
}

impl CatalogService {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        cache: Arc<ListingCache>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            cache,
            state: Arc::new(RwLock::new(ListingState::default())),
            event_bus,
        }
    }

    /// Builds a service from the core configuration, owning a fresh cache
    /// with the configured TTL and time source.
    ///
    /// The HTTP client is passed separately so hosts can hand in the
    /// authenticating decorator instead of the raw configured client.
    pub fn from_config(
        config: &CoreConfig,
        http: Arc<dyn HttpClient>,
        event_bus: EventBus,
    ) -> Self {
        Self::new(
            http,
            config.api_base_url.clone(),
            Arc::new(ListingCache::from_config(config)),
            event_bus,
        )
    }

    /// Loads one page of the product listing.
    #[instrument(skip(self))]
    pub async fn load_products(&self, offset: u32, limit: u32) -> Result<ListingPage> {
        let key = ListingCache::listing_key(offset, limit);
        self.load_page(key, None, offset, limit).await
    }

    /// Loads one page of title-search results.
    ///
    /// A blank term is not a search; it delegates to the plain listing so
    /// clearing the search box restores the full catalog.
    #[instrument(skip(self), fields(term = %term))]
    pub async fn search_products(&self, term: &str, offset: u32, limit: u32) -> Result<ListingPage> {
        let term = term.trim();
        if term.is_empty() {
            return self.load_products(offset, limit).await;
        }

        let key = ListingCache::search_key(term, offset, limit);
        self.load_page(key, Some(term), offset, limit).await
    }

    /// Fetches a single product by id. Detail views are not cached; the
    /// listing cache covers the hot path and details change more often than
    /// they are revisited.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i64) -> Result<Product> {
        let request = HttpRequest::new(
            HttpMethod::Get,
            format!("{}/products/{}", self.base_url, product_id),
        );

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, false));
        }

        Ok(response.json()?)
    }

    /// Snapshot of the most recently completed load.
    pub async fn state(&self) -> ListingState {
        self.state.read().await.clone()
    }

    async fn load_page(
        &self,
        key: String,
        term: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> Result<ListingPage> {
        if let Some((products, total)) = self.cache.get(&key).await {
            debug!(key = %key, "Serving listing from cache");
            let page = ListingPage {
                products,
                total,
                offset,
                limit,
                from_cache: true,
            };
            self.publish(&page, term).await;
            return Ok(page);
        }

        match self.fetch_page(term, offset, limit).await {
            Ok((products, total)) => {
                self.cache.put(key, products.clone(), total).await;
                let page = ListingPage {
                    products,
                    total,
                    offset,
                    limit,
                    from_cache: false,
                };
                self.publish(&page, term).await;
                info!(
                    count = page.products.len(),
                    total = page.total,
                    "Listing loaded"
                );
                Ok(page)
            }
            Err(e) => {
                warn!(error = %e, "Listing load failed");
                {
                    let mut state = self.state.write().await;
                    state.error = Some(e.to_string());
                }
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Catalog(CatalogEvent::CatalogError {
                        message: e.to_string(),
                    }));
                Err(e)
            }
        }
    }

    async fn fetch_page(
        &self,
        term: Option<&str>,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<Product>, u64)> {
        let query = serde_urlencoded::to_string(ListingQuery {
            title: term,
            offset,
            limit,
        })
        .map_err(|e| ApiError::Serialization(e.to_string()))?;

        let request = HttpRequest::new(
            HttpMethod::Get,
            format!("{}/products?{}", self.base_url, query),
        );

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(ApiError::from_response(&response, false));
        }

        let total = response
            .header(TOTAL_COUNT_HEADER)
            .and_then(|v| v.parse::<u64>().ok());

        let products: Vec<Product> = response.json()?;
        // Endpoints that omit the header at least bound the total from below
        let total = total.unwrap_or(products.len() as u64);

        Ok((products, total))
    }

    async fn publish(&self, page: &ListingPage, term: Option<&str>) {
        {
            let mut state = self.state.write().await;
            state.products = page.products.clone();
            state.total = page.total;
            state.offset = page.offset;
            state.limit = page.limit;
            state.query = term.map(str::to_string);
            state.error = None;
        }

        let _ = self
            .event_bus
            .emit(CoreEvent::Catalog(CatalogEvent::ListingLoaded {
                count: page.products.len(),
                total: page.total,
                offset: page.offset,
                limit: page.limit,
                from_cache: page.from_cache,
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bridge_traits::SystemClock;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Mutex as TokioMutex;

    struct MockHttpClient {
        responses: TokioMutex<Vec<HttpResponse>>,
        requests: TokioMutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: TokioMutex::new(responses),
                requests: TokioMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().await.push(request);
            let mut responses = self.responses.lock().await;
            if responses.is_empty() {
                panic!("MockHttpClient ran out of scripted responses");
            }
            Ok(responses.remove(0))
        }
    }

    const PRODUCTS_BODY: &str = r#"[{
        "id": 4,
        "title": "Handmade Fresh Table",
        "price": 687.0,
        "description": "A table",
        "images": [],
        "category": {"id": 5, "name": "Others", "image": "x"}
    }]"#;

    fn listing_response(total: Option<&str>) -> HttpResponse {
        let mut headers = HashMap::new();
        if let Some(total) = total {
            headers.insert("X-Total-Count".to_string(), total.to_string());
        }
        HttpResponse {
            status: 200,
            headers,
            body: Bytes::from(PRODUCTS_BODY.to_string()),
        }
    }

    fn status_response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(b"{}"),
        }
    }

    const BASE: &str = "https://api.example.com/api/v1";

    struct Harness {
        service: CatalogService,
        http: Arc<MockHttpClient>,
        event_bus: EventBus,
    }

    fn harness(responses: Vec<HttpResponse>) -> Harness {
        let http = Arc::new(MockHttpClient::new(responses));
        let cache = Arc::new(ListingCache::new(
            Duration::from_secs(300),
            Arc::new(SystemClock),
        ));
        let event_bus = EventBus::new(100);
        let service = CatalogService::new(
            http.clone() as Arc<dyn HttpClient>,
            BASE,
            cache,
            event_bus.clone(),
        );
        Harness {
            service,
            http,
            event_bus,
        }
    }

    #[tokio::test]
    async fn test_load_products_reads_total_header() {
        let h = harness(vec![listing_response(Some("50"))]);

        let page = h.service.load_products(0, 12).await.unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.total, 50);
        assert!(!page.from_cache);

        let requests = h.http.requests.lock().await;
        assert_eq!(
            requests[0].url,
            format!("{}/products?offset=0&limit=12", BASE)
        );
    }

    #[tokio::test]
    async fn test_missing_total_header_falls_back_to_page_size() {
        let h = harness(vec![listing_response(None)]);

        let page = h.service.load_products(0, 12).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_second_load_served_from_cache() {
        let h = harness(vec![listing_response(Some("50"))]);

        let first = h.service.load_products(0, 12).await.unwrap();
        assert!(!first.from_cache);

        let second = h.service.load_products(0, 12).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.total, 50);

        // One network request total
        assert_eq!(h.http.requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_different_pages_fetch_separately() {
        let h = harness(vec![
            listing_response(Some("50")),
            listing_response(Some("50")),
        ]);

        h.service.load_products(0, 12).await.unwrap();
        h.service.load_products(12, 12).await.unwrap();

        let requests = h.http.requests.lock().await;
        assert_eq!(requests.len(), 2);
        assert!(requests[1].url.contains("offset=12"));
    }

    #[tokio::test]
    async fn test_search_builds_title_query() {
        let h = harness(vec![listing_response(Some("3"))]);

        let page = h.service.search_products("table", 0, 12).await.unwrap();
        assert_eq!(page.total, 3);

        let requests = h.http.requests.lock().await;
        assert_eq!(
            requests[0].url,
            format!("{}/products?title=table&offset=0&limit=12", BASE)
        );
    }

    #[tokio::test]
    async fn test_blank_search_delegates_to_listing() {
        let h = harness(vec![listing_response(Some("50"))]);

        h.service.search_products("   ", 0, 12).await.unwrap();

        let requests = h.http.requests.lock().await;
        assert!(!requests[0].url.contains("title="));
    }

    #[tokio::test]
    async fn test_search_and_listing_cached_separately() {
        let h = harness(vec![
            listing_response(Some("50")),
            listing_response(Some("3")),
        ]);

        h.service.load_products(0, 12).await.unwrap();
        let search = h.service.search_products("table", 0, 12).await.unwrap();
        assert!(!search.from_cache);

        // Both now cached
        assert!(h.service.load_products(0, 12).await.unwrap().from_cache);
        assert!(h
            .service
            .search_products("table", 0, 12)
            .await
            .unwrap()
            .from_cache);
    }

    #[tokio::test]
    async fn test_load_emits_listing_loaded_event() {
        let h = harness(vec![listing_response(Some("50"))]);
        let mut receiver = h.event_bus.subscribe();

        h.service.load_products(0, 12).await.unwrap();

        match receiver.try_recv().unwrap() {
            CoreEvent::Catalog(CatalogEvent::ListingLoaded {
                count,
                total,
                offset,
                limit,
                from_cache,
            }) => {
                assert_eq!(count, 1);
                assert_eq!(total, 50);
                assert_eq!(offset, 0);
                assert_eq!(limit, 12);
                assert!(!from_cache);
            }
            other => panic!("Expected ListingLoaded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_load_sets_error_state_and_emits() {
        let h = harness(vec![status_response(503)]);
        let mut receiver = h.event_bus.subscribe();

        let result = h.service.load_products(0, 12).await;
        assert!(matches!(result, Err(ApiError::ServerError { status: 503 })));

        let state = h.service.state().await;
        assert!(state.error.is_some());

        match receiver.try_recv().unwrap() {
            CoreEvent::Catalog(CatalogEvent::CatalogError { message }) => {
                assert!(message.contains("503"));
            }
            other => panic!("Expected CatalogError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_successful_load_clears_error_state() {
        let h = harness(vec![status_response(503), listing_response(Some("50"))]);

        let _ = h.service.load_products(0, 12).await;
        assert!(h.service.state().await.error.is_some());

        h.service.load_products(0, 12).await.unwrap();
        let state = h.service.state().await;
        assert!(state.error.is_none());
        assert_eq!(state.total, 50);
    }

    #[tokio::test]
    async fn test_state_tracks_latest_load() {
        let h = harness(vec![
            listing_response(Some("50")),
            listing_response(Some("3")),
        ]);

        h.service.load_products(0, 12).await.unwrap();
        h.service.search_products("table", 0, 12).await.unwrap();

        let state = h.service.state().await;
        assert_eq!(state.query.as_deref(), Some("table"));
        assert_eq!(state.total, 3);
    }

    struct NullKeyValueStore;

    #[async_trait]
    impl bridge_traits::KeyValueStore for NullKeyValueStore {
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

    #[tokio::test]
    async fn test_from_config_builds_working_cache() {
        let http = Arc::new(MockHttpClient::new(vec![listing_response(Some("50"))]));
        let config = CoreConfig::builder()
            .api_base_url(BASE)
            .http_client(http.clone())
            .key_value_store(Arc::new(NullKeyValueStore))
            .build()
            .unwrap();
        let service = CatalogService::from_config(
            &config,
            http.clone() as Arc<dyn HttpClient>,
            EventBus::new(100),
        );

        let first = service.load_products(0, 12).await.unwrap();
        assert!(!first.from_cache);
        assert!(service.load_products(0, 12).await.unwrap().from_cache);

        let requests = http.requests.lock().await;
        assert!(requests[0].url.starts_with(BASE));
    }

    #[tokio::test]
    async fn test_get_product() {
        let h = harness(vec![HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(
                r#"{"id": 4, "title": "Handmade Fresh Table", "price": 687.0,
                    "description": "A table", "images": [],
                    "category": {"id": 5, "name": "Others", "image": "x"}}"#
                    .to_string(),
            ),
        }]);

        let product = h.service.get_product(4).await.unwrap();
        assert_eq!(product.id, 4);

        let requests = h.http.requests.lock().await;
        assert_eq!(requests[0].url, format!("{}/products/4", BASE));
    }

    #[tokio::test]
    async fn test_get_product_not_cached() {
        let h = harness(vec![status_response(200), status_response(200)]);

        // Both calls hit the network; bodies are bogus JSON objects so
        // deserialization fails, which is fine for counting requests
        let _ = h.service.get_product(4).await;
        let _ = h.service.get_product(4).await;

        assert_eq!(h.http.requests.lock().await.len(), 2);
    }
}
