use serde::{Deserialize, Serialize};

/// A product category as returned by the store API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub images: Vec<String>,
    pub category: Category,
}

/// One page of listing results handed back to callers.
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub products: Vec<Product>,
    /// Total matching products across all pages
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
    /// Whether this page was served from cache
    pub from_cache: bool,
}

/// Snapshot of the most recently completed listing load.
///
/// Concurrent loads race by design: whichever completes last owns the state.
/// The per-load [`ListingPage`] return value is the consistent view; this
/// snapshot exists for observers that only want "what is on screen now".
#[derive(Debug, Clone, Default)]
pub struct ListingState {
    pub products: Vec<Product>,
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
    /// Search term the snapshot belongs to, `None` for plain listings
    pub query: Option<String>,
    /// User-facing message from the last failed load, cleared on success
    pub error: Option<String>,
}
