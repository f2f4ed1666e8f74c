//! Catalog Cache: the session's in-memory mirror of the product collection
//!
//! # Design
//!
//! The cache holds an immutable `Arc<[Product]>` snapshot behind a
//! `tokio::sync::watch` channel. Every refresh builds a complete new snapshot
//! and swaps it in, so readers never observe a half-updated catalog. Archived
//! products are dropped while building the snapshot.
//!
//! The snapshot is refreshed:
//! - explicitly via [`CatalogCache::refresh`] (on load, after each commit)
//! - on every remote change notification, by the task started with
//!   [`CatalogCache::spawn_watcher`]
//!
//! The cache is advisory only. Stock shown here may be stale; the stock
//! validator always re-reads the store before a commit.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::{children, DataStore, PRODUCTS};
use crate::types::{Product, StoreError};

/// Category filter value that matches every product
pub const ALL_CATEGORIES: &str = "all";

/// Shared, wholesale-replaced snapshot of non-archived products
///
/// Cloning a `CatalogCache` yields another handle to the same snapshot.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    snapshot: Arc<watch::Sender<Arc<[Product]>>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    /// Create an empty cache
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Arc::from(Vec::<Product>::new()));
        Self {
            snapshot: Arc::new(sender),
        }
    }

    /// Replace the whole catalog with `products`, dropping archived ones
    pub fn replace(&self, products: Vec<Product>) {
        let visible: Arc<[Product]> = products.into_iter().filter(|p| !p.archived).collect();
        debug!(products = visible.len(), "catalog replaced");
        self.snapshot.send_replace(visible);
    }

    /// Replace the catalog from a full `products` collection snapshot
    pub fn replace_from_snapshot(&self, collection: &Value) {
        let products = children(collection)
            .map(|(key, doc)| Product::from_json(key, doc))
            .collect();
        self.replace(products);
    }

    /// Reload the catalog from the store
    ///
    /// # Returns
    ///
    /// The number of products now visible.
    pub async fn refresh<S: DataStore>(&self, store: &S) -> Result<usize, StoreError> {
        let collection = store.get(PRODUCTS).await?.unwrap_or(Value::Null);
        self.replace_from_snapshot(&collection);
        Ok(self.len())
    }

    /// Keep the catalog in sync with remote changes
    ///
    /// Spawns a task that replaces the snapshot every time the store reports
    /// a change to the product collection. The task ends when the store drops
    /// the channel; abort the returned handle to stop it earlier.
    pub fn spawn_watcher<S: DataStore>(&self, store: &S) -> Result<JoinHandle<()>, StoreError> {
        let mut changes = store.subscribe(PRODUCTS)?;
        let cache = self.clone();

        Ok(tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let collection = changes.borrow_and_update().clone();
                cache.replace_from_snapshot(&collection);
            }
            info!("product change feed closed");
        }))
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<[Product]> {
        self.snapshot.borrow().clone()
    }

    /// Receive a notification every time the snapshot is replaced
    pub fn subscribe(&self) -> watch::Receiver<Arc<[Product]>> {
        self.snapshot.subscribe()
    }

    /// Look up a visible product by key
    pub fn get(&self, key: &str) -> Option<Product> {
        self.snapshot.borrow().iter().find(|p| p.key == key).cloned()
    }

    /// Number of visible products
    pub fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    /// Whether no product is visible
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct non-empty categories, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .snapshot
            .borrow()
            .iter()
            .filter(|p| !p.category.is_empty())
            .map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Products matching a search term and a category
    ///
    /// The term matches case-insensitively against name, category,
    /// description and the price text; an empty term matches everything. A
    /// category of `None` or [`ALL_CATEGORIES`] matches every category,
    /// anything else must equal the product's category exactly.
    pub fn search(&self, term: &str, category: Option<&str>) -> Vec<Product> {
        let term = term.trim().to_lowercase();
        let category = category.filter(|c| *c != ALL_CATEGORIES);

        self.snapshot
            .borrow()
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .filter(|p| {
                term.is_empty()
                    || p.name.to_lowercase().contains(&term)
                    || p.category.to_lowercase().contains(&term)
                    || p.description.to_lowercase().contains(&term)
                    || p.price.to_string().contains(&term)
            })
            .cloned()
            .collect()
    }
}

/// One page of a product listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number actually shown
    pub page: usize,
    /// Total number of pages, at least 1
    pub total_pages: usize,
    /// Total number of items across all pages
    pub total_items: usize,
}

impl<T: Clone> Page<T> {
    /// Slice `items` into pages of `per_page` and return page `page`
    ///
    /// Pages are 1-based; page 0 reads as page 1 and pages past the end
    /// clamp to the last page. `per_page == 0` falls back to
    /// `default_per_page`.
    pub fn of(items: &[T], page: usize, per_page: usize, default_per_page: usize) -> Self {
        let per_page = if per_page == 0 {
            default_per_page.max(1)
        } else {
            per_page
        };
        let total_pages = items.len().div_ceil(per_page).max(1);
        let page = page.clamp(1, total_pages);
        let start = (page - 1) * per_page;
        let end = (start + per_page).min(items.len());

        Page {
            items: items.get(start..end).unwrap_or_default().to_vec(),
            page,
            total_pages,
            total_items: items.len(),
        }
    }
}
