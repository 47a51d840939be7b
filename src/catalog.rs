//! Product catalog loading and SKU indexing.
//!
//! The catalog document is kept as raw JSON so `/products` can return it
//! exactly as it was written on disk.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Errors raised while loading the catalog document.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product data file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A loaded catalog document (categories → variants).
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    document: Value,
}

impl Catalog {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    /// The document exactly as loaded.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Variants in document order, across all categories.
    pub fn variants(&self) -> impl Iterator<Item = &Value> {
        self.document
            .get("categories")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|category| category.get("variants").and_then(Value::as_array))
            .flatten()
    }
}

/// Read and parse the catalog at `path`.
pub async fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let content = tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CatalogError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            CatalogError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let document = serde_json::from_slice(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Catalog::new(document))
}

/// Map every variant's SKU to its record. Later duplicates win.
pub fn build_index(catalog: &Catalog) -> HashMap<String, Value> {
    let mut index = HashMap::new();
    for variant in catalog.variants() {
        match variant.get("sku").and_then(Value::as_str) {
            Some(sku) => {
                index.insert(sku.to_string(), variant.clone());
            }
            None => warn!(variant = %variant, "Skipping variant without a string sku"),
        }
    }
    index
}

/// A catalog together with its SKU index.
#[derive(Debug)]
pub struct IndexedCatalog {
    pub catalog: Catalog,
    pub skus: HashMap<String, Value>,
}

impl IndexedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        let skus = build_index(&catalog);
        Self { catalog, skus }
    }

    pub fn contains_sku(&self, sku: &str) -> bool {
        self.skus.contains_key(sku)
    }
}

/// Loads the catalog on first use and keeps it for the process lifetime.
///
/// A failed load leaves the store empty, so the next caller retries.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    loaded: OnceCell<Arc<IndexedCatalog>>,
}

impl CatalogStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            loaded: OnceCell::new(),
        }
    }

    /// A store that is already populated and never touches the filesystem.
    pub fn preloaded(catalog: Catalog) -> Self {
        Self {
            path: PathBuf::new(),
            loaded: OnceCell::new_with(Some(Arc::new(IndexedCatalog::new(catalog)))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Result<Arc<IndexedCatalog>, CatalogError> {
        self.loaded
            .get_or_try_init(|| async {
                let catalog = load_catalog(&self.path).await?;
                let indexed = IndexedCatalog::new(catalog);
                info!(
                    path = %self.path.display(),
                    skus = indexed.skus.len(),
                    "Catalog loaded"
                );
                Ok::<_, CatalogError>(Arc::new(indexed))
            })
            .await
            .cloned()
    }
}
