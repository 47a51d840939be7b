//! Purchase processing for the mock API.

use crate::catalog::{CatalogError, CatalogStore, IndexedCatalog};
use crate::config::MockServerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

/// Body of `POST /purchase`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub sku: String,
    pub customer_identifier: String,
    pub transaction_id: String,
    pub amount_paid_in_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Confirmed,
    Failed,
}

/// Outcome of a purchase, replayed verbatim for repeated transaction ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub confirmation_id: String,
    pub status: PurchaseStatus,
    pub message: String,
}

impl PurchaseResult {
    fn confirmed(confirmation_id: String) -> Self {
        Self {
            confirmation_id,
            status: PurchaseStatus::Confirmed,
            message: "Booking confirmed".to_string(),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            confirmation_id: String::new(),
            status: PurchaseStatus::Failed,
            message,
        }
    }
}

/// Counters for purchase outcomes.
#[derive(Debug, Default)]
pub struct PurchaseStats {
    confirmed: AtomicU64,
    failed: AtomicU64,
    replayed: AtomicU64,
}

impl PurchaseStats {
    pub fn confirmed(&self) -> u64 {
        self.confirmed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn replayed(&self) -> u64 {
        self.replayed.load(Ordering::Relaxed)
    }
}

type TransactionSlot = Arc<OnceCell<PurchaseResult>>;

/// Mock API service
///
/// Owns the configuration, the catalog and the transaction cache. Each
/// instance is independent, so tests can run several side by side.
pub struct MockApiService {
    config: MockServerConfig,
    catalog: CatalogStore,
    /// One slot per transaction id; a slot is filled at most once.
    transactions: RwLock<HashMap<String, TransactionSlot>>,
    stats: PurchaseStats,
}

impl MockApiService {
    /// Create a service that loads the catalog from `config.data_file` on first use.
    pub fn new(config: MockServerConfig) -> Self {
        let catalog = CatalogStore::new(config.data_file.clone());
        Self::with_catalog_store(config, catalog)
    }

    /// Create a service backed by an existing catalog store.
    pub fn with_catalog_store(config: MockServerConfig, catalog: CatalogStore) -> Self {
        info!(
            data_file = %catalog.path().display(),
            delay_ms = config.delay.fixed_ms,
            fail_purchase = config.fail_purchase,
            "Mock API service initialized"
        );

        Self {
            config,
            catalog,
            transactions: RwLock::new(HashMap::new()),
            stats: PurchaseStats::default(),
        }
    }

    pub fn config(&self) -> &MockServerConfig {
        &self.config
    }

    pub fn stats(&self) -> &PurchaseStats {
        &self.stats
    }

    /// The loaded catalog, reading the data file if this is the first access.
    pub async fn catalog(&self) -> Result<Arc<IndexedCatalog>, CatalogError> {
        self.catalog.get().await
    }

    /// Number of transaction ids with a recorded result.
    pub async fn cached_transactions(&self) -> usize {
        self.transactions
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Process a purchase.
    ///
    /// The first request for a transaction id decides the result; every later
    /// or concurrent request with that id gets the same result back.
    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<PurchaseResult, CatalogError> {
        info!(
            sku = %request.sku,
            customer = %request.customer_identifier,
            txn = %request.transaction_id,
            amount = request.amount_paid_in_cents,
            "Purchase request"
        );

        let slot = self.slot(&request.transaction_id).await;

        let mut replayed = true;
        let result = slot
            .get_or_try_init(|| {
                replayed = false;
                self.decide(request)
            })
            .await?
            .clone();

        if replayed {
            self.stats.replayed.fetch_add(1, Ordering::Relaxed);
            info!(
                txn = %request.transaction_id,
                "Returning cached result for transaction_id"
            );
        }

        Ok(result)
    }

    async fn slot(&self, transaction_id: &str) -> TransactionSlot {
        if let Some(slot) = self.transactions.read().await.get(transaction_id) {
            return slot.clone();
        }
        self.transactions
            .write()
            .await
            .entry(transaction_id.to_string())
            .or_default()
            .clone()
    }

    async fn decide(&self, request: &PurchaseRequest) -> Result<PurchaseResult, CatalogError> {
        if self.config.fail_purchase {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            info!(txn = %request.transaction_id, "Purchase rejected (fail_purchase enabled)");
            return Ok(PurchaseResult::failed("Purchase rejected".to_string()));
        }

        let catalog = self.catalog().await?;
        if !catalog.contains_sku(&request.sku) {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            info!(
                sku = %request.sku,
                txn = %request.transaction_id,
                "Purchase failed: unknown SKU"
            );
            return Ok(PurchaseResult::failed(format!(
                "Unknown SKU: {}",
                request.sku
            )));
        }

        let confirmation_id = format!("MOCK-{}", uuid::Uuid::new_v4());
        self.stats.confirmed.fetch_add(1, Ordering::Relaxed);
        info!(
            confirmation_id = %confirmation_id,
            txn = %request.transaction_id,
            "Purchase confirmed"
        );
        Ok(PurchaseResult::confirmed(confirmation_id))
    }
}
