//! Virtual Product Mock Server
//!
//! A stand-in for an external virtual product purchasing API, used in
//! development and integration tests. It serves a static catalog and
//! simulates purchases.
//!
//! # Features
//!
//! - **API key auth**: every route requires `X-API-Key`
//! - **Catalog**: `GET /products` returns the loaded JSON document verbatim
//! - **Idempotent purchases**: `POST /purchase` caches results by `transaction_id`
//! - **Latency Simulation**: fixed or random delay on every route except `/ping`
//! - **Failure Injection**: `FAIL_PURCHASE=true` rejects every new purchase
//!
//! # Example Configuration
//!
//! ```yaml
//! api_key: test-api-key
//! data_file: examples/golf.json
//! port: 8099
//! fail_purchase: false
//! delay:
//!   fixed_ms: 250
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod service;

pub use catalog::{build_index, load_catalog, Catalog, CatalogError};
pub use config::MockServerConfig;
pub use service::{MockApiService, PurchaseRequest, PurchaseResult, PurchaseStatus};
