//! HTTP routes for the mock API.

use crate::error::{ApiError, ApiResult};
use crate::service::{MockApiService, PurchaseRequest, PurchaseResult};
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

/// Header carrying the client's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path exempt from the artificial delay so readiness probes answer immediately.
const PING_PATH: &str = "/ping";

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_products(
    State(service): State<Arc<MockApiService>>,
) -> ApiResult<Json<serde_json::Value>> {
    let catalog = service.catalog().await?;
    Ok(Json(catalog.catalog.document().clone()))
}

async fn purchase(
    State(service): State<Arc<MockApiService>>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> ApiResult<Json<PurchaseResult>> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
    let result = service.purchase(&request).await?;
    Ok(Json(result))
}

/// Sleep for the configured delay before handling anything except `/ping`.
async fn delay_middleware(
    State(service): State<Arc<MockApiService>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() != PING_PATH {
        let delay_ms = service.config().delay.calculate();
        if delay_ms > 0 {
            debug!(path = %request.uri().path(), delay_ms, "Applying delay");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
    next.run(request).await
}

/// Reject requests whose `X-API-Key` is missing or differs from the configured key.
async fn auth_middleware(
    State(service): State<Arc<MockApiService>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.as_bytes());

    if provided != Some(service.config().api_key.as_bytes()) {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request with invalid or missing API key"
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

pub fn router(service: Arc<MockApiService>) -> Router {
    Router::new()
        .route(PING_PATH, get(ping))
        .route("/products", get(list_products))
        .route("/purchase", post(purchase))
        // auth runs inside the delay
        .route_layer(middleware::from_fn_with_state(
            service.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            service.clone(),
            delay_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
