//! HTTP-facing errors.
//!
//! Business failures (unknown SKU, forced rejection) are not errors here;
//! they are successful responses carrying `status: "failed"`.

use crate::catalog::CatalogError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid or missing API key")]
    Unauthorized,

    #[error("{0}")]
    InvalidBody(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Catalog(e) = &self {
            error!(error = %e, "Catalog unavailable");
        }
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InvalidBody("missing field `sku`".to_string()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let catalog = ApiError::from(CatalogError::NotFound {
            path: PathBuf::from("golf.json"),
        });
        assert_eq!(catalog.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(catalog.to_string(), "Product data file not found: golf.json");
    }

    #[test]
    fn test_unauthorized_response() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
