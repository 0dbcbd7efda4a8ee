use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use magboard_core::storage::GatewayError;
use serde_json::json;
use thiserror::Error;

/// Error type for HTTP handlers, rendered as `{ "error": ..., "details": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `campaign` query parameter is missing or blank.
    #[error("Campaign required")]
    CampaignRequired,

    /// The request body could not be used.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The store failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::CampaignRequired => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Campaign required" }),
            ),
            ApiError::BadRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Bad request", "details": details }),
            ),
            ApiError::Gateway(GatewayError::InvalidCampaign(name)) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid campaign", "details": name }),
            ),
            ApiError::Gateway(err) => {
                tracing::error!(error = %err, "Whiteboard store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to access whiteboard", "details": err.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
