use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::session::SessionError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint.
///
/// Storefront scripts only look at `success` and `message`; the remaining
/// fields are for operators correlating logs.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "error": "Bad Request",
    "message": "Name is required",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Bad Request")]
    pub error: String,
    /// Message safe to show to the shopper
    #[schema(example = "Name is required")]
    pub message: String,
    /// Correlates the response with server logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A delete was refused because dependent rows still reference the target.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Surfaces the first attached message (fields in name order), so clients
/// see e.g. "Name is required" rather than the validator's debug listing.
impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = err.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        let message = fields
            .iter()
            .flat_map(|(_, errors)| errors.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()));
        ServiceError::ValidationError(message.unwrap_or_else(|| err.to_string()))
    }
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::IntegrityError(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::SessionError(_)
            | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Database and internal failures collapse to a fixed message.
    pub fn response_message(&self) -> String {
        match self {
            Self::NotFound(msg) | Self::ValidationError(msg) | Self::IntegrityError(msg) => {
                msg.clone()
            }
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SessionError(_) | Self::InternalError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("Product not found".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!payload.success);
        assert_eq!(payload.message, "Product not found");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::IntegrityError("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("password=hunter2".into()))
                .response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("redis exploded".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::validation("Name is required").response_message(),
            "Name is required"
        );
    }
}
