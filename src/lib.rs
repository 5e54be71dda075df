//! Storefront API Library
//!
//! Catalog browsing, a session cart, order and lead intake, and the
//! administrative operations behind them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod session;
pub mod tracing;

use axum::{extract::DefaultBodyLimit, response::Json, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    handlers::AppServices,
    services::images::ImageResolver,
    session::SessionManager,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub sessions: SessionManager,
    pub services: AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        sessions: SessionManager,
        images: Arc<ImageResolver>,
    ) -> Self {
        let services = AppServices::new(db.clone(), images);
        Self {
            db,
            config,
            sessions,
            services,
        }
    }
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Handler result wrapped in the JSON envelope
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Everything mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Storefront
        .merge(handlers::catalog::catalog_routes())
        .nest("/cart", handlers::cart::cart_routes())
        .nest("/orders", handlers::orders::order_routes())
        .nest("/leads", handlers::leads::lead_routes())
        // Back office; expose only behind an authenticating proxy
        .nest("/admin", handlers::admin::admin_routes())
}

/// Full application router with health, docs and the shared middleware stack.
///
/// CORS is left to the caller because its policy depends on deployment.
pub fn build_router(state: AppState) -> Router {
    let timeout = state.config.request_timeout();
    let body_limit = state.config.max_body_size;
    let health = health::health_routes(state.db.clone());

    Router::<AppState>::new()
        .nest("/api", api_routes())
        .with_state(state)
        .nest("/health", health)
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        // Outermost so every span and error body sees the request id
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn message_is_omitted_unless_set() {
        let plain = serde_json::to_value(ApiResponse::success(1)).unwrap();
        assert!(plain.get("message").is_none());
        assert_eq!(plain["success"], true);

        let noted = serde_json::to_value(ApiResponse::success(1).with_message("saved")).unwrap();
        assert_eq!(noted["message"], "saved");
    }
}
