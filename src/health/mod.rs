/*!
 * # Health Check Module
 *
 * Endpoints for load balancers and orchestrators:
 *
 * - Basic health check (`/health`) - process is up, with version and uptime
 * - Readiness check (`/health/ready`) - the database answers a ping
 * - Version (`/health/version`) - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u128,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self {
            db_pool,
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    async fn check_database(&self) -> HealthDetail {
        let started = Instant::now();
        match crate::db::check_connection(&self.db_pool).await {
            Ok(()) => HealthDetail {
                status: HealthStatus::Up,
                message: None,
                latency_ms: started.elapsed().as_millis(),
            },
            Err(e) => {
                warn!("Database health check failed: {}", e);
                HealthDetail {
                    status: HealthStatus::Down,
                    message: Some("database unreachable".to_string()),
                    latency_ms: started.elapsed().as_millis(),
                }
            }
        }
    }
}

pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
    }))
}

/// Liveness: answers as long as the process is serving
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    Json(json!({
        "status": HealthStatus::Up,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.uptime(),
        "timestamp": Utc::now(),
    }))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Readiness {
    pub ready: bool,
    pub checks: HashMap<String, HealthDetail>,
    pub timestamp: DateTime<Utc>,
}

/// Readiness: 503 until the database answers a ping
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let mut checks = HashMap::new();
    checks.insert("database".to_string(), state.check_database().await);

    let ready = checks.values().all(|c| c.status == HealthStatus::Up);
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(Readiness {
            ready,
            checks,
            timestamp: Utc::now(),
        }),
    )
}

/// Health routes with their own state
pub fn health_routes(db_pool: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
        .with_state(Arc::new(HealthState::new(db_pool)))
}
