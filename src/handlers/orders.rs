use axum::{extract::State, http::StatusCode, response::Response, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    handlers::common::{respond_with_session, CurrentSession, Payload},
    services::orders::OrderSubmission,
    AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderCreatedResponse {
    pub success: bool,
    #[schema(example = "Order received. We will contact you to confirm it.")]
    pub message: String,
    pub order_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct CreateOrderRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub comment: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/orders",
    summary = "Place an order",
    description = "Turns the session cart into an order. The cart is emptied once the order is stored.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderCreatedResponse),
        (status = 400, description = "Missing name or contact, empty cart, or malformed body", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Payload(payload): Payload,
) -> Result<Response, ServiceError> {
    let order = state
        .services
        .orders
        .place_order(&mut session, OrderSubmission::from_payload(&payload))
        .await?;

    let body = OrderCreatedResponse {
        success: true,
        message: "Order received. We will contact you to confirm it.".to_string(),
        order_id: order.id,
    };
    respond_with_session(&state, session, (StatusCode::CREATED, Json(body))).await
}

/// Order intake routes
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", post(create_order))
}
