use axum::{extract::State, response::Response, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    handlers::common::{respond_with_session, CurrentSession, Payload},
    services::cart::{CartItemInput, CartSummary},
    AppState,
};

/// Cart state with the storefront's `success` flag.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    pub success: bool,
    #[serde(flatten)]
    pub cart: CartSummary,
}

impl From<CartSummary> for CartResponse {
    fn from(cart: CartSummary) -> Self {
        Self {
            success: true,
            cart,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveCartItemRequest {
    #[schema(value_type = Object, example = 7)]
    pub product_id: Option<serde_json::Value>,
}

#[utoipa::path(
    get,
    path = "/api/cart",
    summary = "Get cart",
    description = "Current session cart with re-computed totals",
    responses(
        (status = 200, description = "Cart retrieved", body = CartResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ServiceError> {
    let summary = state.services.cart.summary(&session);
    respond_with_session(&state, session, Json(CartResponse::from(summary))).await
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    summary = "Add or update a cart line",
    description = "Adds `quantity` to the product's line, or sets it when `replace` is true. A quantity of zero or less removes the line.",
    request_body = CartItemInput,
    responses(
        (status = 200, description = "Cart updated", body = CartResponse),
        (status = 400, description = "Product not specified or malformed body", body = crate::errors::ErrorResponse),
    ),
    tag = "Cart"
)]
pub async fn upsert_cart_item(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Payload(payload): Payload,
) -> Result<Response, ServiceError> {
    let summary = state
        .services
        .cart
        .upsert_item(&mut session, CartItemInput::from_payload(&payload))?;
    respond_with_session(&state, session, Json(CartResponse::from(summary))).await
}

#[utoipa::path(
    post,
    path = "/api/cart/items/remove",
    summary = "Remove a cart line",
    request_body = RemoveCartItemRequest,
    responses(
        (status = 200, description = "Line removed (or was already absent)", body = CartResponse),
        (status = 400, description = "Product not specified", body = crate::errors::ErrorResponse),
    ),
    tag = "Cart"
)]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
    Payload(payload): Payload,
) -> Result<Response, ServiceError> {
    let summary = state
        .services
        .cart
        .remove_item(&mut session, payload.get("product_id"))?;
    respond_with_session(&state, session, Json(CartResponse::from(summary))).await
}

#[utoipa::path(
    post,
    path = "/api/cart/clear",
    summary = "Empty the cart",
    responses(
        (status = 200, description = "Cart emptied", body = CartResponse),
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    CurrentSession(mut session): CurrentSession,
) -> Result<Response, ServiceError> {
    let summary = state.services.cart.clear(&mut session)?;
    respond_with_session(&state, session, Json(CartResponse::from(summary))).await
}

/// Cart routes
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(upsert_cart_item))
        .route("/items/remove", post(remove_cart_item))
        .route("/clear", post(clear_cart))
}
