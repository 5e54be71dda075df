//! Operator endpoints for catalog content, orders and leads.
//!
//! These routes carry no authentication of their own; mount them only behind
//! a proxy that restricts access to staff.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

use crate::{
    entities::{lead, order::OrderStatus},
    errors::ServiceError,
    handlers::common::{ApiJson, ApiPath, ApiQuery},
    services::{
        admin::{BulkDeleteReport, CatalogKind, SaveProductInput},
        catalog::ProductCard,
        orders::{OrderDetail, OrderSummary},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub ids: Vec<i32>,
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IdsRequest {
    pub ids: Vec<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatedCount {
    pub updated: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductCount {
    pub section_id: i32,
    pub active_products: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetProcessedRequest {
    pub processed: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderFilter {
    /// `new`, `in_progress`, `done` or `cancelled`
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeadFilter {
    pub processed: Option<bool>,
}

/// Lead as shown to operators.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadView {
    pub id: i32,
    pub lead_type: lead::LeadType,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub meta: Option<serde_json::Value>,
    pub processed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<lead::Model> for LeadView {
    fn from(lead: lead::Model) -> Self {
        Self {
            id: lead.id,
            lead_type: lead.lead_type,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            message: lead.message,
            meta: lead.meta,
            processed: lead.processed,
            created_at: lead.created_at,
        }
    }
}

fn parse_status_filter(value: Option<&str>) -> Result<Option<OrderStatus>, ServiceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => OrderStatus::from_str(&raw.to_ascii_lowercase())
            .map(Some)
            .map_err(|_| ServiceError::validation(format!("Unknown order status: {raw}"))),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/catalog/{kind}/active",
    summary = "Activate or deactivate catalog nodes",
    params(("kind" = CatalogKind, Path, description = "category, subcategory, section or product")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Rows updated", body = ApiResponse<UpdatedCount>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn set_active(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<CatalogKind>,
    ApiJson(request): ApiJson<SetActiveRequest>,
) -> ApiResult<UpdatedCount> {
    let updated = state
        .services
        .admin
        .set_active(kind, request.ids, request.active)
        .await?;
    Ok(Json(ApiResponse::success(UpdatedCount { updated })))
}

#[utoipa::path(
    delete,
    path = "/api/admin/catalog/{kind}/items/{id}",
    summary = "Delete a catalog node",
    params(
        ("kind" = CatalogKind, Path, description = "category, subcategory, section or product"),
        ("id" = i32, Path, description = "Row id"),
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Dependent rows block the delete", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn delete_node(
    State(state): State<AppState>,
    ApiPath((kind, id)): ApiPath<(CatalogKind, i32)>,
) -> Result<StatusCode, ServiceError> {
    state.services.admin.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/catalog/{kind}/delete",
    summary = "Delete several catalog nodes",
    description = "Deletes every node that is free to go; the rest are listed in `errors`",
    params(("kind" = CatalogKind, Path, description = "category, subcategory, section or product")),
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Bulk delete report", body = ApiResponse<BulkDeleteReport>),
    ),
    tag = "Admin"
)]
pub async fn delete_nodes(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<CatalogKind>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> ApiResult<BulkDeleteReport> {
    let report = state.services.admin.delete_bulk(kind, request.ids).await?;
    let message = (!report.errors.is_empty())
        .then(|| format!("{} item(s) could not be deleted", report.errors.len()));
    let mut response = ApiResponse::success(report);
    if let Some(message) = message {
        response = response.with_message(message);
    }
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    summary = "Create a product",
    request_body = SaveProductInput,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductCard>),
        (status = 400, description = "Invalid product", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SaveProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<ProductCard>>), ServiceError> {
    let product = state.services.admin.save_product(None, input).await?;
    let card = state.services.catalog.product_card(&product);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(card))))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    summary = "Update a product",
    params(("id" = i32, Path, description = "Product id")),
    request_body = SaveProductInput,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductCard>),
        (status = 400, description = "Invalid product", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<SaveProductInput>,
) -> ApiResult<ProductCard> {
    let product = state.services.admin.save_product(Some(id), input).await?;
    Ok(Json(ApiResponse::success(
        state.services.catalog.product_card(&product),
    )))
}

#[utoipa::path(
    post,
    path = "/api/admin/product-copies",
    summary = "Duplicate products",
    description = "Copies get `{sku}_copy_{n}`, `{slug}-copy-{n}` and a `(copy)` title suffix",
    request_body = IdsRequest,
    responses(
        (status = 201, description = "Copies created", body = ApiResponse<Vec<ProductCard>>),
    ),
    tag = "Admin"
)]
pub async fn duplicate_products(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ProductCard>>>), ServiceError> {
    let copies = state.services.admin.duplicate_products(request.ids).await?;
    let cards = copies
        .iter()
        .map(|p| state.services.catalog.product_card(p))
        .collect();
    Ok((StatusCode::CREATED, Json(ApiResponse::success(cards))))
}

#[utoipa::path(
    get,
    path = "/api/admin/sections/{id}/product-count",
    summary = "Active products in a section",
    params(("id" = i32, Path, description = "Section id")),
    responses((status = 200, description = "Count", body = ApiResponse<ProductCount>)),
    tag = "Admin"
)]
pub async fn section_product_count(
    State(state): State<AppState>,
    ApiPath(section_id): ApiPath<i32>,
) -> ApiResult<ProductCount> {
    let active_products = state.services.admin.section_product_count(section_id).await?;
    Ok(Json(ApiResponse::success(ProductCount {
        section_id,
        active_products,
    })))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    summary = "List orders",
    description = "Newest first, with totals computed from items",
    params(OrderFilter),
    responses(
        (status = 200, description = "Orders", body = ApiResponse<Vec<OrderSummary>>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<Vec<OrderSummary>> {
    let status = parse_status_filter(filter.status.as_deref())?;
    let orders = state.services.orders.list_orders(status).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<OrderDetail> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/status",
    summary = "Change order status",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(request): ApiJson<UpdateOrderStatusRequest>,
) -> ApiResult<OrderDetail> {
    let order = state
        .services
        .orders
        .update_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    get,
    path = "/api/admin/leads",
    summary = "List leads",
    description = "Unprocessed first, newest first",
    params(LeadFilter),
    responses((status = 200, description = "Leads", body = ApiResponse<Vec<LeadView>>)),
    tag = "Admin"
)]
pub async fn list_leads(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<LeadFilter>,
) -> ApiResult<Vec<LeadView>> {
    let leads = state.services.leads.list_leads(filter.processed).await?;
    Ok(Json(ApiResponse::success(
        leads.into_iter().map(LeadView::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/admin/leads/{id}/processed",
    summary = "Mark a lead processed",
    params(("id" = i32, Path, description = "Lead id")),
    request_body = SetProcessedRequest,
    responses(
        (status = 200, description = "Lead updated", body = ApiResponse<LeadView>),
        (status = 404, description = "Lead not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn set_lead_processed(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(request): ApiJson<SetProcessedRequest>,
) -> ApiResult<LeadView> {
    let lead = state
        .services
        .leads
        .set_processed(id, request.processed)
        .await?;
    Ok(Json(ApiResponse::success(LeadView::from(lead))))
}

/// Admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog/:kind/active", post(set_active))
        .route("/catalog/:kind/delete", post(delete_nodes))
        .route("/catalog/:kind/items/:id", delete(delete_node))
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product))
        .route("/product-copies", post(duplicate_products))
        .route("/sections/:id/product-count", get(section_product_count))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", post(update_order_status))
        .route("/leads", get(list_leads))
        .route("/leads/:id/processed", post(set_lead_processed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_is_case_insensitive_and_optional() {
        assert_eq!(parse_status_filter(None).unwrap(), None);
        assert_eq!(parse_status_filter(Some(" ")).unwrap(), None);
        assert_eq!(
            parse_status_filter(Some("IN_PROGRESS")).unwrap(),
            Some(OrderStatus::InProgress)
        );
        assert!(matches!(
            parse_status_filter(Some("shipped")),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
