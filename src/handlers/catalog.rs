use axum::{
    extract::State,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    errors::ServiceError,
    handlers::common::ApiQuery,
    services::catalog::{render_product_detail, CatalogTree},
    ApiResponse, ApiResult, AppState,
};

/// Query for the product popup. `id` carries the SKU on legacy pages.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductDetailQuery {
    /// Product SKU (preferred over `sku` when both are given)
    pub id: Option<String>,
    pub sku: Option<String>,
}

impl ProductDetailQuery {
    fn sku(&self) -> Option<&str> {
        [self.id.as_deref(), self.sku.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Raw pagination query; values are parsed by hand so bad input yields a 400 body.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SectionProductsQuery {
    pub section_id: Option<String>,
    /// Products already shown (default 0)
    pub offset: Option<String>,
    /// Page size (default from configuration, capped at the configured maximum)
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionProductsResponse {
    pub success: bool,
    pub html: String,
    pub has_more: bool,
    pub total_count: u64,
    pub loaded_count: u64,
}

fn parse_number(raw: Option<&str>, field: &str) -> Result<Option<u64>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse::<u64>().map(Some).map_err(|_| {
            ServiceError::validation(format!("{field} must be a non-negative integer"))
        }),
    }
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    summary = "Catalog tree",
    description = "Active categories with nested subcategories, sections, subsections and products, plus a flat list of all active products",
    responses(
        (status = 200, description = "Catalog loaded", body = ApiResponse<CatalogTree>),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Catalog"
)]
pub async fn get_catalog(
    State(state): State<AppState>,
) -> ApiResult<CatalogTree> {
    let tree = state.services.catalog.catalog_tree().await?;
    Ok(Json(ApiResponse::success(tree)))
}

#[utoipa::path(
    get,
    path = "/api/product/detail",
    summary = "Product popup",
    description = "HTML fragment describing one active product",
    params(ProductDetailQuery),
    responses(
        (status = 200, description = "Product fragment", body = String, content_type = "text/html"),
        (status = 404, description = "Product not found or inactive", body = crate::errors::ErrorResponse),
    ),
    tag = "Catalog"
)]
pub async fn product_detail(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductDetailQuery>,
) -> Result<Html<String>, ServiceError> {
    let sku = query
        .sku()
        .ok_or_else(|| ServiceError::not_found("Product not found"))?;
    let detail = state.services.catalog.product_detail(sku).await?;
    Ok(Html(render_product_detail(&detail)))
}

#[utoipa::path(
    get,
    path = "/api/section/products",
    summary = "Section page",
    description = "Next page of a section's products as an HTML fragment",
    params(SectionProductsQuery),
    responses(
        (status = 200, description = "Page rendered", body = SectionProductsResponse),
        (status = 400, description = "Section not specified or bad paging values", body = crate::errors::ErrorResponse),
        (status = 404, description = "Section not found or inactive", body = crate::errors::ErrorResponse),
    ),
    tag = "Catalog"
)]
pub async fn section_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SectionProductsQuery>,
) -> Result<Json<SectionProductsResponse>, ServiceError> {
    let section_id = query
        .section_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServiceError::validation("Section is not specified"))?
        .parse::<i32>()
        .map_err(|_| ServiceError::validation("Invalid section id"))?;

    let offset = parse_number(query.offset.as_deref(), "offset")?.unwrap_or(0);
    let limit = parse_number(query.limit.as_deref(), "limit")?
        .unwrap_or(state.config.section_page_size)
        .min(state.config.max_section_page_size);
    if limit == 0 {
        return Err(ServiceError::validation("limit must be greater than zero"));
    }

    let page = state
        .services
        .catalog
        .section_products(section_id, offset, limit)
        .await?;

    Ok(Json(SectionProductsResponse {
        success: true,
        html: page.html,
        has_more: page.has_more,
        total_count: page.total_count,
        loaded_count: page.loaded_count,
    }))
}

/// Storefront catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(get_catalog))
        .route("/product/detail", get(product_detail))
        .route("/section/products", get(section_products))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parameter_wins_over_sku() {
        let q = ProductDetailQuery {
            id: Some("A-1".into()),
            sku: Some("B-2".into()),
        };
        assert_eq!(q.sku(), Some("A-1"));

        let q = ProductDetailQuery {
            id: Some("  ".into()),
            sku: Some("B-2".into()),
        };
        assert_eq!(q.sku(), Some("B-2"));
        assert_eq!(ProductDetailQuery::default().sku(), None);
    }

    #[test]
    fn paging_numbers_must_be_non_negative_integers() {
        assert_eq!(parse_number(None, "offset").unwrap(), None);
        assert_eq!(parse_number(Some(" 18 "), "offset").unwrap(), Some(18));
        assert!(parse_number(Some("-1"), "offset").is_err());
        assert!(parse_number(Some("ten"), "limit").is_err());
    }
}
