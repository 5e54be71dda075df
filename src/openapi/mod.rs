use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Backend for a catalog storefront: a public product catalog, a session cart,
order and lead intake, plus an administrative surface for catalog and order
management.

## Sessions

The cart lives in a server-side session identified by a cookie. The cookie is
issued on the first request that changes the session; send it back on later
requests to keep the same cart.

## Payloads

Storefront endpoints (`/api/cart`, `/api/orders`, `/api/leads`) accept either a
JSON object or an `application/x-www-form-urlencoded` body.

## Error Handling

Errors share one body shape:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Phone or email is required",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Admin

`/api/admin` routes carry no authentication of their own and must be exposed
only behind an authenticating proxy.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Catalog", description = "Public catalog browsing"),
        (name = "Cart", description = "Session cart"),
        (name = "Orders", description = "Order intake"),
        (name = "Leads", description = "Callback and contact requests"),
        (name = "Admin", description = "Catalog, order and lead administration"),
    ),
    paths(
        // Catalog
        crate::handlers::catalog::get_catalog,
        crate::handlers::catalog::product_detail,
        crate::handlers::catalog::section_products,

        // Cart
        crate::handlers::cart::get_cart,
        crate::handlers::cart::upsert_cart_item,
        crate::handlers::cart::remove_cart_item,
        crate::handlers::cart::clear_cart,

        // Intake
        crate::handlers::orders::create_order,
        crate::handlers::leads::create_lead,

        // Admin
        crate::handlers::admin::set_active,
        crate::handlers::admin::delete_node,
        crate::handlers::admin::delete_nodes,
        crate::handlers::admin::create_product,
        crate::handlers::admin::update_product,
        crate::handlers::admin::duplicate_products,
        crate::handlers::admin::section_product_count,
        crate::handlers::admin::list_orders,
        crate::handlers::admin::get_order,
        crate::handlers::admin::update_order_status,
        crate::handlers::admin::list_leads,
        crate::handlers::admin::set_lead_processed,
    ),
    components(
        schemas(
            crate::services::cart::ProductRef,
            crate::entities::order::OrderStatus,
            crate::entities::lead::LeadType,
            crate::services::admin::CatalogKind,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
