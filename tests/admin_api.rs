//! Back-office endpoints: catalog maintenance, order handling and lead triage.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use storefront_api::entities::{order, order_item, product};

async fn order_referencing(app: &TestApp, product_id: i32) {
    let order = order::ActiveModel {
        customer_name: Set("Ann".into()),
        customer_email: Set(String::new()),
        customer_phone: Set("123".into()),
        status: Set(order::OrderStatus::New),
        comment: Set(String::new()),
        ..Default::default()
    }
    .insert(app.state.db.as_ref())
    .await
    .unwrap();
    order_item::ActiveModel {
        order_id: Set(order.id),
        product_id: Set(Some(product_id)),
        product_title: Set("Used".into()),
        product_sku: Set("USED".into()),
        quantity: Set(1),
        price: Set(dec!(1)),
        ..Default::default()
    }
    .insert(app.state.db.as_ref())
    .await
    .unwrap();
}

#[tokio::test]
async fn categories_with_children_cannot_be_deleted() {
    let app = TestApp::new().await;
    let cables = app.seed_category("Cables", 0, true).await;
    app.seed_subcategory(cables.id, "Power", 0, true).await;
    let empty = app.seed_category("Empty", 0, true).await;

    let response = app
        .delete(&format!("/api/admin/catalog/category/items/{}", cables.id))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    let message = response.json()["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Cannot delete category \"Cables\""), "{message}");
    assert!(message.contains("1 subcategories"));

    let response = app
        .delete(&format!("/api/admin/catalog/category/items/{}", empty.id))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.delete("/api/admin/catalog/category/items/4242").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_delete_reports_refusals() {
    let app = TestApp::new().await;
    let section = app.seed_active_section("Relays").await;
    let used = app.seed_product(section.id, "R-1", "Used relay", dec!(5), 0, true).await;
    let free = app.seed_product(section.id, "R-2", "Free relay", dec!(5), 0, true).await;
    order_referencing(&app, used.id).await;

    let response = app
        .post_json(
            "/api/admin/catalog/product/delete",
            json!({"ids": [used.id, free.id, 9999]}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["data"]["deleted"], 1);
    let errors = body["data"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].as_str().unwrap().contains("used in 1 order items"));
    assert_eq!(body["message"], "2 item(s) could not be deleted");

    assert!(product::Entity::find_by_id(free.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .is_none());
    assert!(product::Entity::find_by_id(used.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn deleting_a_section_keeps_its_products() {
    let app = TestApp::new().await;
    let section = app.seed_active_section("Fuses").await;
    app.seed_subsection(section.id, "Glass", true).await;
    let fuse = app.seed_product(section.id, "F-1", "Fuse", dec!(2), 0, true).await;

    let response = app
        .delete(&format!("/api/admin/catalog/section/items/{}", section.id))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let orphan = product::Entity::find_by_id(fuse.id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .expect("product survives");
    assert_eq!(orphan.section_id, None);
}

#[tokio::test]
async fn toggling_products_hides_them_from_the_storefront() {
    let app = TestApp::new().await;
    let section = app.seed_active_section("Lamps").await;
    let a = app.seed_product(section.id, "L-1", "Lamp one", dec!(5), 0, true).await;
    let b = app.seed_product(section.id, "L-2", "Lamp two", dec!(5), 0, true).await;

    let body = app
        .post_json(
            "/api/admin/catalog/product/active",
            json!({"ids": [a.id, b.id], "active": false}),
        )
        .await
        .json();
    assert_eq!(body["data"]["updated"], 2);

    let count = app
        .get(&format!("/api/admin/sections/{}/product-count", section.id))
        .await
        .json();
    assert_eq!(count["data"]["active_products"], 0);

    let response = app.get("/api/product/detail?sku=L-1").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_a_product_applies_the_special_price() {
    let app = TestApp::new().await;
    let section = app.seed_active_section("Meters").await;

    let response = app
        .post_json(
            "/api/admin/products",
            json!({
                "section_id": section.id,
                "title": "Meter",
                "slug": "meter",
                "sku": "M-1",
                "price": "150.00",
                "price_special": "120.00",
                "stock": 4
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let card = response.json()["data"].clone();
    assert_eq!(card["price"], "120.00");
    let id = card["id"].as_i64().unwrap() as i32;

    let stored = product::Entity::find_by_id(id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.price, dec!(120));

    // Clearing the special price does not bring back the old base price
    let response = app
        .json(
            Method::PUT,
            &format!("/api/admin/products/{id}"),
            json!({
                "section_id": section.id,
                "title": "Meter",
                "slug": "meter",
                "sku": "M-1",
                "price": "120.00"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["price"], "120.00");

    let response = app
        .post_json(
            "/api/admin/products",
            json!({"title": "Clone", "slug": "clone", "sku": "M-1", "price": 1}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/admin/products",
            json!({"title": "Cheap", "slug": "cheap", "sku": "C-1", "price": "-1"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Prices cannot be negative");
}

#[tokio::test]
async fn duplicates_get_derived_identifiers() {
    let app = TestApp::new().await;
    let section = app.seed_active_section("Plugs").await;
    let a = app.seed_product(section.id, "P-1", "Plug", dec!(3), 0, true).await;
    let b = app.seed_product(section.id, "P-2", "Plug XL", dec!(4), 0, true).await;

    let response = app
        .post_json("/api/admin/product-copies", json!({"ids": [b.id, a.id]}))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let copies = response.json()["data"].as_array().unwrap().clone();
    assert_eq!(copies.len(), 2);
    assert_eq!(copies[0]["sku"], "P-1_copy_0");
    assert_eq!(copies[0]["slug"], "p-1-copy-0");
    assert_eq!(copies[0]["title"], "Plug (copy)");
    assert_eq!(copies[1]["sku"], "P-2_copy_1");
}

#[tokio::test]
async fn orders_can_be_listed_and_moved_through_statuses() {
    let app = TestApp::new().await;
    app.post_json(
        "/api/cart/items",
        json!({"product_id": 1, "title": "Wire", "price": "10", "quantity": 2}),
    )
    .await;
    let placed = app
        .post_json("/api/orders", json!({"name": "Ann", "phone": "123"}))
        .await
        .json();
    let order_id = placed["order_id"].as_i64().unwrap();

    let list = app.get("/api/admin/orders").await.json();
    let orders = list["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["total"], "20.00");
    assert_eq!(orders[0]["item_count"], 1);
    assert_eq!(orders[0]["status"], "new");

    let detail = app
        .post_json(
            &format!("/api/admin/orders/{order_id}/status"),
            json!({"status": "in_progress"}),
        )
        .await
        .json();
    assert_eq!(detail["data"]["status"], "in_progress");
    assert_eq!(detail["data"]["items"][0]["line_total"], "20.00");

    let filtered = app.get("/api/admin/orders?status=new").await.json();
    assert_eq!(filtered["data"], json!([]));

    let response = app.get("/api/admin/orders?status=shipped").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/admin/orders/777").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn leads_are_listed_unprocessed_first() {
    let app = TestApp::new().await;
    for name in ["First", "Second", "Third"] {
        app.post_json(
            "/api/leads",
            json!({"type": "callback", "name": name, "phone": "1"}),
        )
        .await;
    }

    let leads = app.get("/api/admin/leads").await.json();
    let first_id = leads["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["name"] == "First")
        .map(|l| l["id"].as_i64().unwrap())
        .unwrap();

    let body = app
        .post_json(
            &format!("/api/admin/leads/{first_id}/processed"),
            json!({"processed": true}),
        )
        .await
        .json();
    assert_eq!(body["data"]["processed"], true);

    let leads = app.get("/api/admin/leads").await.json();
    let names: Vec<&str> = leads["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.last(), Some(&"First"));

    let pending = app.get("/api/admin/leads?processed=false").await.json();
    assert_eq!(pending["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_admin_requests_get_the_error_body() {
    let app = TestApp::new().await;

    let response = app
        .post_form("/api/admin/catalog/product/active", "ids=1&active=true")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));

    let response = app
        .post_json("/api/admin/catalog/product/active", json!({"ids": "all"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);

    let response = app.get("/api/admin/orders/abc").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["message"].as_str().unwrap().starts_with("Invalid path"));

    let response = app
        .post_json("/api/admin/catalog/widget/active", json!({"ids": [1], "active": true}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);

    let response = app.get("/api/admin/leads?processed=maybe").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["message"].as_str().unwrap().starts_with("Invalid query string"));
}
