mod common;

use axum::http::StatusCode;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Statement};
use serde_json::json;
use storefront_api::entities::{
    order::{self, OrderStatus},
    order_item,
};

async fn fill_cart(app: &TestApp) {
    app.post_json(
        "/api/cart/items",
        json!({"product_id": 7, "title": "Wire A", "sku": "W7", "price": "1 234,50", "quantity": 3}),
    )
    .await;
    app.post_json(
        "/api/cart/items",
        json!({"product_id": "kit", "title": "Mount kit", "price": 99.9}),
    )
    .await;
}

#[tokio::test]
async fn order_snapshots_the_cart_and_empties_it() {
    let app = TestApp::new().await;
    fill_cart(&app).await;

    let response = app
        .post_form(
            "/api/orders",
            "name=Ann&phone=%2B7900&comment=Deliver+after+6",
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["success"], true);
    let order_id = body["order_id"].as_i64().expect("order id") as i32;

    let stored = order::Entity::find_by_id(order_id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .expect("order row");
    assert_eq!(stored.status, OrderStatus::New);
    assert_eq!(stored.customer_name, "Ann");
    assert_eq!(stored.comment, "Deliver after 6");

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(app.state.db.as_ref())
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    let wire = items.iter().find(|i| i.product_sku == "W7").expect("wire line");
    assert_eq!(wire.quantity, 3);
    assert_eq!(wire.price, dec!(1234.50));
    assert_eq!(wire.product_id, None);
    assert!(items.iter().any(|i| i.product_title == "Mount kit" && i.price == dec!(99.90)));

    let cart = app.get("/api/cart").await.json();
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn empty_cart_is_rejected_without_writing() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/orders", json!({"name": "Ann", "email": "ann@example.com"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Cart is empty");

    let orders = order::Entity::find().all(app.state.db.as_ref()).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn contact_details_are_required() {
    let app = TestApp::new().await;
    fill_cart(&app).await;

    let response = app.post_json("/api/orders", json!({"name": "Ann"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Phone or email is required");

    let response = app.post_json("/api/orders", json!({"phone": "123"})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Name is required");

    // Nothing was consumed
    assert_eq!(app.get("/api/cart").await.json()["total_quantity"], 4);
}

#[tokio::test]
async fn failed_item_insert_rolls_back_and_keeps_the_cart() {
    let app = TestApp::new().await;
    fill_cart(&app).await;

    app.state
        .db
        .execute(Statement::from_string(
            app.state.db.get_database_backend(),
            "DROP TABLE order_items".to_string(),
        ))
        .await
        .expect("drop order_items");

    let response = app
        .post_json("/api/orders", json!({"name": "Ann", "phone": "123"}))
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["message"], "Database error");

    let orders = order::Entity::find().all(app.state.db.as_ref()).await.unwrap();
    assert!(orders.is_empty(), "order row must be rolled back");
    assert_eq!(app.get("/api/cart").await.json()["total_quantity"], 4);
}
