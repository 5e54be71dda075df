mod common;

use axum::http::StatusCode;
use common::TestApp;
use sea_orm::EntityTrait;
use serde_json::json;
use storefront_api::entities::lead::{self, LeadType};

#[tokio::test]
async fn form_lead_is_stored_with_raw_payload() {
    let app = TestApp::new().await;

    let response = app
        .post_form(
            "/api/leads",
            "type=callback&name=Ann&phone=%2B7+900+000&utm_source=mail",
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Request received.");
    let lead_id = body["lead_id"].as_i64().expect("lead id") as i32;

    let stored = lead::Entity::find_by_id(lead_id)
        .one(app.state.db.as_ref())
        .await
        .unwrap()
        .expect("lead row");
    assert_eq!(stored.lead_type, LeadType::Callback);
    assert_eq!(stored.name, "Ann");
    assert_eq!(stored.phone, "+7 900 000");
    assert_eq!(stored.email, "");
    assert!(!stored.processed);

    let meta = stored.meta.expect("meta");
    assert_eq!(meta["source"], "frontend");
    assert_eq!(meta["raw_payload"]["utm_source"], "mail");
}

#[tokio::test]
async fn unknown_or_price_request_types_are_filed_as_feedback() {
    let app = TestApp::new().await;

    for kind in ["price_request", "spam", ""] {
        let response = app
            .post_json(
                "/api/leads",
                json!({"type": kind, "name": "Bob", "email": "bob@example.com"}),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let leads = lead::Entity::find().all(app.state.db.as_ref()).await.unwrap();
    assert_eq!(leads.len(), 3);
    assert!(leads.iter().all(|l| l.lead_type == LeadType::Feedback));
}

#[tokio::test]
async fn lead_requires_name_and_a_contact() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/leads", json!({"name": "  ", "phone": "123"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Name is required");

    let response = app
        .post_json("/api/leads", json!({"name": "Carl", "message": "hi"}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Phone or email is required");

    let count = lead::Entity::find().all(app.state.db.as_ref()).await.unwrap().len();
    assert_eq!(count, 0);
}
