#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{self, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db,
    entities::{category, product, section, subcategory, subsection},
    services::images::{ImageDirectory, ImageResolver, ImageSettings},
    session::{InMemorySessionStore, SessionManager},
    AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

/// Response captured from the router with the body already buffered.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json response body")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("utf-8 response body")
    }
}

/// Application wired against a throwaway SQLite file, driven through `oneshot`.
///
/// Acts like a single browser: a session cookie issued by one response is
/// sent with every later request.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    cookie: Mutex<Option<String>>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let sessions = SessionManager::new(
            Arc::new(InMemorySessionStore::new()),
            Duration::from_secs(600),
        );
        let images = Arc::new(ImageResolver::new(
            ImageSettings::from(&cfg),
            ImageDirectory::from_names(["SHT-1.jpg"]),
        ));

        let state = AppState::new(Arc::new(pool), cfg, sessions, images);
        let router = storefront_api::build_router(state.clone());

        Self {
            router,
            state,
            cookie: Mutex::new(None),
            _dir: dir,
        }
    }

    pub fn session_cookie(&self) -> Option<String> {
        self.cookie.lock().expect("cookie lock").clone()
    }

    /// Forgets the session cookie, as a fresh browser would.
    pub fn forget_session(&self) {
        *self.cookie.lock().expect("cookie lock") = None;
    }

    async fn send(&self, mut builder: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = self.session_cookie() {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
            *self.cookie.lock().expect("cookie lock") = Some(pair);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::GET).uri(uri), Body::empty())
            .await
    }

    pub async fn json(&self, method: Method, uri: &str, payload: Value) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let body = Body::from(serde_json::to_vec(&payload).expect("serialize json body"));
        self.send(builder, body).await
    }

    pub async fn post_json(&self, uri: &str, payload: Value) -> TestResponse {
        self.json(Method::POST, uri, payload).await
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> TestResponse {
        let builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.to_string())).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::DELETE).uri(uri), Body::empty())
            .await
    }

    // ---- seeding ----

    pub async fn seed_category(&self, title: &str, sort_order: i32, is_active: bool) -> category::Model {
        category::ActiveModel {
            title: Set(title.to_string()),
            slug: Set(slugify(title)),
            description: Set(String::new()),
            is_active: Set(is_active),
            sort_order: Set(sort_order),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed category")
    }

    pub async fn seed_subcategory(
        &self,
        category_id: i32,
        title: &str,
        sort_order: i32,
        is_active: bool,
    ) -> subcategory::Model {
        subcategory::ActiveModel {
            category_id: Set(category_id),
            title: Set(title.to_string()),
            slug: Set(slugify(title)),
            description: Set(String::new()),
            is_active: Set(is_active),
            sort_order: Set(sort_order),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed subcategory")
    }

    pub async fn seed_section(
        &self,
        subcategory_id: i32,
        title: &str,
        sort_order: i32,
        is_active: bool,
    ) -> section::Model {
        section::ActiveModel {
            subcategory_id: Set(subcategory_id),
            title: Set(title.to_string()),
            slug: Set(slugify(title)),
            description: Set(String::new()),
            is_active: Set(is_active),
            sort_order: Set(sort_order),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed section")
    }

    pub async fn seed_subsection(&self, section_id: i32, title: &str, is_active: bool) -> subsection::Model {
        subsection::ActiveModel {
            section_id: Set(section_id),
            title: Set(title.to_string()),
            slug: Set(slugify(title)),
            description: Set(String::new()),
            is_active: Set(is_active),
            sort_order: Set(0),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed subsection")
    }

    pub async fn seed_product(
        &self,
        section_id: i32,
        sku: &str,
        title: &str,
        price: Decimal,
        sort_order: i32,
        is_active: bool,
    ) -> product::Model {
        product::ActiveModel {
            section_id: Set(Some(section_id)),
            title: Set(title.to_string()),
            slug: Set(slugify(sku)),
            sku: Set(sku.to_string()),
            short_description: Set(format!("{title} short")),
            full_description: Set(format!("{title} full description")),
            price: Set(price),
            price_special: Set(None),
            price_retail: Set(None),
            stock: Set(10),
            image: Set(None),
            image_code: Set(String::new()),
            unit: Set("pcs".to_string()),
            wire_section: Set(String::new()),
            load_limit: Set(String::new()),
            is_active: Set(is_active),
            sort_order: Set(sort_order),
            ..Default::default()
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product")
    }

    /// Category → subcategory → section, all active. Returns the section.
    pub async fn seed_active_section(&self, title: &str) -> section::Model {
        let category = self.seed_category(&format!("{title} category"), 0, true).await;
        let subcategory = self
            .seed_subcategory(category.id, &format!("{title} subcategory"), 0, true)
            .await;
        self.seed_section(subcategory.id, title, 0, true).await
    }
}

pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}
