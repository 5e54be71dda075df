use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use http::HeaderValue;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use storefront_api as api;
use api::{
    services::images::{ImageDirectory, ImageResolver, ImageSettings},
    session::{InMemorySessionStore, RedisSessionStore, SessionManager, SessionStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Session store
    let store: Arc<dyn SessionStore> = if cfg.uses_redis_sessions() {
        let client = redis::Client::open(cfg.redis_url.clone())
            .with_context(|| format!("invalid redis url {}", cfg.redis_url))?;
        info!("Using Redis session store");
        Arc::new(RedisSessionStore::new(
            Arc::new(client),
            cfg.session_namespace.clone(),
        ))
    } else {
        if cfg.is_production() {
            warn!("In-memory sessions do not survive restarts or span processes");
        }
        let store = InMemorySessionStore::new();
        spawn_session_sweeper(store.clone());
        Arc::new(store)
    };
    let sessions = SessionManager::new(store, cfg.session_ttl());

    // Product photos are matched against a listing taken once at startup
    let directory = ImageDirectory::scan(&cfg.product_image_dir)
        .with_context(|| format!("failed to read image directory {}", cfg.product_image_dir))?;
    let images = Arc::new(ImageResolver::new(ImageSettings::from(&cfg), directory));

    let app_state = api::AppState::new(db_arc, cfg.clone(), sessions, images);

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        let layer = CorsLayer::new().allow_origin(origins);
        if cfg.cors_allow_credentials {
            // Credentialed CORS forbids wildcard methods and headers
            layer
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                ])
                .allow_headers([http::header::CONTENT_TYPE])
                .allow_credentials(true)
        } else {
            layer.allow_methods(Any).allow_headers(Any)
        }
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        anyhow::bail!(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
        );
    };

    let app = Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .merge(api::build_router(app_state))
        .layer(cors_layer);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Periodically drops expired in-memory sessions.
fn spawn_session_sweeper(store: InMemorySessionStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = store.len(), "Purged expired sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
