use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SESSION_BACKEND: &str = "in-memory";
const DEFAULT_SESSION_COOKIE: &str = "sessionid";
const DEFAULT_SESSION_NAMESPACE: &str = "storefront:session";
const DEFAULT_SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60; // two weeks
const DEFAULT_SECTION_PAGE_SIZE: u64 = 9;
const DEFAULT_MAX_SECTION_PAGE_SIZE: u64 = 100;
const DEFAULT_PRODUCT_IMAGE_DIR: &str = "static/img/elektrotehnicheskij-zavod-kvt";
const DEFAULT_PRODUCT_IMAGE_URL_PREFIX: &str = "/static/img/elektrotehnicheskij-zavod-kvt";
const DEFAULT_IMAGE_CODE_URL_TEMPLATE: &str =
    "/upload/resize_cache/iblock/{code}/310_310_2/{code}.png";

/// Runtime settings for the storefront service.
///
/// Every field can be overridden with an `APP__<FIELD>` environment variable.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// SeaORM connection string (`sqlite://...` or `postgres://...`)
    pub database_url: String,

    /// Redis connection URL, used when `session_backend = "redis"`
    pub redis_url: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `development`, `test` or `production`
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit one JSON object per log line
    #[serde(default)]
    pub log_json: bool,

    /// Apply pending migrations before binding the listener
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated origins the storefront frontend is served from
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Accept any origin outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// CORS: allow credentials (needed for the session cookie on cross-origin frontends)
    #[serde(default)]
    pub cors_allow_credentials: bool,

    /// Connection pool bounds
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Pool timeouts, in seconds
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Session store backend ("in-memory" or "redis")
    #[serde(default = "default_session_backend")]
    #[validate(custom = "validate_session_backend")]
    pub session_backend: String,

    /// Cookie carrying the session identifier
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Key prefix for sessions stored in Redis
    #[serde(default = "default_session_namespace")]
    pub session_namespace: String,

    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub session_cookie_secure: bool,

    /// Public URL prefix for uploaded product images
    #[serde(default = "default_media_url")]
    pub media_url: String,

    /// Directory scanned for product photos named after the product title
    #[serde(default = "default_product_image_dir")]
    pub product_image_dir: String,

    /// Public URL prefix matching `product_image_dir`
    #[serde(default = "default_product_image_url_prefix")]
    pub product_image_url_prefix: String,

    /// URL template for legacy image codes; `{code}` is substituted
    #[serde(default = "default_image_code_url_template")]
    pub image_code_url_template: String,

    /// Default number of products returned by the section pagination endpoint
    #[serde(default = "default_section_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub section_page_size: u64,

    /// Upper bound for the `limit` query parameter of the section endpoint
    #[serde(default = "default_max_section_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub max_section_page_size: u64,

    /// Per-request deadline in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on request bodies, in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl AppConfig {
    /// Builds a configuration with defaults for everything but the essentials.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            redis_url: "redis://localhost:6379".to_string(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            session_backend: default_session_backend(),
            session_cookie_name: default_session_cookie_name(),
            session_namespace: default_session_namespace(),
            session_ttl_secs: default_session_ttl_secs(),
            session_cookie_secure: false,
            media_url: default_media_url(),
            product_image_dir: default_product_image_dir(),
            product_image_url_prefix: default_product_image_url_prefix(),
            image_code_url_template: default_image_code_url_template(),
            section_page_size: default_section_page_size(),
            max_section_page_size: default_max_section_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_size: default_max_body_size(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// True when at least one non-blank origin is listed
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Development and explicit opt-in both permit `CorsLayer::permissive()`
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Whether carts are kept in Redis rather than process memory
    pub fn uses_redis_sessions(&self) -> bool {
        self.session_backend.eq_ignore_ascii_case("redis")
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Outside development set APP__CORS_ALLOWED_ORIGINS, or opt in with APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.section_page_size > self.max_section_page_size {
            let mut err = ValidationError::new("section_page_size_exceeds_max");
            err.message = Some("section_page_size must not exceed max_section_page_size".into());
            errors.add("section_page_size", err);
        }

        if self.session_cookie_name.trim().is_empty() {
            let mut err = ValidationError::new("session_cookie_name_empty");
            err.message = Some("session_cookie_name must not be empty".into());
            errors.add("session_cookie_name", err);
        }

        if self.is_production() && !self.session_cookie_secure {
            let mut err = ValidationError::new("session_cookie_insecure");
            err.message = Some(
                "Production deployments must set APP__SESSION_COOKIE_SECURE=true".into(),
            );
            errors.add("session_cookie_secure", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}

fn default_db_min_connections() -> u32 {
    2
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_session_backend() -> String {
    DEFAULT_SESSION_BACKEND.to_string()
}

fn default_session_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

fn default_session_namespace() -> String {
    DEFAULT_SESSION_NAMESPACE.to_string()
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_media_url() -> String {
    "/media/".to_string()
}

fn default_product_image_dir() -> String {
    DEFAULT_PRODUCT_IMAGE_DIR.to_string()
}

fn default_product_image_url_prefix() -> String {
    DEFAULT_PRODUCT_IMAGE_URL_PREFIX.to_string()
}

fn default_image_code_url_template() -> String {
    DEFAULT_IMAGE_CODE_URL_TEMPLATE.to_string()
}

fn default_section_page_size() -> u64 {
    DEFAULT_SECTION_PAGE_SIZE
}

fn default_max_section_page_size() -> u64 {
    DEFAULT_MAX_SECTION_PAGE_SIZE
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1MB, forms and cart payloads are tiny
}

fn validate_session_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "in-memory" | "redis" => Ok(()),
        _ => {
            let mut err = ValidationError::new("session_backend");
            err.message = Some("Must be one of: in-memory, redis".into());
            Err(err)
        }
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut err = ValidationError::new("log_level");
            err.message = Some("Must be one of: trace, debug, info, warn, error".into());
            Err(err)
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Reads settings from, lowest precedence first: built-in defaults,
/// `config/default.toml`, `config/{RUN_ENV}.toml` and `APP__*` variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!(environment = %run_env, "Loading configuration");

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "No '{}' directory; using defaults and APP__* variables only",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("redis_url", "redis://localhost:6379")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!(errors = ?e, "Invalid configuration");
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!(errors = ?e, "Inconsistent configuration");
        AppConfigError::Validation(e)
    })?;

    info!(environment = %app_config.environment, "Configuration loaded");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn production_requires_cors_origins() {
        let mut cfg = base_config();
        cfg.session_cookie_secure = true;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_with_origins_and_secure_cookie_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://shop.example.com".into());
        cfg.session_cookie_secure = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_secure_session_cookie() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("session_cookie_secure"));
    }

    #[test]
    fn development_falls_back_to_permissive_cors() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn page_size_cannot_exceed_max() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.section_page_size = 50;
        cfg.max_section_page_size = 10;
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.field_errors().contains_key("section_page_size"));
    }

    #[test]
    fn unknown_session_backend_is_rejected() {
        let mut cfg = base_config();
        cfg.session_backend = "memcached".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("session_backend"));
    }

    #[test]
    fn defaults_match_storefront_conventions() {
        let cfg = base_config();
        assert_eq!(cfg.section_page_size, 9);
        assert_eq!(cfg.session_cookie_name, "sessionid");
        assert!(!cfg.uses_redis_sessions());
        assert!(cfg.validate().is_ok());
    }
}
