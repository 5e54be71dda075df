//! Request-scoped tracing helpers.
//!
//! Every request gets a [`RequestId`] (taken from `x-request-id` or freshly
//! generated). The id is stored in a task-local so that error bodies built
//! deep inside handlers can echo it back without threading it through every
//! signature.

use axum::http::Request;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tower_http::classify::{SharedClassifier, StatusInRangeAsFailures};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse,
    MakeSpan, TraceLayer,
};
use tracing::{warn, Level};
use uuid::Uuid;

/// Identifier carried through logs and response bodies for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl Default for RequestId {
    fn default() -> Self {
        RequestId(Uuid::new_v4().to_string())
    }
}

impl RequestId {
    pub fn new(value: impl Into<String>) -> Self {
        RequestId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

tokio::task_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<RequestId>>;
}

pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    CURRENT_REQUEST_ID
        .scope(RefCell::new(Some(request_id)), future)
        .await
}

pub fn current_request_id() -> Option<RequestId> {
    CURRENT_REQUEST_ID
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
}

#[derive(Clone, Default)]
pub struct RequestSpanMaker;

impl<B> MakeSpan<B> for RequestSpanMaker {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .cloned()
            .or_else(|| {
                request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .map(RequestId::new)
            })
            .unwrap_or_default();

        tracing::info_span!(
            "http.request",
            request_id = %request_id.as_str(),
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<StatusInRangeAsFailures>,
    RequestSpanMaker,
    DefaultOnRequest,
    DefaultOnResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    DefaultOnFailure,
>;

/// Configure tracing for the application with tower-http.
///
/// Only 5xx responses are classified as failures; validation rejections from
/// storefront forms are routine and stay at INFO.
pub fn configure_http_tracing() -> HttpTraceLayer {
    let classifier = SharedClassifier::new(StatusInRangeAsFailures::new(500..=599));
    TraceLayer::new(classifier)
        .make_span_with(RequestSpanMaker)
        .on_request(DefaultOnRequest::default())
        .on_response(DefaultOnResponse::default().level(Level::INFO))
        .on_body_chunk(DefaultOnBodyChunk::default())
        .on_eos(DefaultOnEos::default())
        .on_failure(DefaultOnFailure::default())
}

/// Log slow operations such as catalog assembly on large trees
pub fn log_slow_operation(operation: &str, duration: Duration, threshold: Duration) {
    if duration > threshold {
        warn!(
            operation,
            duration_ms = %duration.as_millis(),
            threshold_ms = %threshold.as_millis(),
            "Slow operation detected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_id_is_visible_inside_scope_only() {
        assert!(current_request_id().is_none());

        let seen = scope_request_id(RequestId::new("req-7"), async {
            current_request_id().map(|rid| rid.0)
        })
        .await;

        assert_eq!(seen.as_deref(), Some("req-7"));
        assert!(current_request_id().is_none());
    }

    #[test]
    fn default_request_ids_are_unique() {
        assert_ne!(RequestId::default(), RequestId::default());
    }

    #[test]
    fn span_maker_prefers_extension_over_header() {
        let mut request = Request::builder()
            .uri("/api/cart")
            .header("x-request-id", "from-header")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(RequestId::new("from-extension"));

        // Span creation must not panic without a subscriber installed.
        let _span = RequestSpanMaker.make_span(&request);
    }
}
