use crate::{errors::ServiceError, session::Session, AppState};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Request body decoded from JSON or from an urlencoded form.
///
/// Storefront forms post `application/x-www-form-urlencoded` while scripts
/// send JSON; handlers see the same flat object either way. Form values are
/// always strings.
#[derive(Debug, Clone, Default)]
pub struct Payload(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.trim_start().starts_with("application/json"))
            .unwrap_or(false);

        let body = Bytes::from_request(req, state).await.map_err(|rejection| {
            debug!(error = %rejection.body_text(), "Could not read request body");
            ServiceError::validation("Invalid request format").into_response()
        })?;

        let payload = if is_json {
            decode_json(&body)
        } else {
            Ok(decode_form(&body))
        };
        payload
            .map(Payload)
            .map_err(IntoResponse::into_response)
    }
}

fn decode_json(body: &[u8]) -> Result<Map<String, Value>, ServiceError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ServiceError::validation("Invalid request format")),
        Err(e) => {
            debug!(error = %e, "Rejected undecodable JSON body");
            Err(ServiceError::validation("Invalid request format"))
        }
    }
}

fn decode_form(body: &[u8]) -> Map<String, Value> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect()
}

/// `Json` extractor whose rejections carry the standard error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| {
                ServiceError::validation(format!("Invalid request body: {}", rejection.body_text()))
            })
    }
}

/// `Path` extractor; a segment that does not parse is a 400 with the error body.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection| {
                ServiceError::validation(format!("Invalid path: {}", rejection.body_text()))
            })
    }
}

/// `Query` extractor with the same rejection handling as [`ApiJson`].
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| {
                ServiceError::validation(format!("Invalid query string: {}", rejection.body_text()))
            })
    }
}

/// The caller's session, opened from the session cookie.
///
/// Handlers hand it back through [`respond_with_session`] so changes are
/// stored and new visitors receive their cookie.
pub struct CurrentSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie = cookie_value(&parts.headers, &state.config.session_cookie_name);
        Ok(Self(state.sessions.open(cookie.as_deref()).await?))
    }
}

/// Finds a cookie by name across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// Persists the session if it changed and attaches the cookie for new sessions.
pub async fn respond_with_session<T: IntoResponse>(
    state: &AppState,
    mut session: Session,
    body: T,
) -> Result<Response, ServiceError> {
    let changed = session.is_modified();
    state.sessions.persist(&mut session).await?;

    let mut response = body.into_response();
    if session.is_new() && changed {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            state.config.session_cookie_name,
            session.id(),
            state.sessions.ttl().as_secs()
        );
        if state.config.session_cookie_secure {
            cookie.push_str("; Secure");
        }
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| ServiceError::InternalError(format!("Invalid session cookie: {e}")))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cookies_are_found_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; csrftoken=x"));
        headers.append(COOKIE, HeaderValue::from_static("sessionid=abc123"));

        assert_eq!(cookie_value(&headers, "sessionid").as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn forms_decode_to_string_values() {
        let map = decode_form(b"name=Ann+Lee&phone=%2B7900&type=callback");
        assert_eq!(Value::Object(map), json!({"name": "Ann Lee", "phone": "+7900", "type": "callback"}));
    }

    #[test]
    fn json_must_be_an_object() {
        assert!(decode_json(br#"{"a": 1}"#).is_ok());
        assert!(matches!(decode_json(b"[1, 2]"), Err(ServiceError::ValidationError(_))));
        assert!(matches!(decode_json(b"{oops"), Err(ServiceError::ValidationError(_))));
    }
}
