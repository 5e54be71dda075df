//! Server-side sessions keyed by an opaque cookie value.
//!
//! A [`Session`] is a small JSON object loaded at the start of a request and
//! written back only when something changed. Storage is pluggable through
//! [`SessionStore`]: process memory for single-node deployments, Redis when
//! several API instances serve the same storefront.
//!
//! Writes are last-write-wins. Two concurrent requests for the same session
//! each load, modify and store a full copy, so one update can be lost.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub type SessionData = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>, SessionError>;
    async fn store(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), SessionError>;
}

/// Request-local view of a session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: SessionData,
    modified: bool,
    is_new: bool,
}

impl Session {
    fn fresh() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            data: SessionData::new(),
            modified: false,
            is_new: true,
        }
    }

    fn existing(id: String, data: SessionData) -> Self {
        Self {
            id,
            data,
            modified: false,
            is_new: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when the client has no cookie for this session yet.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Reads a typed value. Entries that no longer deserialize are treated as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(session_key = key, error = %e, "Discarding unreadable session value");
                None
            }
        }
    }

    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SessionError> {
        self.data
            .insert(key.to_string(), serde_json::to_value(value)?);
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        if self.data.remove(key).is_some() {
            self.modified = true;
        }
    }
}

/// Opens and persists sessions against a configured store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Loads the session named by the client's cookie, or starts a new one.
    ///
    /// Unknown or malformed ids are never adopted; the client gets a new id.
    pub async fn open(&self, cookie_value: Option<&str>) -> Result<Session, SessionError> {
        if let Some(id) = cookie_value.filter(|id| is_valid_session_id(id)) {
            if let Some(data) = self.store.load(id).await? {
                return Ok(Session::existing(id.to_string(), data));
            }
            debug!("Session cookie refers to an unknown session; issuing a new one");
        }
        Ok(Session::fresh())
    }

    /// Writes the session back if it was modified during the request.
    pub async fn persist(&self, session: &mut Session) -> Result<(), SessionError> {
        if !session.modified {
            return Ok(());
        }
        self.store.store(&session.id, &session.data, self.ttl).await?;
        session.modified = false;
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone)]
struct StoredSession {
    data: SessionData,
    expires_at: Instant,
}

/// Process-local session store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, StoredSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired sessions. Lookups already ignore them; this reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, stored| stored.expires_at > now);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>, SessionError> {
        let expired = match self.sessions.get(session_id) {
            Some(stored) if stored.expires_at > Instant::now() => {
                return Ok(Some(stored.data.clone()))
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.remove(session_id);
        }
        Ok(None)
    }

    async fn store(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        self.sessions.insert(
            session_id.to_string(),
            StoredSession {
                data: data.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

/// Redis-backed session store; sessions expire through key TTLs.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: Arc<redis::Client>,
    namespace: String,
}

impl RedisSessionStore {
    pub fn new(client: Arc<redis::Client>, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}:{}", self.namespace, session_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>, SessionError> {
        let mut conn = self.client.get_async_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(session_id))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let payload = serde_json::to_string(data)?;
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("SETEX")
            .arg(self.key(session_id))
            .arg(ttl.as_secs().max(1))
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager(ttl: Duration) -> (SessionManager, InMemorySessionStore) {
        let store = InMemorySessionStore::new();
        (SessionManager::new(Arc::new(store.clone()), ttl), store)
    }

    #[tokio::test]
    async fn unmodified_sessions_are_not_written() {
        let (sessions, store) = manager(Duration::from_secs(60));
        let mut session = sessions.open(None).await.unwrap();
        assert!(session.is_new());

        sessions.persist(&mut session).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn modified_sessions_round_trip_through_the_store() {
        let (sessions, _store) = manager(Duration::from_secs(60));
        let mut session = sessions.open(None).await.unwrap();
        session.insert("greeting", &json!("hello")).unwrap();
        assert!(session.is_modified());
        sessions.persist(&mut session).await.unwrap();
        assert!(!session.is_modified());

        let reopened = sessions.open(Some(session.id())).await.unwrap();
        assert!(!reopened.is_new());
        assert_eq!(reopened.get::<String>("greeting").as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids_get_a_new_session() {
        let (sessions, _store) = manager(Duration::from_secs(60));

        let unknown = sessions.open(Some("deadbeef")).await.unwrap();
        assert!(unknown.is_new());
        assert_ne!(unknown.id(), "deadbeef");

        let hostile = sessions.open(Some("../../etc; rm")).await.unwrap();
        assert!(hostile.is_new());
    }

    #[tokio::test]
    async fn expired_sessions_are_not_returned() {
        let (sessions, store) = manager(Duration::from_millis(0));
        let mut session = sessions.open(None).await.unwrap();
        session.insert("cart", &json!([])).unwrap();
        sessions.persist(&mut session).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let reopened = sessions.open(Some(session.id())).await.unwrap();
        assert!(reopened.is_new());
        assert_eq!(store.purge_expired(), 0);
    }

    #[test]
    fn unreadable_values_read_as_absent() {
        let mut session = Session::fresh();
        session.insert("count", &json!("not a number")).unwrap();
        assert_eq!(session.get::<u32>("count"), None);
    }
}
