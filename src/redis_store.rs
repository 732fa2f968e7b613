//! Redis-backed session store.
//!
//! Session values are serialized and written under `{prefix}{id}` with a
//! TTL matching the session lifetime, so Redis expires abandoned sessions
//! on its own. Every backend call is capped by a per-operation timeout: a
//! slow Redis degrades reads to a fresh session and surfaces writes as
//! [`SessionError::Timeout`] instead of stalling the request.

use crate::config::CookieOptions;
use crate::error::{SessionError, SessionResult};
use crate::http::{SessionRequest, SessionResponse};
use crate::session::Session;
use crate::store::{SessionStore, generate_session_id};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Default generated session ID length.
const DEFAULT_ID_LENGTH: usize = 64;

/// Default Redis key prefix.
const DEFAULT_PREFIX: &str = "session_";

/// Default cap on a single Redis operation.
const OP_TIMEOUT_SECS: u64 = 5;

/// Raw key-value operations the store needs from Redis.
///
/// [`ConnectionManager`] implements this for real deployments; tests swap
/// in an in-process stub.
#[async_trait]
pub trait RedisBackend: Send + Sync {
    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>>;
    async fn set_ex(&self, key: &str, value: Vec<u8>, seconds: u64) -> SessionResult<()>;
    async fn set(&self, key: &str, value: Vec<u8>) -> SessionResult<()>;
    async fn del(&self, key: &str) -> SessionResult<()>;
}

#[async_trait]
impl RedisBackend for ConnectionManager {
    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>> {
        let mut conn = self.clone();
        let value: Option<Vec<u8>> = AsyncCommands::get(&mut conn, key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, seconds: u64) -> SessionResult<()> {
        let mut conn = self.clone();
        let _: () = AsyncCommands::set_ex(&mut conn, key, value, seconds).await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> SessionResult<()> {
        let mut conn = self.clone();
        let _: () = AsyncCommands::set(&mut conn, key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> SessionResult<()> {
        let mut conn = self.clone();
        let _: () = AsyncCommands::del(&mut conn, key).await?;
        Ok(())
    }
}

/// Wire format for session values stored in Redis.
pub trait SessionSerializer: Send + Sync {
    fn serialize(&self, values: &HashMap<String, serde_json::Value>) -> SessionResult<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> SessionResult<HashMap<String, serde_json::Value>>;
}

/// JSON wire format. Human-readable in `redis-cli`, the default.
pub struct JsonSerializer;

impl SessionSerializer for JsonSerializer {
    fn serialize(&self, values: &HashMap<String, serde_json::Value>) -> SessionResult<Vec<u8>> {
        serde_json::to_vec(values).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> SessionResult<HashMap<String, serde_json::Value>> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}

/// MessagePack wire format. Smaller payloads than JSON for busy stores.
pub struct MessagePackSerializer;

impl SessionSerializer for MessagePackSerializer {
    fn serialize(&self, values: &HashMap<String, serde_json::Value>) -> SessionResult<Vec<u8>> {
        rmp_serde::to_vec_named(values).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> SessionResult<HashMap<String, serde_json::Value>> {
        rmp_serde::from_slice(bytes).map_err(|e| SessionError::Deserialization(e.to_string()))
    }
}

/// Session store backed by Redis.
pub struct RedisStore {
    backend: Arc<dyn RedisBackend>,
    serializer: Arc<dyn SessionSerializer>,
    options: CookieOptions,
    prefix: String,
    id_length: usize,
    op_timeout: Duration,
}

impl RedisStore {
    /// Connect to Redis and create a store with default settings.
    pub async fn new(url: &str) -> SessionResult<Self> {
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(SessionError::InvalidUrl(format!(
                "Redis URL must start with redis:// or rediss://, got '{}'",
                url
            )));
        }
        let client = redis::Client::open(url)?;
        let backend = ConnectionManager::new(client)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        Ok(Self::from_backend(Arc::new(backend)))
    }

    /// Create a store over an existing backend.
    pub fn from_backend(backend: Arc<dyn RedisBackend>) -> Self {
        Self {
            backend,
            serializer: Arc::new(JsonSerializer),
            options: CookieOptions::default(),
            prefix: DEFAULT_PREFIX.to_string(),
            id_length: DEFAULT_ID_LENGTH,
            op_timeout: Duration::from_secs(OP_TIMEOUT_SECS),
        }
    }

    /// Set the wire format for stored session values.
    pub fn with_serializer(mut self, serializer: Arc<dyn SessionSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Set the Redis key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the generated session ID length, clamped to the store minimum.
    pub fn with_id_length(mut self, length: usize) -> Self {
        self.id_length = length;
        self
    }

    /// Set the cookie options applied to every session from this store.
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    /// Set session lifetime in seconds, for the cookie and the Redis TTL.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.options.max_age = max_age;
        self
    }

    /// Set the per-operation timeout.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    fn key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    async fn load(&self, id: &str) -> SessionResult<HashMap<String, serde_json::Value>> {
        let key = self.key(id);
        let bytes = timeout(self.op_timeout, self.backend.get(&key))
            .await
            .map_err(|_| SessionError::Timeout)??;
        let Some(bytes) = bytes else {
            return Err(SessionError::NotFound(id.to_string()));
        };
        self.serializer.deserialize(&bytes)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, request: &SessionRequest, name: &str) -> (Session, Option<SessionError>) {
        self.new_session(request, name).await
    }

    async fn new_session(
        &self,
        request: &SessionRequest,
        name: &str,
    ) -> (Session, Option<SessionError>) {
        let mut session = Session::new(
            name,
            generate_session_id(self.id_length),
            self.options.clone(),
        );

        let Some(id) = request.cookie(name).filter(|v| !v.is_empty()) else {
            return (session, None);
        };

        match self.load(id).await {
            Ok(values) => {
                session.id = id.to_string();
                session.values = values;
                session.is_new = false;
                (session, None)
            }
            Err(e) => {
                tracing::debug!("session '{}' not loadable from Redis: {}", id, e);
                (session, Some(e))
            }
        }
    }

    async fn save(
        &self,
        _request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()> {
        let key = self.key(&session.id);
        let bytes = self.serializer.serialize(&session.values)?;

        let max_age = session.options.max_age;
        if max_age > 0 {
            timeout(
                self.op_timeout,
                self.backend.set_ex(&key, bytes, max_age as u64),
            )
            .await
            .map_err(|_| SessionError::Timeout)??;
        } else {
            timeout(self.op_timeout, self.backend.set(&key, bytes))
                .await
                .map_err(|_| SessionError::Timeout)??;
        }

        response.set_cookie(&session.name, &session.id, &session.options);
        Ok(())
    }

    async fn destroy(
        &self,
        _request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()> {
        let key = self.key(&session.id);
        timeout(self.op_timeout, self.backend.del(&key))
            .await
            .map_err(|_| SessionError::Timeout)??;
        response.set_cookie(&session.name, "", &session.options.expired());
        Ok(())
    }
}
