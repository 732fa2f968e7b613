//! In-memory session store.
//!
//! Sessions live in two maps guarded by a single lock: one for values, one
//! for last-write timestamps. An optional background sweeper drops entries
//! whose timestamp falls behind `now - max_age`. State is per-process, so
//! this store suits tests and single-node deployments.

use crate::config::CookieOptions;
use crate::error::{SessionError, SessionResult};
use crate::http::{SessionRequest, SessionResponse};
use crate::session::Session;
use crate::store::{SessionStore, generate_session_id};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{Mutex, RwLock};

/// Default generated session ID length.
const DEFAULT_ID_LENGTH: usize = 32;

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Default)]
struct MemoryInner {
    values: HashMap<String, HashMap<String, serde_json::Value>>,
    touched: HashMap<String, DateTime<Utc>>,
}

/// Session store backed by process memory.
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    options: CookieOptions,
    id_length: usize,
    sweep_interval: StdDuration,
    running: Arc<Mutex<bool>>,
}

impl MemoryStore {
    /// Create a store with default options and sweep interval.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
            options: CookieOptions::default(),
            id_length: DEFAULT_ID_LENGTH,
            sweep_interval: StdDuration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            running: Arc::new(Mutex::new(false)),
        }
    }

    /// Set the cookie options applied to every session from this store.
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.options = options;
        self
    }

    /// Set session lifetime in seconds, for the cookie and the sweeper cutoff.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.options.max_age = max_age;
        self
    }

    /// Set the generated session ID length, clamped to the store minimum.
    pub fn with_id_length(mut self, length: usize) -> Self {
        self.id_length = length;
        self
    }

    /// Set how often the background sweeper runs.
    pub fn with_sweep_interval(mut self, interval: StdDuration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.values.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.values.is_empty()
    }

    /// Remove sessions older than the lifetime, returning how many went.
    ///
    /// Does nothing when `max_age` is zero or negative, since those sessions
    /// never expire by age.
    pub async fn sweep_once(&self) -> usize {
        let max_age = self.options.max_age;
        if max_age <= 0 {
            return 0;
        }
        let cutoff = Utc::now() - Duration::seconds(max_age);

        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .touched
            .iter()
            .filter(|(_, touched)| **touched < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            inner.values.remove(id);
            inner.touched.remove(id);
        }

        if !expired.is_empty() {
            tracing::info!("swept {} expired sessions", expired.len());
        }
        expired.len()
    }

    /// Start the background sweeper. Starting twice is a no-op.
    pub async fn start_sweeper(self: Arc<Self>) {
        let mut running = self.running.lock().await;
        if *running {
            return;
        }
        *running = true;
        drop(running);

        tracing::info!(
            "session sweeper started (interval: {:?})",
            self.sweep_interval
        );

        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.sweep_interval);
            loop {
                interval.tick().await;
                let running = store.running.lock().await;
                if !*running {
                    break;
                }
                drop(running);
                store.sweep_once().await;
            }
            tracing::info!("session sweeper stopped");
        });
    }

    /// Signal the background sweeper to stop after its current cycle.
    pub async fn stop_sweeper(&self) {
        let mut running = self.running.lock().await;
        *running = false;
    }

    /// Whether the background sweeper is running.
    pub async fn sweeper_running(&self) -> bool {
        *self.running.lock().await
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
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

        session.id = id.to_string();
        session.is_new = false;

        let inner = self.inner.read().await;
        if let Some(values) = inner.values.get(id) {
            session.values = values.clone();
        }
        (session, None)
    }

    async fn save(
        &self,
        _request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()> {
        {
            let mut inner = self.inner.write().await;
            inner
                .values
                .insert(session.id.clone(), session.values.clone());
            inner.touched.insert(session.id.clone(), Utc::now());
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
        {
            let mut inner = self.inner.write().await;
            inner.values.remove(&session.id);
            inner.touched.remove(&session.id);
        }
        response.set_cookie(&session.name, "", &session.options.expired());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_session_without_cookie_generates_id() {
        let store = MemoryStore::new();
        let request = SessionRequest::new();

        let (session, error) = store.new_session(&request, "sid").await;

        assert!(session.is_new);
        assert_eq!(session.id.len(), DEFAULT_ID_LENGTH);
        assert!(session.values.is_empty());
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn test_save_then_reload() {
        let store = MemoryStore::new();
        let request = SessionRequest::new();
        let mut response = SessionResponse::new();

        let (mut session, _) = store.new_session(&request, "sid").await;
        session.set("user", "alice").unwrap();
        store.save(&request, &mut response, &session).await.unwrap();

        let next = SessionRequest::new().with_cookie("sid", &session.id);
        let (reloaded, error) = store.new_session(&next, "sid").await;

        assert!(error.is_none());
        assert!(!reloaded.is_new);
        assert_eq!(reloaded.id, session.id);
        assert_eq!(reloaded.get::<String>("user"), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn test_reload_of_unknown_id_keeps_id() {
        let store = MemoryStore::new();
        let request = SessionRequest::new().with_cookie("sid", "never_saved_session_id_0123456789");

        let (session, error) = store.new_session(&request, "sid").await;

        assert!(!session.is_new);
        assert_eq!(session.id, "never_saved_session_id_0123456789");
        assert!(session.values.is_empty());
        assert!(error.is_none());
    }

    #[tokio::test]
    async fn test_destroy_removes_entry_and_expires_cookie() {
        let store = MemoryStore::new();
        let request = SessionRequest::new();
        let mut response = SessionResponse::new();

        let (mut session, _) = store.new_session(&request, "sid").await;
        session.set("user", "alice").unwrap();
        store.save(&request, &mut response, &session).await.unwrap();
        assert_eq!(store.len().await, 1);

        store
            .destroy(&request, &mut response, &session)
            .await
            .unwrap();

        assert!(store.is_empty().await);
        let expired = response.cookies()[1];
        assert!(expired.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_sweep_once_removes_only_stale_entries() {
        let store = MemoryStore::new().with_max_age(60);
        {
            let mut inner = store.inner.write().await;
            inner.values.insert("stale".to_string(), HashMap::new());
            inner
                .touched
                .insert("stale".to_string(), Utc::now() - Duration::seconds(120));
            inner.values.insert("fresh".to_string(), HashMap::new());
            inner
                .touched
                .insert("fresh".to_string(), Utc::now() - Duration::seconds(10));
        }

        let swept = store.sweep_once().await;

        assert_eq!(swept, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_nonpositive_max_age() {
        let store = MemoryStore::new().with_max_age(0);
        {
            let mut inner = store.inner.write().await;
            inner.values.insert("old".to_string(), HashMap::new());
            inner
                .touched
                .insert("old".to_string(), Utc::now() - Duration::days(365));
        }

        assert_eq!(store.sweep_once().await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweeper_lifecycle() {
        let store = Arc::new(MemoryStore::new());

        assert!(!store.sweeper_running().await);
        store.clone().start_sweeper().await;
        assert!(store.sweeper_running().await);

        store.clone().start_sweeper().await;
        assert!(store.sweeper_running().await);

        store.stop_sweeper().await;
        assert!(!store.sweeper_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let store = Arc::new(
            MemoryStore::new()
                .with_max_age(60)
                .with_sweep_interval(StdDuration::from_secs(300)),
        );
        {
            let mut inner = store.inner.write().await;
            inner.values.insert("stale".to_string(), HashMap::new());
            inner
                .touched
                .insert("stale".to_string(), Utc::now() - Duration::seconds(120));
        }

        store.clone().start_sweeper().await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(store.is_empty().await);
        store.stop_sweeper().await;
    }
}
