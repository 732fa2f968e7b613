//! Per-request session façade and the named-store registry.

use crate::error::{SessionError, SessionResult};
use crate::http::{SessionRequest, SessionResponse};
use crate::session::Session;
use crate::store::SessionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-request session façade.
///
/// Wraps one store and one request, loads the session lazily on first data
/// access, and tracks whether anything was written so [`save`] can skip the
/// backend when the handler never touched the session.
///
/// Hosts must call [`save`] once, before the response's status and headers
/// are flushed; cookies appended afterwards never reach the client. Calling
/// it both explicitly and from a finalize hook is safe: a successful save
/// clears the dirty flag, so the second call is a no-op.
///
/// [`save`]: SessionManager::save
pub struct SessionManager<'r> {
    name: String,
    store: Arc<dyn SessionStore>,
    request: &'r SessionRequest,
    session: Option<Session>,
    written: bool,
    load_error: Option<SessionError>,
}

impl<'r> SessionManager<'r> {
    /// Create a manager bound to one request and one store.
    pub fn new(
        request: &'r SessionRequest,
        name: impl Into<String>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            request,
            session: None,
            written: false,
            load_error: None,
        }
    }

    /// Cookie/session name this manager serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store backing this manager.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Whether the session has unsaved writes.
    pub fn written(&self) -> bool {
        self.written
    }

    /// Error that degraded the load to a fresh session, if any.
    pub fn load_error(&self) -> Option<&SessionError> {
        self.load_error.as_ref()
    }

    /// The session for this request, loading it on first access.
    ///
    /// Loading never fails: a broken cookie or unreachable backend yields a
    /// fresh session and the causal error is retained for [`load_error`].
    ///
    /// [`load_error`]: SessionManager::load_error
    pub async fn session(&mut self) -> &mut Session {
        let loaded = match self.session.take() {
            Some(session) => session,
            None => {
                let (session, error) = self.store.get(self.request, &self.name).await;
                if let Some(ref e) = error {
                    tracing::warn!(
                        "session '{}' load degraded to a fresh session: {}",
                        self.name,
                        e
                    );
                }
                self.load_error = error;
                session
            }
        };
        self.session.insert(loaded)
    }

    /// Get a typed value from the session.
    pub async fn get<T: for<'de> Deserialize<'de>>(&mut self, key: &str) -> Option<T> {
        self.session().await.get(key)
    }

    /// Set a value in the session and mark it dirty.
    pub async fn set<T: Serialize + Send>(&mut self, key: &str, value: T) -> SessionResult<()> {
        self.session().await.set(key, value)?;
        self.written = true;
        Ok(())
    }

    /// Remove a value from the session and mark it dirty.
    pub async fn delete(&mut self, key: &str) -> Option<serde_json::Value> {
        let removed = self.session().await.remove(key);
        self.written = true;
        removed
    }

    /// Write the session through the store if anything changed.
    ///
    /// No-op when nothing was written. On success the dirty flag clears, so
    /// one write reaches the backend no matter how many times this runs.
    pub async fn save(&mut self, response: &mut SessionResponse) -> SessionResult<()> {
        if !self.written {
            return Ok(());
        }
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        self.store.save(self.request, response, session).await?;
        self.written = false;
        Ok(())
    }

    /// Destroy the session.
    ///
    /// Clears the value map, invalidates backend state, expires the cookie,
    /// and resets the dirty flag so a later automatic save cannot write the
    /// destroyed data back.
    pub async fn destroy(&mut self, response: &mut SessionResponse) -> SessionResult<()> {
        self.session().await.clear();
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        self.store.destroy(self.request, response, session).await?;
        self.written = false;
        Ok(())
    }
}

/// Named stores with an explicit default.
///
/// Hosts register every store once at startup and hand the registry to
/// request handling. The default name is part of the construction and is
/// never inferred from registration order.
pub struct SessionRegistry {
    stores: HashMap<String, Arc<dyn SessionStore>>,
    default_name: String,
}

impl SessionRegistry {
    /// Create a registry whose default managers use `default_name`.
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            stores: HashMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Register a store under a cookie/session name.
    pub fn register(mut self, name: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        self.stores.insert(name.into(), store);
        self
    }

    /// Manager for the default session name.
    pub fn manager<'r>(&self, request: &'r SessionRequest) -> SessionResult<SessionManager<'r>> {
        self.manager_named(request, &self.default_name)
    }

    /// Manager for a specific registered name.
    pub fn manager_named<'r>(
        &self,
        request: &'r SessionRequest,
        name: &str,
    ) -> SessionResult<SessionManager<'r>> {
        let store = self.stores.get(name).ok_or_else(|| {
            SessionError::Config(format!("no session store registered for '{}'", name))
        })?;
        Ok(SessionManager::new(request, name, store.clone()))
    }

    /// The configured default session name.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Names with a registered store.
    pub fn names(&self) -> Vec<&String> {
        self.stores.keys().collect()
    }
}
