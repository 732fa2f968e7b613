//! Session entity shared by every backend.

use crate::config::CookieOptions;
use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One client's session state for the duration of a request.
///
/// Stores build sessions in their load path and persist them in `save`;
/// handlers read and mutate the value map through the typed accessors. The ID
/// is backend-opaque and stays empty for the self-contained backends that
/// carry the whole payload in a cookie or token.
#[derive(Debug, Clone)]
pub struct Session {
    /// Backend-assigned identifier
    pub id: String,
    /// Session data as key-value pairs
    pub values: HashMap<String, serde_json::Value>,
    /// Cookie attributes used when this session is written
    pub options: CookieOptions,
    /// Whether this session was created fresh rather than decoded from the request
    pub is_new: bool,
    /// Cookie/session name this session was loaded under
    pub name: String,
}

impl Session {
    /// Create a fresh session.
    pub fn new(name: impl Into<String>, id: impl Into<String>, options: CookieOptions) -> Self {
        Self {
            id: id.into(),
            values: HashMap::new(),
            options,
            is_new: true,
            name: name.into(),
        }
    }

    /// Get a value from the session data.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.values.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Get all keys in the session data.
    pub fn keys(&self) -> Vec<&String> {
        self.values.keys().collect()
    }

    /// Clear all session data.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
