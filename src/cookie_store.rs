//! Cookie-backed session store.
//!
//! Session values travel inside the cookie itself: a base64url JSON payload
//! followed by an HMAC-SHA256 signature over the session name and payload.
//! Nothing is kept server-side, so the store scales to any number of nodes
//! but the values are readable by the client. Keep secrets out of it.

use crate::config::CookieOptions;
use crate::error::{SessionError, SessionResult};
use crate::http::{SessionRequest, SessionResponse};
use crate::session::Session;
use crate::store::SessionStore;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted signing key length in bytes.
const MIN_KEY_LENGTH: usize = 32;

#[derive(Serialize, Deserialize)]
struct CookiePayload {
    values: HashMap<String, serde_json::Value>,
    iat: i64,
}

/// One signing key with its freshness window.
///
/// A codec signs and verifies cookie values for a single key. The store
/// keeps a chain of them so keys can rotate without logging everyone out.
pub struct CookieCodec {
    key: Vec<u8>,
    max_age: i64,
}

impl CookieCodec {
    /// Create a codec from a signing key of at least 32 bytes.
    pub fn new(key: impl AsRef<[u8]>) -> SessionResult<Self> {
        let key = key.as_ref();
        if key.len() < MIN_KEY_LENGTH {
            return Err(SessionError::Config(format!(
                "cookie signing key must be at least {} bytes, got {}",
                MIN_KEY_LENGTH,
                key.len()
            )));
        }
        Ok(Self {
            key: key.to_vec(),
            max_age: CookieOptions::default().max_age,
        })
    }

    /// Set the freshness window enforced against the signed timestamp.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Encode session values into a signed cookie value.
    pub fn encode(
        &self,
        name: &str,
        values: &HashMap<String, serde_json::Value>,
    ) -> SessionResult<String> {
        let payload = CookiePayload {
            values: values.clone(),
            iat: Utc::now().timestamp(),
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        let encoded = general_purpose::URL_SAFE_NO_PAD.encode(json);
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(self.sign(name, &encoded));
        Ok(format!("{}.{}", encoded, signature))
    }

    /// Verify and decode a cookie value into session values.
    pub fn decode(
        &self,
        name: &str,
        value: &str,
    ) -> SessionResult<HashMap<String, serde_json::Value>> {
        let Some((encoded, signature)) = value.rsplit_once('.') else {
            return Err(SessionError::Decode(
                "cookie value is missing its signature".to_string(),
            ));
        };

        let signature = general_purpose::URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| SessionError::Decode(format!("invalid signature encoding: {}", e)))?;

        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(encoded.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            return Err(SessionError::Decode(
                "cookie signature mismatch".to_string(),
            ));
        }

        let json = general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| SessionError::Decode(format!("invalid payload encoding: {}", e)))?;
        let payload: CookiePayload = serde_json::from_slice(&json)
            .map_err(|e| SessionError::Deserialization(e.to_string()))?;

        if self.max_age > 0 && Utc::now().timestamp() - payload.iat > self.max_age {
            return Err(SessionError::Expired(format!(
                "cookie issued at {} is past its {}s window",
                payload.iat, self.max_age
            )));
        }

        Ok(payload.values)
    }

    fn sign(&self, name: &str, encoded: &str) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(encoded.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Session store that keeps all state in a signed cookie.
///
/// Multiple keys support rotation: new cookies are signed with the first
/// key, and incoming cookies are tried against every key in order. Deploy a
/// new key by prepending it and keep the old key listed until its cookies
/// have aged out.
pub struct CookieStore {
    codecs: Vec<CookieCodec>,
    options: CookieOptions,
}

impl CookieStore {
    /// Create a store from one or more signing keys, newest first.
    pub fn new<K: AsRef<[u8]>>(keys: &[K]) -> SessionResult<Self> {
        if keys.is_empty() {
            return Err(SessionError::Config(
                "cookie store requires at least one signing key".to_string(),
            ));
        }
        let options = CookieOptions::default();
        let mut codecs = Vec::with_capacity(keys.len());
        for key in keys {
            codecs.push(CookieCodec::new(key)?.with_max_age(options.max_age));
        }
        Ok(Self { codecs, options })
    }

    /// Set the cookie options applied to every session from this store.
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        for codec in &mut self.codecs {
            codec.max_age = options.max_age;
        }
        self.options = options;
        self
    }

    /// Set session lifetime in seconds, for the cookie and the signed payload.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.options.max_age = max_age;
        for codec in &mut self.codecs {
            codec.max_age = max_age;
        }
        self
    }

    fn decode_any(
        &self,
        name: &str,
        value: &str,
    ) -> SessionResult<HashMap<String, serde_json::Value>> {
        let mut last_error = SessionError::Decode("no codecs configured".to_string());
        for codec in &self.codecs {
            match codec.decode(name, value) {
                Ok(values) => return Ok(values),
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl SessionStore for CookieStore {
    async fn get(&self, request: &SessionRequest, name: &str) -> (Session, Option<SessionError>) {
        self.new_session(request, name).await
    }

    async fn new_session(
        &self,
        request: &SessionRequest,
        name: &str,
    ) -> (Session, Option<SessionError>) {
        let mut session = Session::new(name, "", self.options.clone());
        let Some(value) = request.cookie(name) else {
            return (session, None);
        };
        match self.decode_any(name, value) {
            Ok(values) => {
                session.values = values;
                session.is_new = false;
                (session, None)
            }
            Err(e) => (session, Some(e)),
        }
    }

    async fn save(
        &self,
        _request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()> {
        let Some(codec) = self.codecs.first() else {
            return Err(SessionError::Config(
                "cookie store has no signing key".to_string(),
            ));
        };
        let value = codec.encode(&session.name, &session.values)?;
        response.set_cookie(&session.name, &value, &session.options);
        Ok(())
    }

    async fn destroy(
        &self,
        _request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()> {
        response.set_cookie(&session.name, "", &session.options.expired());
        Ok(())
    }
}
