//! JWT-backed session store.
//!
//! Session values ride inside a signed token instead of server-side state,
//! which suits APIs where callers hold the token themselves. Tokens are
//! accepted from the `Authorization` header first and the session cookie
//! second, and every save also exposes the fresh token in an `X-JWT-Token`
//! response header for non-browser clients.

use crate::config::CookieOptions;
use crate::error::{SessionError, SessionResult};
use crate::http::{SessionRequest, SessionResponse};
use crate::session::Session;
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Response header carrying the freshly minted token.
pub const TOKEN_HEADER: &str = "X-JWT-Token";

/// Minimum accepted signing secret length in bytes.
const MIN_SECRET_LENGTH: usize = 32;

/// Claims layout for session tokens.
///
/// `exp` is omitted when the store's lifetime is zero or negative, which
/// yields tokens that never expire on their own.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub data: HashMap<String, serde_json::Value>,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Session store backed by signed JWTs.
///
/// The verifier is pinned to the configured algorithm, so a token whose
/// header names anything else is rejected outright.
pub struct JwtStore {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    options: CookieOptions,
}

impl JwtStore {
    /// Create a store from a signing secret of at least 32 bytes.
    ///
    /// Defaults to HS256, a 7 day lifetime and an HTTP-only cookie.
    pub fn new(secret: impl AsRef<[u8]>) -> SessionResult<Self> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(SessionError::Config(format!(
                "JWT secret must be at least {} bytes, got {}",
                MIN_SECRET_LENGTH,
                secret.len()
            )));
        }
        let options = CookieOptions::default()
            .with_max_age(86400 * 7)
            .with_http_only(true);
        let algorithm = Algorithm::HS256;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            validation: Self::build_validation(algorithm, options.max_age),
            options,
        })
    }

    /// Pin a different HMAC algorithm. Only the HS family is supported.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> SessionResult<Self> {
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                self.algorithm = algorithm;
                self.validation = Self::build_validation(algorithm, self.options.max_age);
                Ok(self)
            }
            _ => Err(SessionError::Config(format!(
                "unsupported JWT algorithm {:?}, expected HS256, HS384 or HS512",
                algorithm
            ))),
        }
    }

    /// Set the cookie options applied to every session from this store.
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        self.validation = Self::build_validation(self.algorithm, options.max_age);
        self.options = options;
        self
    }

    /// Set session lifetime in seconds, for the cookie and the `exp` claim.
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.options.max_age = max_age;
        self.validation = Self::build_validation(self.algorithm, max_age);
        self
    }

    fn build_validation(algorithm: Algorithm, max_age: i64) -> Validation {
        let mut validation = Validation::new(algorithm);
        if max_age <= 0 {
            validation.required_spec_claims = HashSet::new();
        }
        validation
    }

    fn token_from<'a>(&self, request: &'a SessionRequest, name: &str) -> Option<&'a str> {
        request.bearer_token().or_else(|| request.cookie(name))
    }

    fn encode_claims(&self, session: &Session) -> SessionResult<String> {
        let now = Utc::now().timestamp();
        let max_age = session.options.max_age;
        let claims = SessionClaims {
            data: session.values.clone(),
            iat: now,
            exp: (max_age > 0).then(|| now + max_age),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(self.algorithm),
            &claims,
            &self.encoding_key,
        )?)
    }

    fn decode_claims(&self, token: &str) -> SessionResult<SessionClaims> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    SessionError::Expired("JWT is past its expiry".to_string())
                }
                ErrorKind::InvalidSignature => {
                    SessionError::Decode("JWT signature mismatch".to_string())
                }
                ErrorKind::InvalidAlgorithm => {
                    SessionError::Decode("JWT algorithm does not match the store".to_string())
                }
                _ => SessionError::Decode(e.to_string()),
            })
    }
}

#[async_trait]
impl SessionStore for JwtStore {
    async fn get(&self, request: &SessionRequest, name: &str) -> (Session, Option<SessionError>) {
        self.new_session(request, name).await
    }

    async fn new_session(
        &self,
        request: &SessionRequest,
        name: &str,
    ) -> (Session, Option<SessionError>) {
        let mut session = Session::new(name, "", self.options.clone());
        let Some(token) = self.token_from(request, name) else {
            return (session, None);
        };
        match self.decode_claims(token) {
            Ok(claims) => {
                session.values = claims.data;
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
        let token = self.encode_claims(session)?;
        response.set_cookie(&session.name, &token, &session.options);
        response.set_header(TOKEN_HEADER, &token);
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
