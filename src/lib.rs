//! Server-side sessions for HTTP services.
//!
//! Four stores share one [`SessionStore`] contract: signed cookies, process
//! memory, Redis and JWTs. A [`SessionManager`] wraps a store per request,
//! loading lazily and saving only when something was written, and a
//! [`SessionRegistry`] hands out managers by session name.
//!
//! # Lenient Loads
//!
//! Loading a session never fails the request. A missing cookie yields a
//! fresh session; a tampered cookie, an expired token or an unreachable
//! backend does too, with the cause kept for inspection via
//! [`SessionManager::load_error`]. Handlers always get a usable session.
//!
//! # Stores
//!
//! - [`CookieStore`] - values live in an HMAC-signed cookie, no server state
//! - [`MemoryStore`] - per-process maps with a background sweeper
//! - [`RedisStore`] - values in Redis under a TTL
//! - [`JwtStore`] - values inside a signed token, `Authorization` aware
//!
//! # Features
//!
//! - `redis` - Redis session store (enabled by default)
//! - `jwt` - JWT session store (enabled by default)
//! - `full` - Everything above
//!
//! # Examples
//!
//! ## Cookie Sessions
//!
//! ```
//! use sessionkit::{CookieStore, SessionRegistry, SessionRequest, SessionResponse};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sessionkit::SessionError> {
//!     let store = CookieStore::new(&[b"an_application_key_32_bytes_long"])?;
//!     let registry = SessionRegistry::new("sid").register("sid", Arc::new(store));
//!
//!     let request = SessionRequest::new();
//!     let mut response = SessionResponse::new();
//!
//!     let mut manager = registry.manager(&request)?;
//!     manager.set("user_id", 123).await?;
//!     manager.save(&mut response).await?;
//!
//!     assert_eq!(response.cookies().len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Redis Sessions (Default)
//!
//! ```no_run
//! use sessionkit::{RedisStore, SessionRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sessionkit::SessionError> {
//!     let store = RedisStore::new("redis://localhost:6379")
//!         .await?
//!         .with_prefix("myapp:session:")
//!         .with_max_age(3600);
//!
//!     let _registry = SessionRegistry::new("sid").register("sid", Arc::new(store));
//!     Ok(())
//! }
//! ```
//!
//! ## JWT Sessions
//!
//! ```
//! use sessionkit::{JwtStore, SessionRequest, SessionResponse, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sessionkit::SessionError> {
//!     let store = JwtStore::new(b"an_application_key_32_bytes_long")?;
//!
//!     let request = SessionRequest::new();
//!     let mut response = SessionResponse::new();
//!
//!     let (mut session, _) = store.new_session(&request, "sid").await;
//!     session.set("user_id", 123)?;
//!     store.save(&request, &mut response, &session).await?;
//!
//!     assert!(response.header("X-JWT-Token").is_some());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cookie_store;
pub mod error;
pub mod http;
pub mod manager;
pub mod memory_store;
pub mod session;
pub mod store;

#[cfg(feature = "jwt")]
pub mod jwt_store;

#[cfg(feature = "redis")]
pub mod redis_store;

pub use config::{CookieOptions, SameSite};
pub use cookie_store::{CookieCodec, CookieStore};
pub use error::{SessionError, SessionResult};
pub use http::{Header, HeaderMap, SessionRequest, SessionResponse};
pub use manager::{SessionManager, SessionRegistry};
pub use memory_store::MemoryStore;
pub use session::Session;
pub use store::{SessionStore, generate_session_id};

#[cfg(feature = "jwt")]
pub use jwt_store::{JwtStore, SessionClaims, TOKEN_HEADER};

#[cfg(feature = "redis")]
pub use redis_store::{
    JsonSerializer, MessagePackSerializer, RedisBackend, RedisStore, SessionSerializer,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{CookieOptions, SameSite};
    pub use crate::cookie_store::CookieStore;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::http::{SessionRequest, SessionResponse};
    pub use crate::manager::{SessionManager, SessionRegistry};
    pub use crate::memory_store::MemoryStore;
    pub use crate::session::Session;
    pub use crate::store::{SessionStore, generate_session_id};

    #[cfg(feature = "jwt")]
    pub use crate::jwt_store::JwtStore;

    #[cfg(feature = "redis")]
    pub use crate::redis_store::RedisStore;
}
