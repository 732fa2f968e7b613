//! Store contract and session ID generation.

use crate::error::{SessionError, SessionResult};
use crate::http::{SessionRequest, SessionResponse};
use crate::session::Session;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};

/// Minimum length of a generated session ID.
const MIN_SESSION_ID_LENGTH: usize = 32;

/// Backend contract every session store implements.
///
/// The load operations never fail outright: malformed, tampered, or stale
/// transport data degrades to a fresh session, returned together with the
/// error that caused the degradation so callers can inspect it. Save and
/// destroy failures are returned verbatim; nothing is retried.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for `name`, reusing transport state when present.
    async fn get(&self, request: &SessionRequest, name: &str)
    -> (Session, Option<SessionError>);

    /// Build a session for `name` directly from the transport.
    ///
    /// `get` delegates here in every provided backend; the split leaves room
    /// for hosts that cache sessions per request on top of a store.
    async fn new_session(
        &self,
        request: &SessionRequest,
        name: &str,
    ) -> (Session, Option<SessionError>);

    /// Persist the session and emit its cookie (and any token headers).
    async fn save(
        &self,
        request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()>;

    /// Invalidate the session's backend state and expire its cookie.
    async fn destroy(
        &self,
        request: &SessionRequest,
        response: &mut SessionResponse,
        session: &Session,
    ) -> SessionResult<()>;
}

/// Generate a random alphanumeric session ID.
///
/// Lengths below 32 characters are silently clamped up. Thirty-two
/// alphanumeric characters carry roughly 190 bits of entropy, which makes
/// collisions negligible; stores use a generated ID without probing the
/// backend for an existing entry.
pub fn generate_session_id(length: usize) -> String {
    let length = length.max(MIN_SESSION_ID_LENGTH);
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
