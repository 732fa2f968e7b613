//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
///
/// Load-path failures (missing cookies, tampered payloads, stale backend
/// entries) are advisory: stores report them alongside a usable fresh session
/// instead of failing the request. Write-path and configuration failures are
/// hard errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// JWT-specific error
    #[cfg(feature = "jwt")]
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Session not found in the backend
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Session or token expired
    #[error("Session expired: {0}")]
    Expired(String),

    /// Transport data failed decoding or authentication
    #[error("Decode error: {0}")]
    Decode(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Operation timeout
    #[error("Operation timeout")]
    Timeout,
}
