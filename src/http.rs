//! Minimal request and response carriers for session transport.
//!
//! Session stores only ever touch headers: `Cookie` and `Authorization` on
//! the way in, `Set-Cookie` and token headers on the way out. Hosts adapt
//! their framework's request into these carriers instead of this crate
//! depending on any one HTTP stack.

use crate::config::CookieOptions;
use smallvec::SmallVec;
use std::fmt;

/// Headers stored inline before spilling to the heap.
const INLINE_HEADERS: usize = 8;

/// A header name-value pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name (case-insensitive for lookup)
    pub name: String,
    /// Header value
    pub value: String,
}

impl Header {
    /// Create a new header
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Check if name matches (case-insensitive)
    pub fn name_eq(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// A compact header map with case-insensitive name lookup.
///
/// Stores a handful of headers inline, which covers the session slice of a
/// typical request without heap allocation.
#[derive(Clone, Default)]
pub struct HeaderMap {
    inner: SmallVec<[Header; INLINE_HEADERS]>,
}

impl HeaderMap {
    /// Create a new empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of headers.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get header value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&String> {
        self.inner
            .iter()
            .find(|h| h.name_eq(name))
            .map(|h| &h.value)
    }

    /// Check if header exists (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|h| h.name_eq(name))
    }

    /// Insert a header, replacing any existing header with the same name.
    ///
    /// Returns the old value if replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        for h in &mut self.inner {
            if h.name_eq(&name) {
                let old = std::mem::replace(&mut h.value, value);
                return Some(old);
            }
        }

        self.inner.push(Header { name, value });
        None
    }

    /// Append a header, keeping any existing headers with the same name.
    ///
    /// Use for headers that can carry multiple values (e.g., Set-Cookie).
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push(Header {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Get all values for a header name (for multi-value headers).
    pub fn get_all(&self, name: &str) -> Vec<&String> {
        self.inner
            .iter()
            .filter(|h| h.name_eq(name))
            .map(|h| &h.value)
            .collect()
    }

    /// Remove a header by name (case-insensitive).
    ///
    /// Returns the removed value if found.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        if let Some(pos) = self.inner.iter().position(|h| h.name_eq(name)) {
            Some(self.inner.remove(pos).value)
        } else {
            None
        }
    }

    /// Iterate over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.inner.iter().map(|h| (&h.name, &h.value))
    }
}

impl fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.iter().map(|h| (&h.name, &h.value)))
            .finish()
    }
}

/// The slice of an incoming request a session store reads.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    /// Request headers
    pub headers: HeaderMap,
}

impl SessionRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    /// Look up a cookie by name in the Cookie header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        for header in self.headers.get_all("Cookie") {
            for pair in header.split(';') {
                if let Some((key, value)) = pair.split_once('=') {
                    if key.trim() == name {
                        return Some(value.trim());
                    }
                }
            }
        }
        None
    }

    /// Token from the Authorization header, with or without the Bearer prefix.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get("Authorization")?;
        let token = value.strip_prefix("Bearer ").unwrap_or(value.as_str());
        let token = token.trim();
        if token.is_empty() { None } else { Some(token) }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a cookie to the Cookie header.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        let pair = format!("{}={}", name, value);
        let combined = match self.headers.get("Cookie") {
            Some(existing) => format!("{}; {}", existing, pair),
            None => pair,
        };
        self.headers.insert("Cookie", combined);
        self
    }
}

/// The slice of an outgoing response a session store writes.
#[derive(Debug, Clone, Default)]
pub struct SessionResponse {
    /// Response headers
    pub headers: HeaderMap,
}

impl SessionResponse {
    /// Create an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Append a Set-Cookie header rendered from the options.
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) {
        self.headers
            .append("Set-Cookie", options.header_value(name, value));
    }

    /// All Set-Cookie header values emitted so far.
    pub fn cookies(&self) -> Vec<&String> {
        self.headers.get_all("Set-Cookie")
    }
}
