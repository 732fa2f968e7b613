//! Cookie attribute configuration shared by every session backend.

use chrono::Utc;

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied to every cookie a session store writes.
///
/// `max_age` doubles as the session lifetime: it drives the Redis TTL, the
/// memory sweep cutoff, and the JWT expiry claim in addition to the cookie's
/// own `Max-Age`/`Expires` attributes.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Cookie path
    pub path: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Lifetime in seconds: positive sets `Max-Age` and `Expires`, zero
    /// makes a session-scoped cookie, negative expires the cookie immediately
    pub max_age: i64,

    /// Secure flag (HTTPS only)
    pub secure: bool,

    /// HttpOnly flag
    pub http_only: bool,

    /// SameSite policy
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: 86400 * 30, // 30 days
            secure: false,
            http_only: false,
            same_site: SameSite::Lax,
        }
    }
}

impl CookieOptions {
    /// Create options with the default attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cookie path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the cookie domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the lifetime in seconds.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// Set the Secure flag.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the HttpOnly flag.
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the SameSite policy.
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Derive the options used to expire this cookie on destroy.
    ///
    /// Path, domain, and flags are preserved so the expired cookie matches
    /// the one the browser already holds.
    pub fn expired(&self) -> Self {
        let mut options = self.clone();
        options.max_age = -1;
        options
    }

    /// Render a Set-Cookie header value with these attributes.
    pub fn header_value(&self, name: &str, value: &str) -> String {
        let mut cookie = format!("{}={}; Path={}", name, value, self.path);

        if let Some(ref domain) = self.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }

        if self.max_age > 0 {
            let expires = Utc::now() + chrono::Duration::seconds(self.max_age);
            cookie.push_str(&format!("; Max-Age={}", self.max_age));
            cookie.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        } else if self.max_age < 0 {
            cookie.push_str("; Max-Age=0");
            cookie.push_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
        }

        if self.secure {
            cookie.push_str("; Secure");
        }

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }

        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));

        cookie
    }
}
