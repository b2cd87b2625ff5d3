//! Shared-secret gate in front of the administration surfaces.
//!
//! A single username/password pair from configuration unlocks admin
//! operations; a successful login produces the session cookie the web
//! admin panel expects, and [`guard_route`] mirrors its redirect rules.

use std::error::Error as StdError;
use std::fmt;

pub const ADMIN_COOKIE: &str = "admin_auth";
pub const ADMIN_COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24;
pub const LOGIN_PATH: &str = "/admin/login";
pub const ADMIN_HOME: &str = "/admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No admin credentials are configured, so nobody can log in.
    NotConfigured,
    InvalidCredentials,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::NotConfigured => write!(f, "Admin credentials are not configured"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
        }
    }
}

impl StdError for AuthError {}

#[derive(Clone)]
pub struct AdminGate {
    credentials: Option<(String, String)>,
    production: bool,
}

impl fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGate")
            .field("configured", &self.credentials.is_some())
            .field("production", &self.production)
            .finish()
    }
}

/// Proof of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    cookie: String,
}

impl AdminSession {
    /// `Set-Cookie` header value for the admin panel.
    pub fn set_cookie_header(&self) -> &str {
        &self.cookie
    }
}

impl AdminGate {
    pub fn new(username: Option<String>, password: Option<String>, production: bool) -> Self {
        let credentials = match (username, password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        };
        Self {
            credentials,
            production,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn login(&self, username: &str, password: &str) -> Result<AdminSession, AuthError> {
        let (expected_user, expected_pass) =
            self.credentials.as_ref().ok_or(AuthError::NotConfigured)?;
        if username != expected_user || password != expected_pass {
            tracing::warn!(username, "Rejected admin login");
            return Err(AuthError::InvalidCredentials);
        }

        let secure = if self.production { " Secure;" } else { "" };
        Ok(AdminSession {
            cookie: format!(
                "{ADMIN_COOKIE}=true; Path=/; HttpOnly; Max-Age={ADMIN_COOKIE_MAX_AGE_SECS};{secure} SameSite=Strict"
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether a request for `path` may proceed given the cookie state.
pub fn guard_route(path: &str, has_admin_cookie: bool) -> RouteDecision {
    if path == LOGIN_PATH {
        return if has_admin_cookie {
            RouteDecision::Redirect(ADMIN_HOME)
        } else {
            RouteDecision::Allow
        };
    }
    if path.starts_with(ADMIN_HOME) && !has_admin_cookie {
        return RouteDecision::Redirect(LOGIN_PATH);
    }
    RouteDecision::Allow
}
