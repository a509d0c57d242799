//! Persisted login session: bearer token, account type and expiry.

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{info, warn};

use super::credentials::TokenStore;
use super::token::{self, TokenClaims};
use crate::api::types::{AuthResponse, UserType};
use crate::error::{Result, SolarDetectError};

const TOKEN_KEY: &str = "token";
const USER_TYPE_KEY: &str = "userType";
const EXPIRY_KEY: &str = "sessionExpiry";

/// Route prefixes that need a live session.
const PROTECTED_PREFIXES: &[&str] = &["/solardetect", "/user"];

/// Where the login flow sends an unauthenticated visitor.
pub const LOGIN_PATH: &str = "/login";

/// A stored session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_type: Option<UserType>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of guarding a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
}

pub fn requires_auth(path: &str) -> bool {
    PROTECTED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Reject an auth response issued for the other account type.
pub fn ensure_user_type(response: &AuthResponse, expected: UserType) -> Result<()> {
    if response.user_type != expected {
        return Err(SolarDetectError::InvalidInput(format!(
            "account is {} but this login is for {}",
            response.user_type, expected
        )));
    }
    Ok(())
}

/// Reads and writes the session through a [`TokenStore`].
pub struct SessionManager<S: TokenStore> {
    store: S,
}

impl<S: TokenStore> SessionManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persist a fresh login. The session lives until the token's own expiry,
    /// or 24 hours when the token has none.
    pub fn set_auth(&self, response: &AuthResponse, now: DateTime<Utc>) -> Result<Session> {
        let expires_at = token::session_expiry(&response.token, now);

        self.store.set(TOKEN_KEY, &response.token)?;
        self.store.set(USER_TYPE_KEY, response.user_type.as_str())?;
        self.store
            .set(EXPIRY_KEY, &expires_at.timestamp().to_string())?;

        info!(user_type = %response.user_type, %expires_at, "Session stored");
        Ok(Session {
            token: response.token.clone(),
            user_type: Some(response.user_type),
            expires_at,
        })
    }

    pub fn clear_auth(&self) -> Result<()> {
        self.store.delete(TOKEN_KEY)?;
        self.store.delete(USER_TYPE_KEY)?;
        self.store.delete(EXPIRY_KEY)?;
        info!("Session cleared");
        Ok(())
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.store.get(TOKEN_KEY)
    }

    /// Stored account type. An unreadable value counts as absent.
    pub fn user_type(&self) -> Result<Option<UserType>> {
        Ok(self
            .store
            .get(USER_TYPE_KEY)?
            .and_then(|raw| match raw.parse() {
                Ok(user_type) => Some(user_type),
                Err(e) => {
                    warn!(error = %e, "Ignoring stored user type");
                    None
                }
            }))
    }

    /// Stored session expiry, falling back to the token's own `exp`.
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>> {
        let stored = self
            .store
            .get(EXPIRY_KEY)?
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        if stored.is_some() {
            return Ok(stored);
        }
        Ok(self.token()?.as_deref().and_then(token::expires_at))
    }

    /// True when a token is stored, regardless of its expiry.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.token()?.is_some())
    }

    /// The stored session, if one exists and has not expired at `now`.
    pub fn current(&self, now: DateTime<Utc>) -> Result<Option<Session>> {
        let Some(token) = self.token()? else {
            return Ok(None);
        };

        let expires_at = self
            .expires_at()?
            .unwrap_or_else(|| token::session_expiry(&token, now));

        if expires_at <= now {
            return Ok(None);
        }

        Ok(Some(Session {
            token,
            user_type: self.user_type()?,
            expires_at,
        }))
    }

    /// Token for an authenticated call, or `NotAuthenticated`.
    pub fn require_token(&self, now: DateTime<Utc>) -> Result<String> {
        self.current(now)?
            .map(|session| session.token)
            .ok_or(SolarDetectError::NotAuthenticated)
    }

    /// Whether the stored token should be refreshed; true if there is none.
    pub fn needs_refresh(&self, now: DateTime<Utc>, window: Duration) -> Result<bool> {
        Ok(match self.token()? {
            Some(token) => token::is_near_expiration(&token, now, window),
            None => true,
        })
    }

    pub fn claims(&self) -> Result<Option<TokenClaims>> {
        Ok(self.token()?.as_deref().and_then(token::decode_claims))
    }

    /// Gate a route: protected paths need a live session.
    pub fn guard(&self, path: &str, now: DateTime<Utc>) -> Result<RouteDecision> {
        if !requires_auth(path) {
            return Ok(RouteDecision::Allow);
        }
        Ok(match self.current(now)? {
            Some(_) => RouteDecision::Allow,
            None => RouteDecision::RedirectToLogin,
        })
    }
}
