use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window before expiry in which the access token counts as due for refresh
const TOKEN_REFRESH_BUFFER_SECS: i64 = 60;

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body returned by the login and refresh endpoints.
///
/// The login endpoint may omit `refresh_token`; callers keep whatever
/// refresh token they already hold in that case.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// The two token slots of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Storage key, kept compatible with the browser client's local storage keys
    pub fn key(self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Persisted token state. Both slots live in one record so a pair is
/// always written in a single operation.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    pub fn get(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Access => self.access_token.as_deref(),
            TokenKind::Refresh => self.refresh_token.as_deref(),
        }
    }

    pub fn set(&mut self, kind: TokenKind, value: String) {
        match kind {
            TokenKind::Access => {
                self.access_token = Some(value);
                // Expiry is unknown for a bare access token
                self.expires_at = None;
            }
            TokenKind::Refresh => self.refresh_token = Some(value),
        }
    }

    pub fn clear(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Access => {
                self.access_token = None;
                self.expires_at = None;
            }
            TokenKind::Refresh => self.refresh_token = None,
        }
    }

    /// Merge a freshly issued pair. The refresh token is replaced only
    /// when the server returned one. An `expires_in` that is not positive
    /// or does not fit in a timestamp leaves the expiry unknown.
    pub fn apply(&mut self, pair: &TokenPair) {
        self.access_token = Some(pair.access_token.clone());
        self.expires_at = Some(pair.expires_in)
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        if let Some(ref refresh) = pair.refresh_token {
            self.refresh_token = Some(refresh.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// True when the access token is known to have lapsed
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Utc::now() > at).unwrap_or(false)
    }

    /// Check if the access token will expire soon
    pub fn needs_refresh(&self) -> bool {
        self.expires_at
            .map(|at| Utc::now() + Duration::seconds(TOKEN_REFRESH_BUFFER_SECS) > at)
            .unwrap_or(false)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.expires_at
            .map(|at| (at - Utc::now()).num_minutes().max(0))
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
