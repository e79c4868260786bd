use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, AuthService};
use crate::auth::{StoreError, TokenStore};
use crate::models::{Credentials, TokenKind, UserProfile, ValidationError};
use crate::navigation::{Navigator, Route};
use crate::notify::{self, Notifier};

use super::SessionState;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No stored session to restore")]
    NoStoredSession,
}

/// What `logout` does with local tokens when the server call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutPolicy {
    /// Leave tokens in place so the logout can be retried
    #[default]
    KeepTokens,
    /// Drop local tokens and end the session regardless
    ClearTokens,
}

/// Owns the session lifecycle: `init`, `login`, `logout`, `teardown`.
pub struct SessionManager {
    auth: AuthService,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    logout_policy: LogoutPolicy,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Create a manager in the `Initializing` state. Token store,
    /// navigator and notifier are the ones the API client was built with.
    pub fn new(auth: AuthService) -> Self {
        let api = auth.api();
        let tokens = Arc::clone(api.tokens());
        let navigator = Arc::clone(api.navigator());
        let notifier = Arc::clone(api.notifier());
        let (state, _) = watch::channel(SessionState::Initializing);

        Self {
            auth,
            tokens,
            navigator,
            notifier,
            logout_policy: LogoutPolicy::default(),
            state,
        }
    }

    pub fn with_logout_policy(mut self, policy: LogoutPolicy) -> Self {
        self.logout_policy = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user().cloned()
    }

    /// Receiver that observes every state change until `teardown`
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SessionState) {
        debug!(?state, "Session state changed");
        self.state.send_replace(state);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Startup check: restore the session from the stored refresh token.
    /// Never fails; every failure ends in `Unauthenticated`.
    pub async fn init(&self) -> SessionState {
        self.set_state(SessionState::Initializing);

        match self.restore().await {
            Ok(user) => {
                info!(user = %user.username, "Session restored");
                self.set_state(SessionState::Authenticated(user));
                if self.navigator.current() == Route::Login {
                    self.navigator.navigate(Route::Dashboard);
                }
            }
            Err(e) => {
                if matches!(e, SessionError::NoStoredSession) {
                    debug!("No stored refresh token");
                } else {
                    warn!(error = %e, "Session restore failed");
                }
                if let Err(e) = self.tokens.clear_all() {
                    error!(error = %e, "Failed to clear tokens");
                }
                self.set_state(SessionState::Unauthenticated);
                if self.navigator.current() != Route::Login {
                    self.navigator.navigate(Route::Login);
                }
            }
        }

        self.state()
    }

    async fn restore(&self) -> Result<UserProfile, SessionError> {
        let sent = self
            .tokens
            .get(TokenKind::Refresh)?
            .ok_or(SessionError::NoStoredSession)?;

        let pair = self.auth.refresh(&sent).await?;
        if pair.access_token.is_empty() {
            return Err(ApiError::InvalidResponse("refresh returned no access token".to_string()).into());
        }
        // The server rotates refresh tokens; an unchanged or missing one
        // means the exchange did not really happen.
        match pair.refresh_token.as_deref() {
            Some(rotated) if !rotated.is_empty() && rotated != sent => {}
            _ => {
                return Err(ApiError::TokenRefreshInvalid(
                    "refresh token was not rotated".to_string(),
                )
                .into())
            }
        }

        self.tokens.store_pair(&pair)?;
        Ok(self.auth.fetch_current_user().await?)
    }

    /// Sign in and load the profile. On failure the state is unchanged
    /// and the error is returned after a failure notification.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, SessionError> {
        credentials.validate()?;

        match self.try_login(credentials).await {
            Ok(user) => {
                info!(user = %user.username, "Login successful");
                self.set_state(SessionState::Authenticated(user.clone()));
                self.notifier.success(notify::LOGIN_SUCCEEDED);
                self.navigator.navigate(Route::Dashboard);
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.notifier.error(notify::LOGIN_FAILED);
                Err(e)
            }
        }
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<UserProfile, SessionError> {
        let pair = self.auth.login(credentials).await?;
        self.tokens.store_pair(&pair)?;
        Ok(self.auth.fetch_current_user().await?)
    }

    /// Sign out on the server, then locally. What happens to local tokens
    /// when the server call fails depends on the `LogoutPolicy`.
    pub async fn logout(&self) -> Result<(), SessionError> {
        match self.auth.logout().await {
            Ok(()) => {
                self.end_session()?;
                info!("Logged out");
                self.notifier.success(notify::LOGOUT_SUCCEEDED);
                self.navigator.navigate(Route::Login);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Logout failed");
                if self.logout_policy == LogoutPolicy::ClearTokens {
                    self.end_session()?;
                    self.navigator.navigate(Route::Login);
                }
                self.notifier.error(notify::LOGOUT_FAILED);
                Err(e.into())
            }
        }
    }

    fn end_session(&self) -> Result<(), StoreError> {
        self.tokens.clear_all()?;
        self.set_state(SessionState::Unauthenticated);
        Ok(())
    }

    /// End this manager. Subscribers see the channel close; stored tokens
    /// are left for the next `init`.
    pub fn teardown(self) {
        debug!(state = ?self.state(), "Session manager torn down");
    }
}
