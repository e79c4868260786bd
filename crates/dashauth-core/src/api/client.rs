//! API client for the admin backend.
//!
//! Every request goes through `ApiClient`, which plays the part of the
//! request/response interceptors:
//!
//! - the stored access token, if any, is attached as a bearer credential
//! - successful responses are unwrapped to their JSON body
//! - 401 triggers one refresh-token exchange and a replay of the request
//! - 403 redirects to the forbidden page
//! - 500, other statuses and network failures raise a notification

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Request, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::models::{TokenKind, TokenPair};
use crate::navigation::{Navigator, Route};
use crate::notify::{self, Notifier};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Path prefix for all API endpoints
pub const API_PREFIX: &str = "/api/v1";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

pub(crate) const LOGIN_PATH: &str = "/auth/login";
pub(crate) const REFRESH_PATH: &str = "/auth/refresh";
pub(crate) const LOGOUT_PATH: &str = "/auth/logout";
pub(crate) const CURRENT_USER_PATH: &str = "/users/me";

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// API client. Clone is cheap; clones share the connection pool, the
/// token store and the refresh guard.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    /// Held for the duration of a refresh exchange
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a client for the backend at `origin` (scheme and host, no path)
    pub fn new(
        origin: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::NetworkError)?;

        Ok(Self {
            client,
            base_url: format!("{}{}", origin.trim_end_matches('/'), API_PREFIX),
            tokens,
            navigator,
            notifier,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Public request helpers =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Self::read_json(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(self.client.post(self.url(path)).json(body)).await?;
        Self::read_json(response).await
    }

    /// POST without a body, ignoring whatever the server returns
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.client.post(self.url(path))).await?;
        Ok(())
    }

    /// Form POST that does not take part in 401 handling. Used for the
    /// login endpoint, where a 401 means bad credentials.
    pub(crate) async fn post_form_direct<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self
            .send_direct(self.client.post(self.url(path)).form(fields))
            .await?;
        Self::read_json(response).await
    }

    /// Exchange a refresh token for a new pair. Bypasses 401 handling.
    pub(crate) async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenPair, ApiError> {
        let builder = self
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token });

        let response = self.send_direct(builder).await.map_err(|e| match e {
            ApiError::Unauthorized => {
                ApiError::TokenRefreshInvalid("refresh token expired or revoked".to_string())
            }
            ApiError::Forbidden(detail) => ApiError::TokenRefreshInvalid(detail),
            ApiError::RequestFailed {
                status: 400 | 422,
                detail,
            } => ApiError::TokenRefreshInvalid(detail),
            other => other,
        })?;

        Self::read_json(response).await
    }

    // ===== Pipeline =====

    /// Build the request and attach the stored access token.
    /// Returns the token that was attached.
    fn prepare(&self, builder: RequestBuilder) -> Result<(Request, Option<String>), ApiError> {
        let mut request = builder.build().map_err(ApiError::NetworkError)?;
        let token = self.tokens.get(TokenKind::Access)?;
        if let Some(ref token) = token {
            Self::set_bearer(&mut request, token)?;
        }
        Ok((request, token))
    }

    fn set_bearer(request: &mut Request, token: &str) -> Result<(), ApiError> {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidToken)?;
        value.set_sensitive(true);
        request.headers_mut().insert(header::AUTHORIZATION, value);
        Ok(())
    }

    async fn dispatch(&self, request: Request) -> Result<Response, ApiError> {
        debug!(method = %request.method(), path = request.url().path(), "Sending request");
        self.client.execute(request).await.map_err(|e| {
            warn!(error = %e, "Request failed without a response");
            self.notifier.error(notify::NETWORK_ERROR);
            ApiError::NetworkError(e)
        })
    }

    /// Full pipeline, including the refresh-and-replay path for 401.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let (request, sent_token) = self.prepare(builder)?;
        let replay = request.try_clone();

        let response = self.dispatch(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return self.handle_unauthorized(replay, sent_token.as_deref()).await;
        }
        Err(self.reject(response).await)
    }

    /// Pipeline without 401 handling. A 401 comes back as `Unauthorized`
    /// with no side effects; every other status is handled as usual.
    async fn send_direct(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let (request, _) = self.prepare(builder)?;
        let response = self.dispatch(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.reject(response).await)
        }
    }

    /// Turn an unsuccessful response into an error, running the status
    /// side effects on the way.
    async fn reject(&self, response: Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => {}
            StatusCode::FORBIDDEN => {
                warn!("Access denied, redirecting to forbidden page");
                self.navigator.redirect(Route::Forbidden);
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                self.notifier.error(notify::SERVER_ERROR);
            }
            _ => {
                let message = ApiError::server_detail(&body)
                    .unwrap_or_else(|| notify::REQUEST_FAILED.to_string());
                self.notifier.error(&message);
            }
        }

        ApiError::from_status(status, &body)
    }

    async fn handle_unauthorized(
        &self,
        replay: Option<Request>,
        rejected_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let access_token = self.refresh_access_token(rejected_token).await?;

        let Some(mut request) = replay else {
            return Err(ApiError::InvalidResponse(
                "request body cannot be replayed".to_string(),
            ));
        };
        Self::set_bearer(&mut request, &access_token)?;

        debug!("Replaying request with refreshed access token");
        let response = self.dispatch(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("Replayed request still unauthorized, ending session");
            self.expire_session()?;
            return Err(ApiError::Unauthorized);
        }
        Err(self.reject(response).await)
    }

    /// Obtain a usable access token after `rejected` was refused.
    ///
    /// Refreshes are serialized, and a failed refresh ends the session
    /// before the guard is released. A caller that waited behind another
    /// refresh either finds the stored token replaced and reuses it, or
    /// finds the store emptied and gives up without a second redirect.
    async fn refresh_access_token(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let record = self.tokens.load()?;
        if let Some(current) = record.access_token.clone() {
            if rejected != Some(current.as_str()) {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
        } else if rejected.is_some() && record.is_empty() {
            debug!("Session already ended by a concurrent request");
            return Err(ApiError::Unauthorized);
        }

        let exchanged = match record.refresh_token {
            Some(ref refresh_token) => self.exchange_refresh_token(refresh_token).await,
            None => Err(ApiError::TokenRefreshInvalid(
                "no refresh token stored".to_string(),
            )),
        };

        match exchanged {
            Ok(pair) => {
                self.tokens.store_pair(&pair)?;
                info!("Access token refreshed");
                Ok(pair.access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.expire_session()?;
                Err(ApiError::Unauthorized)
            }
        }
    }

    /// Drop all tokens and force a full navigation to the login page.
    fn expire_session(&self) -> Result<(), ApiError> {
        self.tokens.clear_all()?;
        self.navigator.redirect(Route::Login);
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await.map_err(ApiError::NetworkError)?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================
