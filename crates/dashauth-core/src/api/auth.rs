use crate::models::{Credentials, TokenPair, UserProfile};

use super::client::{CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH};
use super::{ApiClient, ApiError};

/// The auth endpoints. No retries of its own; refresh-and-replay lives in
/// `ApiClient`.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Submit credentials as a form and return the issued tokens
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        self.api
            .post_form_direct(LOGIN_PATH, &credentials.form_fields())
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized | ApiError::RequestFailed { status: 400, .. } => {
                    ApiError::AuthenticationRejected
                }
                other => other,
            })
    }

    /// Exchange a refresh token for a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.api.exchange_refresh_token(refresh_token).await
    }

    /// Tell the server the session is over
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.api.post_empty(LOGOUT_PATH).await
    }

    pub async fn fetch_current_user(&self) -> Result<UserProfile, ApiError> {
        self.api.get(CURRENT_USER_PATH).await
    }
}
