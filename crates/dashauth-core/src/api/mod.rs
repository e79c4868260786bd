//! REST API client module for the admin backend.
//!
//! `ApiClient` is the single request pipeline every call goes through:
//! it attaches the stored bearer token, unwraps response bodies, and on a
//! 401 exchanges the refresh token once and replays the request.
//! `AuthService` maps the auth endpoints onto that pipeline.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::AuthService;
pub use client::ApiClient;
pub use error::ApiError;
