//! Data models shared across the auth lifecycle.
//!
//! - `Credentials`: transient login form input, never persisted
//! - `TokenPair`: login/refresh response body from the auth endpoints
//! - `TokenRecord`: the persisted access/refresh token record
//! - `UserProfile`: the current user, held only in memory

pub mod credentials;
pub mod token;
pub mod user;

pub use credentials::{Credentials, ValidationError};
pub use token::{TokenKind, TokenPair, TokenRecord};
pub use user::UserProfile;
