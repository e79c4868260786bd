//! Client-side authentication lifecycle for the admin dashboard.
//!
//! Leaves first:
//!
//! - [`auth`]: token persistence behind the `TokenStore` trait
//! - [`api`]: the shared request pipeline and the auth endpoints
//! - [`session`]: login, logout and startup refresh orchestration
//! - [`navigation`]: routes, the `Navigator` seam and the route guard
//! - [`notify`]: transient user-facing notifications
//!
//! A front end wires these together once:
//!
//! ```no_run
//! use std::sync::Arc;
//! use dashauth_core::{ApiClient, AuthService, Config, LogNotifier, Route, Router, SessionManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let api = ApiClient::new(
//!     &config.api_origin,
//!     config.timeout(),
//!     config.open_token_store()?,
//!     Arc::new(Router::new(Route::Dashboard)),
//!     Arc::new(LogNotifier),
//! )?;
//! let session = SessionManager::new(AuthService::new(api));
//! session.init().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;
pub mod notify;
pub mod session;

pub use api::{ApiClient, ApiError, AuthService};
pub use auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, StoreError, TokenStore};
pub use config::{Config, TokenBackend};
pub use models::{Credentials, TokenKind, TokenPair, TokenRecord, UserProfile, ValidationError};
pub use navigation::{GuardDecision, Navigation, NavigationKind, Navigator, Route, RouteGuard, Router};
pub use notify::{LogNotifier, Notification, NotificationLevel, NotificationLog, Notifier};
pub use session::{LogoutPolicy, SessionError, SessionManager, SessionState};
