//! Session lifecycle.
//!
//! `SessionManager` owns the login, logout and startup-refresh
//! orchestration and publishes a `SessionState` that route guards and
//! front ends observe. Instances are explicit; nothing here is global.

pub mod manager;
pub mod state;

pub use manager::{LogoutPolicy, SessionError, SessionManager};
pub use state::SessionState;
