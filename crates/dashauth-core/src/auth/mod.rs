//! Token persistence.
//!
//! This module provides:
//! - `TokenStore`: get/set/clear access to the access and refresh tokens
//! - `FileTokenStore`: JSON record on disk, replaced atomically on every write
//! - `KeyringTokenStore`: the same record held in the OS keychain
//! - `MemoryTokenStore`: process-local storage for tests and throwaway sessions
//!
//! Nothing above this module reads token storage except through `TokenStore`.

pub mod keychain;
pub mod store;

pub use keychain::KeyringTokenStore;
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
