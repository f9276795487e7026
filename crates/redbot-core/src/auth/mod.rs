//! Session and security-credential management.
//!
//! This module provides:
//! - `SessionCredentials`: the session token plus the selected security mode
//!   and its secondary credentials
//! - `build_headers`: per-request auth header construction
//! - `SessionStore`: persisted storage for the credentials, either as a JSON
//!   file in the cache directory or in the OS keychain
//!
//! The secondary credentials are the client's local belief about what the
//! backend expects; they are only changed by explicit configuration.

pub mod credentials;
pub mod headers;
pub mod keyring_store;
pub mod store;

pub use credentials::{
    SecurityConfigError, SecurityCredentials, SecurityMode, SecurityPrefill, SessionCredentials,
    UnknownSecurityMode,
};
pub use headers::build_headers;
pub use keyring_store::KeyringSessionStore;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
