//! REST API client module for the RedBot backend.
//!
//! This module provides the `SessionSecurityClient`, which attaches the
//! session bearer token and the configured secondary security headers to
//! every protected request, and turns `401`/`403` responses into explicit
//! signals for the caller (re-authenticate, or fix the security settings).
//!
//! The endpoint wrappers for accounts, tasks, logs and execution live in
//! `endpoints` and all go through `SessionSecurityClient::secure_fetch`.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod response;

pub use client::{RequestOptions, SessionSecurityClient};
pub use error::ApiError;
pub use response::{ApiResponse, FetchOutcome, Redirect, SecurityMismatch};
