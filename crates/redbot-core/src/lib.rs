//! Core library for the RedBot console.
//!
//! The console talks to the RedBot automation backend over REST. Every
//! protected call goes through [`SessionSecurityClient`], which owns the
//! persisted session token and the optional secondary security credentials
//! (shared secret or token + signature pair) the backend may require.
//!
//! - [`auth`]: credential state, header construction, persisted stores
//! - [`api`]: the guarded request wrapper and the REST endpoints
//! - [`models`]: accounts, tasks, execution logs
//! - [`metrics`]: aggregate counts over accounts and tasks
//! - [`config`]: console configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod models;

pub use api::{ApiError, ApiResponse, FetchOutcome, Redirect, RequestOptions, SessionSecurityClient};
pub use auth::{SecurityCredentials, SecurityMode, SessionCredentials};
pub use config::Config;
