//! Session-aware client for the RedBot REST API.
//!
//! `SessionSecurityClient` owns the persisted `SessionCredentials` and wraps
//! every protected request with the matching auth headers.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ApiError, ApiResponse, FetchOutcome, Redirect, SecurityMismatch};
use crate::auth::headers::merge_over;
use crate::auth::{
    build_headers, SecurityConfigError, SecurityCredentials, SecurityMode, SessionCredentials,
    SessionStore,
};
use crate::config::Config;

/// Per-request options for `secure_fetch`.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Merged over the auth headers; these win on conflict.
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    /// Overrides the client-wide timeout.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json<B: Serialize + ?Sized>(body: &B) -> Result<Self, ApiError> {
        Ok(Self {
            body: Some(serde_json::to_value(body)?),
            ..Self::default()
        })
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// API client that carries the session and security credentials.
/// Clone is cheap and every clone shares the same credential state.
#[derive(Clone)]
pub struct SessionSecurityClient {
    http: Client,
    base_url: String,
    state: Arc<RwLock<SessionCredentials>>,
    store: Arc<dyn SessionStore>,
}

impl SessionSecurityClient {
    /// Create a client, restoring any snapshot persisted in `store`.
    pub fn new(config: &Config, store: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let credentials = store.load().context("Failed to load saved session")?;
        debug!(
            mode = %credentials.security_mode,
            logged_in = credentials.session_token().is_some(),
            "Restored session snapshot"
        );

        Ok(Self {
            http,
            base_url: config.api_base_url().to_string(),
            state: Arc::new(RwLock::new(credentials)),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionCredentials> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionCredentials> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current credentials.
    pub fn credentials(&self) -> SessionCredentials {
        self.read_state().clone()
    }

    pub fn security_mode(&self) -> SecurityMode {
        self.read_state().security_mode
    }

    pub fn is_logged_in(&self) -> bool {
        self.read_state().session_token().is_some()
    }

    /// Compute the next state from the current one, persist it, then swap
    /// it in. On any error neither the store nor memory changes.
    fn transition<E>(
        &self,
        next: impl FnOnce(&SessionCredentials) -> Result<SessionCredentials, E>,
    ) -> Result<(), E>
    where
        E: From<anyhow::Error>,
    {
        let mut state = self.write_state();
        let updated = next(&state)?;
        self.store.save(&updated)?;
        *state = updated;
        Ok(())
    }

    /// Store the bearer token issued at login.
    pub fn set_session_token(&self, token: impl Into<String>) -> anyhow::Result<()> {
        let token = token.into();
        self.transition(|current| {
            Ok::<_, anyhow::Error>(SessionCredentials {
                session_token: Some(token),
                ..current.clone()
            })
        })?;
        info!("Session token stored");
        Ok(())
    }

    /// Select a security mode and its credentials.
    ///
    /// Symmetric needs a shared secret, asymmetric needs both the access
    /// token and the signature. Invalid input is rejected and nothing
    /// changes.
    pub fn update_security_config(
        &self,
        mode: SecurityMode,
        credentials: SecurityCredentials,
    ) -> Result<(), SecurityConfigError> {
        self.transition(|current| current.with_security(mode, credentials))?;
        info!(mode = %mode, "Security configuration updated");
        Ok(())
    }

    /// Reset to `Disabled` with no secondary credentials.
    pub fn clear_security_config(&self) -> anyhow::Result<()> {
        self.transition(|current| Ok::<_, anyhow::Error>(current.cleared_security()))?;
        info!("Security configuration cleared");
        Ok(())
    }

    /// Forget the session and the security configuration.
    pub fn logout(&self) -> anyhow::Result<Redirect> {
        let mut state = self.write_state();
        self.store.clear()?;
        *state = SessionCredentials::default();
        info!("Logged out");
        Ok(Redirect::Login)
    }

    /// Headers for a request made right now. No side effects.
    pub fn build_headers(&self, extra: &HeaderMap) -> HeaderMap {
        build_headers(&self.read_state(), extra)
    }

    /// Resolve `path` against the base URL. Absolute URLs are only
    /// accepted on the base URL's origin, so credentials never leave it.
    fn url(&self, path: &str) -> Result<String, ApiError> {
        if path.starts_with("http://") || path.starts_with("https://") {
            let same_origin = match (Url::parse(&self.base_url), Url::parse(path)) {
                (Ok(base), Ok(target)) => base.origin() == target.origin(),
                _ => false,
            };
            if !same_origin {
                return Err(ApiError::ForeignOrigin(path.to_string()));
            }
            Ok(path.to_string())
        } else if path.starts_with('/') {
            Ok(format!("{}{}", self.base_url, path))
        } else {
            Ok(format!("{}/{}", self.base_url, path))
        }
    }

    /// Send a request with the current auth headers and intercept
    /// `401`/`403`.
    ///
    /// - `401`: the session token is cleared (security settings are kept)
    ///   and `ReauthRequired` is returned.
    /// - `403` whose JSON body names an `auth_type`: `SecurityMismatch`,
    ///   pre-filled with the stored security values.
    /// - anything else is passed through.
    ///
    /// Nothing is retried. Dropping the future cancels the request.
    pub async fn secure_fetch(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<FetchOutcome, ApiError> {
        let url = self.url(path)?;

        // Snapshot the credentials before the request suspends.
        let (mut headers, sent_token) = {
            let state = self.read_state();
            (
                build_headers(&state, &HeaderMap::new()),
                state.session_token().map(String::from),
            )
        };
        merge_over(&mut headers, &options.headers);

        let mut request = self.http.request(method.clone(), &url).headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(ref body) = options.body {
            request = request.json(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        debug!(method = %method, url = %url, "Sending request");
        let response = request.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!(method = %method, url = %url, status = status.as_u16(), "Response received");

        Ok(self.intercept(
            ApiResponse::new(status, response_headers, body),
            sent_token.as_deref(),
        ))
    }

    /// `sent_token` is the session token the request carried.
    fn intercept(&self, response: ApiResponse, sent_token: Option<&str>) -> FetchOutcome {
        match response.status() {
            StatusCode::UNAUTHORIZED => {
                warn!("Session rejected by server");
                self.invalidate_session(sent_token);
                FetchOutcome::ReauthRequired(response)
            }
            StatusCode::FORBIDDEN => {
                let mismatch = response.error_body().and_then(|body| {
                    SecurityMismatch::from_body(&body, self.read_state().prefill())
                });
                match mismatch {
                    Some(mismatch) => {
                        warn!(
                            required = %mismatch.auth_type,
                            configured = %mismatch.prefill.mode,
                            "Server rejected security credentials"
                        );
                        FetchOutcome::SecurityMismatch { mismatch, response }
                    }
                    None => FetchOutcome::Response(response),
                }
            }
            _ => FetchOutcome::Response(response),
        }
    }

    /// Drop the session token only, and only if it is still the one that
    /// was rejected. A failure to persist is logged; the in-memory token is
    /// cleared regardless.
    fn invalidate_session(&self, rejected: Option<&str>) {
        let mut state = self.write_state();
        if state.session_token() != rejected {
            debug!("Session token replaced while the request was in flight, keeping it");
            return;
        }
        let updated = state.without_session();
        if let Err(e) = self.store.save(&updated) {
            warn!(error = %e, "Failed to persist cleared session token");
        }
        *state = updated;
    }

    /// `secure_fetch`, with the signals turned into errors and non-2xx
    /// statuses mapped to `ApiError`.
    pub(crate) async fn fetch_checked(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.secure_fetch(method, path, options)
            .await?
            .into_response()?
            .error_for_status()
    }

    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.fetch_checked(method, path, options).await?.json()
    }

    /// Plain POST without any auth headers, for the public auth endpoints.
    pub(crate) async fn post_public<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url(path)?;
        debug!(url = %url, "Sending public request");
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse::new(status, headers, body))
    }
}
