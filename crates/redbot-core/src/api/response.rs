//! Buffered responses and the outcome signals of a guarded request.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ApiError;
use crate::auth::{SecurityMode, SecurityPrefill};

/// A fully-read HTTP response.
///
/// The body is buffered so a `403` body can be inspected for security
/// details while the response is still handed back to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "{} in body: {}",
                e,
                ApiError::truncate_body(&self.text())
            ))
        })
    }

    /// Turn a non-2xx response into the matching `ApiError`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_response(&self))
        }
    }

    /// Parse a FastAPI-style error body. Unparsable bodies yield `None`.
    pub(crate) fn error_body(&self) -> Option<ErrorBody> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Required auth type, if the server named one.
    pub fn auth_type(&self) -> Option<&str> {
        self.auth_type.as_deref().filter(|t| !t.is_empty())
    }
}

/// The server rejected the secondary security credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMismatch {
    /// Auth type as reported by the server
    pub auth_type: String,
    /// `auth_type` parsed, when it names a known mode
    pub expected: Option<SecurityMode>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    /// Currently stored (possibly stale) values to seed a prompt with
    pub prefill: SecurityPrefill,
}

impl SecurityMismatch {
    pub(crate) fn from_body(body: &ErrorBody, prefill: SecurityPrefill) -> Option<Self> {
        let auth_type = body.auth_type()?.to_string();
        Some(Self {
            expected: auth_type.parse().ok(),
            auth_type,
            detail: body.detail_text(),
            hint: body.hint.clone(),
            prefill,
        })
    }

    pub fn detail_or_default(&self) -> &str {
        self.detail.as_deref().unwrap_or("access denied")
    }
}

/// Result of `SessionSecurityClient::secure_fetch`.
///
/// The signal variants still carry the original response so the caller
/// can decide whether to look at it.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Any response without special handling, passed through unchanged.
    Response(ApiResponse),
    /// `401`: the session token was cleared; the user must log in again.
    ReauthRequired(ApiResponse),
    /// `403` naming a required auth type.
    SecurityMismatch {
        mismatch: SecurityMismatch,
        response: ApiResponse,
    },
}

impl FetchOutcome {
    pub fn response(&self) -> &ApiResponse {
        match self {
            FetchOutcome::Response(response)
            | FetchOutcome::ReauthRequired(response)
            | FetchOutcome::SecurityMismatch { response, .. } => response,
        }
    }

    /// Unwrap the plain response, turning the signals into errors.
    pub fn into_response(self) -> Result<ApiResponse, ApiError> {
        match self {
            FetchOutcome::Response(response) => Ok(response),
            FetchOutcome::ReauthRequired(_) => Err(ApiError::ReauthRequired),
            FetchOutcome::SecurityMismatch { mismatch, .. } => {
                Err(ApiError::SecurityMismatch(Box::new(mismatch)))
            }
        }
    }
}

/// Where the caller should send the user next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forbidden(body: &str) -> ApiResponse {
        ApiResponse::new(StatusCode::FORBIDDEN, HeaderMap::new(), body.as_bytes().to_vec())
    }

    #[test]
    fn test_mismatch_from_body() {
        let response = forbidden(r#"{"detail":"bad sig","auth_type":"asymmetric"}"#);
        let body = response.error_body().unwrap();
        let mismatch = SecurityMismatch::from_body(&body, SecurityPrefill::default()).unwrap();
        assert_eq!(mismatch.auth_type, "asymmetric");
        assert_eq!(mismatch.expected, Some(SecurityMode::Asymmetric));
        assert_eq!(mismatch.detail.as_deref(), Some("bad sig"));
    }

    #[test]
    fn test_unknown_auth_type_kept_raw() {
        let response = forbidden(r#"{"detail":"nope","auth_type":"mtls"}"#);
        let body = response.error_body().unwrap();
        let mismatch = SecurityMismatch::from_body(&body, SecurityPrefill::default()).unwrap();
        assert_eq!(mismatch.auth_type, "mtls");
        assert!(mismatch.expected.is_none());
    }

    #[test]
    fn test_no_mismatch_without_auth_type() {
        for body in [r#"{"detail":"forbidden"}"#, r#"{"auth_type":""}"#] {
            let parsed = forbidden(body).error_body().unwrap();
            assert!(SecurityMismatch::from_body(&parsed, SecurityPrefill::default()).is_none());
        }
    }

    #[test]
    fn test_unparsable_body_has_no_detail() {
        assert!(forbidden("not json").error_body().is_none());
        assert!(forbidden("").error_body().is_none());
    }

    #[test]
    fn test_into_response_maps_signals() {
        let outcome = FetchOutcome::ReauthRequired(forbidden(""));
        assert!(matches!(outcome.into_response(), Err(ApiError::ReauthRequired)));

        let outcome = FetchOutcome::Response(forbidden("{}"));
        assert_eq!(outcome.response().status(), StatusCode::FORBIDDEN);
        assert!(outcome.into_response().is_ok());
    }
}
