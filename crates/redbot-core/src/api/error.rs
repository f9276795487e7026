use reqwest::StatusCode;
use thiserror::Error;

use super::{ApiResponse, SecurityMismatch};
use crate::auth::SecurityConfigError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session expired - please log in again")]
    ReauthRequired,

    #[error("Security credentials rejected: {} (required: {})", .0.detail_or_default(), .0.auth_type)]
    SecurityMismatch(Box<SecurityMismatch>),

    #[error(transparent)]
    SecurityConfig(#[from] SecurityConfigError),

    #[error("Invalid username or password")]
    InvalidLogin,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Service unavailable (502 Bad Gateway): {0}")]
    BadGateway(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },

    #[error("Refusing to send credentials to {0}: not the configured API origin")]
    ForeignOrigin(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Connection error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.chars().count() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", head, body.len())
        }
    }

    /// Map a non-success response to an error.
    ///
    /// The FastAPI `detail` field is used when the body is JSON that has
    /// one; anything else falls back to the status' generic reason.
    pub fn from_response(response: &ApiResponse) -> Self {
        let status = response.status();
        let detail = response
            .error_body()
            .and_then(|body| body.detail_text())
            .filter(|detail| !detail.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match status.as_u16() {
            401 => ApiError::ReauthRequired,
            403 => ApiError::AccessDenied(detail),
            404 => ApiError::NotFound(detail),
            502 => ApiError::BadGateway(detail),
            500..=599 => ApiError::ServerError(detail),
            _ => ApiError::Rejected { status, detail },
        }
    }

    /// True when the user has to log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::ReauthRequired)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_detail_extracted_from_json() {
        let err = ApiError::from_response(&response(404, r#"{"detail":"Cuenta no encontrada"}"#));
        assert!(matches!(err, ApiError::NotFound(ref d) if d == "Cuenta no encontrada"));
    }

    #[test]
    fn test_malformed_body_uses_generic_message() {
        let err = ApiError::from_response(&response(500, "<html>oops</html>"));
        assert!(matches!(err, ApiError::ServerError(ref d) if d == "Internal Server Error"));
    }

    #[test]
    fn test_bad_gateway_is_distinct() {
        let err = ApiError::from_response(&response(502, ""));
        assert!(matches!(err, ApiError::BadGateway(_)));
    }

    #[test]
    fn test_validation_detail_list_is_stringified() {
        let err = ApiError::from_response(&response(422, r#"{"detail":[{"msg":"field required"}]}"#));
        match err {
            ApiError::Rejected { status, detail } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert!(detail.contains("field required"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_requires_login() {
        let err = ApiError::from_response(&response(401, ""));
        assert!(err.requires_login());
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
