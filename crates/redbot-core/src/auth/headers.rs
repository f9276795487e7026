//! Per-request auth header construction.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::warn;

use super::{SecurityMode, SessionCredentials};

/// Shared secret header for symmetric mode
pub const X_MASTER_KEY: HeaderName = HeaderName::from_static("x-master-key");

/// Signed token header for asymmetric mode
pub const X_ACCESS_TOKEN: HeaderName = HeaderName::from_static("x-access-token");

/// Signature of `X-Access-Token` for asymmetric mode
pub const X_ACCESS_SIGNATURE: HeaderName = HeaderName::from_static("x-access-signature");

/// Build the headers for a request from the current credentials.
///
/// Starts from `Content-Type: application/json`, overlays `extra`, then adds
/// the bearer token and the secondary headers for the selected mode. A
/// secondary header is only attached when every field it needs is present;
/// otherwise it is silently left out.
pub fn build_headers(credentials: &SessionCredentials, extra: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    merge_over(&mut headers, extra);

    if let Some(token) = credentials.session_token() {
        if let Some(value) = sensitive_value("Authorization", &format!("Bearer {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
    }

    match credentials.security_mode {
        SecurityMode::Disabled => {}
        SecurityMode::Symmetric => {
            if let Some(secret) = credentials.shared_secret() {
                if let Some(value) = sensitive_value("X-Master-Key", secret) {
                    headers.insert(X_MASTER_KEY, value);
                }
            }
        }
        SecurityMode::Asymmetric => {
            if let Some((token, signature)) = credentials.access_pair() {
                let token = sensitive_value("X-Access-Token", token);
                let signature = sensitive_value("X-Access-Signature", signature);
                if let (Some(token), Some(signature)) = (token, signature) {
                    headers.insert(X_ACCESS_TOKEN, token);
                    headers.insert(X_ACCESS_SIGNATURE, signature);
                }
            }
        }
    }

    headers
}

/// Overlay `overrides` onto `base`; every name in `overrides` replaces all
/// values of that name in `base`.
pub(crate) fn merge_over(base: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        base.remove(name);
    }
    for (name, value) in overrides {
        base.append(name.clone(), value.clone());
    }
}

fn sensitive_value(header: &str, raw: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(raw) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(_) => {
            warn!(header = header, "Stored credential is not a valid header value, omitting header");
            None
        }
    }
}
