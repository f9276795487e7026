use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Secondary authentication scheme applied on top of the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    #[default]
    Disabled,
    /// Shared secret sent as `X-Master-Key`
    Symmetric,
    /// Signed token sent as `X-Access-Token` + `X-Access-Signature`
    Asymmetric,
}

impl SecurityMode {
    pub const ALL: [SecurityMode; 3] = [
        SecurityMode::Disabled,
        SecurityMode::Symmetric,
        SecurityMode::Asymmetric,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::Disabled => "disabled",
            SecurityMode::Symmetric => "symmetric",
            SecurityMode::Asymmetric => "asymmetric",
        }
    }

    /// Human-readable description for prompts.
    pub fn label(&self) -> &'static str {
        match self {
            SecurityMode::Disabled => "Disabled (no extra protection)",
            SecurityMode::Symmetric => "Symmetric (shared master key)",
            SecurityMode::Asymmetric => "Asymmetric (signed access token)",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown security mode '{0}' (expected disabled, symmetric or asymmetric)")]
pub struct UnknownSecurityMode(pub String);

impl FromStr for SecurityMode {
    type Err = UnknownSecurityMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(SecurityMode::Disabled),
            "symmetric" => Ok(SecurityMode::Symmetric),
            "asymmetric" => Ok(SecurityMode::Asymmetric),
            _ => Err(UnknownSecurityMode(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum SecurityConfigError {
    #[error("Symmetric security requires a master key")]
    MissingSharedSecret,

    #[error("Asymmetric security requires both an access token and an access signature")]
    MissingAccessPair,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Caller-supplied secondary credentials for `update_security_config`.
/// Empty strings count as missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecurityCredentials {
    pub shared_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_signature: Option<String>,
}

impl SecurityCredentials {
    pub fn shared_secret(secret: impl Into<String>) -> Self {
        Self {
            shared_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn access_pair(token: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            access_signature: Some(signature.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for SecurityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityCredentials")
            .field("shared_secret", &redacted(&self.shared_secret))
            .field("access_token", &redacted(&self.access_token))
            .field("access_signature", &redacted(&self.access_signature))
            .finish()
    }
}

/// Stored values used to seed a security configuration prompt.
/// They may be stale relative to what the server currently expects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityPrefill {
    pub mode: SecurityMode,
    pub credentials: SecurityCredentials,
}

/// Persisted session state. Absent values are omitted when serialized.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    #[serde(default)]
    pub security_mode: SecurityMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_signature: Option<String>,
}

impl SessionCredentials {
    /// Session token, if one is set and non-empty.
    pub fn session_token(&self) -> Option<&str> {
        non_empty(&self.session_token)
    }

    pub fn shared_secret(&self) -> Option<&str> {
        non_empty(&self.shared_secret)
    }

    /// Token and signature, only when both are set.
    pub fn access_pair(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.access_token), non_empty(&self.access_signature)) {
            (Some(token), Some(signature)) => Some((token, signature)),
            _ => None,
        }
    }

    /// Validate `credentials` for `mode` and build the resulting state.
    ///
    /// The session token is carried over. Fields belonging to the other
    /// modes are dropped, so a shared secret is only ever stored alongside
    /// `Symmetric` and a token/signature pair only alongside `Asymmetric`.
    pub fn with_security(
        &self,
        mode: SecurityMode,
        credentials: SecurityCredentials,
    ) -> Result<Self, SecurityConfigError> {
        let mut next = self.cleared_security();
        next.security_mode = mode;

        match mode {
            SecurityMode::Disabled => {}
            SecurityMode::Symmetric => {
                let secret = non_empty_owned(credentials.shared_secret)
                    .ok_or(SecurityConfigError::MissingSharedSecret)?;
                next.shared_secret = Some(secret);
            }
            SecurityMode::Asymmetric => {
                let token = non_empty_owned(credentials.access_token);
                let signature = non_empty_owned(credentials.access_signature);
                match (token, signature) {
                    (Some(token), Some(signature)) => {
                        next.access_token = Some(token);
                        next.access_signature = Some(signature);
                    }
                    _ => return Err(SecurityConfigError::MissingAccessPair),
                }
            }
        }

        Ok(next)
    }

    /// Same session, security reset to `Disabled` with no secondary fields.
    pub fn cleared_security(&self) -> Self {
        Self {
            session_token: self.session_token.clone(),
            ..Self::default()
        }
    }

    /// Same security settings, session token removed.
    pub fn without_session(&self) -> Self {
        Self {
            session_token: None,
            ..self.clone()
        }
    }

    pub fn prefill(&self) -> SecurityPrefill {
        SecurityPrefill {
            mode: self.security_mode,
            credentials: SecurityCredentials {
                shared_secret: self.shared_secret.clone(),
                access_token: self.access_token.clone(),
                access_signature: self.access_signature.clone(),
            },
        }
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("session_token", &redacted(&self.session_token))
            .field("security_mode", &self.security_mode)
            .field("shared_secret", &redacted(&self.shared_secret))
            .field("access_token", &redacted(&self.access_token))
            .field("access_signature", &redacted(&self.access_signature))
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn non_empty_owned(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "<redacted>")
}
