use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::parse_timestamp;

/// A social-media account managed by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    pub platform: String,
    pub handle: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Account {
    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Body of `POST /api/accounts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAccount {
    pub platform: String,
    pub handle: String,
    pub token: String,
    /// Placeholder; the backend assigns the owner from the session.
    pub user_id: i64,
}

impl NewAccount {
    pub fn new(platform: impl Into<String>, handle: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            handle: handle.into(),
            token: token.into(),
            user_id: 0,
        }
    }
}

/// Body of `PUT /api/accounts/{id}`. The platform cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.handle.is_none() && self.token.is_none()
    }
}
