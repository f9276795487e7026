use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::parse_timestamp;

/// One recorded task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    /// Stored as text by the executor; numeric ids are accepted too.
    #[serde(deserialize_with = "string_or_number")]
    pub account_id: String,
    #[serde(default)]
    pub task_id: Option<i64>,
    pub task_type: String,
    pub status: String,
    #[serde(default)]
    pub detail: Option<Value>,
    pub created_at: String,
}

impl ExecutionLog {
    pub fn created(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created_at)
    }
}

/// Response of `POST /api/executor/execute/{account_id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionSummary {
    pub count: usize,
    #[serde(default)]
    pub results: Vec<Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for account_id, got {}",
            other
        ))),
    }
}
