//! Automation tasks and their configuration payloads.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::parse_timestamp;

/// Default caps threshold; 100% never triggers.
const DEFAULT_MAX_CAPS_PERCENT: u32 = 100;

/// An automation job attached to an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub account_id: i64,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub config_json: Value,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Task {
    pub fn kind(&self) -> Option<TaskKind> {
        TaskKind::from_wire(&self.task_type)
    }

    pub fn status_kind(&self) -> Option<TaskStatus> {
        TaskStatus::from_wire(&self.status)
    }

    pub fn created(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Task types the executor knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Publish,
    Reply,
    Moderate,
    ValidateAccounts,
    EmergencyDelete,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Publish,
        TaskKind::Reply,
        TaskKind::Moderate,
        TaskKind::ValidateAccounts,
        TaskKind::EmergencyDelete,
    ];

    /// Name used by the backend API.
    pub fn as_wire(&self) -> &'static str {
        match self {
            TaskKind::Publish => "publicar",
            TaskKind::Reply => "responder",
            TaskKind::Moderate => "moderar",
            TaskKind::ValidateAccounts => "validar_cuentas",
            TaskKind::EmergencyDelete => "borrado_emergencia",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_wire() == s)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Publish => "Publish post",
            TaskKind::Reply => "Reply to keywords",
            TaskKind::Moderate => "Moderate comments",
            TaskKind::ValidateAccounts => "Validate accounts",
            TaskKind::EmergencyDelete => "Emergency delete",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// Body of `POST /api/tasks/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    #[serde(rename = "type")]
    pub task_type: String,
    pub account_id: i64,
    pub config_json: Value,
}

/// Body of `PUT /api/tasks/{id}`. The account cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_json: Option<Value>,
}

/// Task suggested by `POST /api/tasks/generate-from-prompt`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedTask {
    pub task_type: String,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Error)]
pub enum TaskConfigError {
    #[error("A post URL is required for moderation tasks")]
    MissingPostUrl,

    #[error("Invalid task configuration JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Task configuration must be a JSON object")]
    NotAnObject,
}

/// Parse a free-form task configuration; the backend requires an object.
pub fn parse_task_config(raw: &str) -> Result<Value, TaskConfigError> {
    let value: Value = serde_json::from_str(raw)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(TaskConfigError::NotAnObject)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationFilters {
    pub forbidden_words: Vec<String>,
    pub spam_patterns: Vec<String>,
    pub max_caps_percent: u32,
}

/// Configuration of a `moderar` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub post_url: String,
    pub action: String,
    pub filters: ModerationFilters,
}

impl ModerationConfig {
    /// Build from form-style input: comma-separated word and pattern lists,
    /// and a caps threshold where missing or zero means 100.
    pub fn build(
        post_url: &str,
        forbidden_words: &str,
        spam_patterns: &str,
        max_caps_percent: Option<u32>,
    ) -> Result<Self, TaskConfigError> {
        let post_url = post_url.trim();
        if post_url.is_empty() {
            return Err(TaskConfigError::MissingPostUrl);
        }

        Ok(Self {
            post_url: post_url.to_string(),
            action: "remove".to_string(),
            filters: ModerationFilters {
                forbidden_words: split_list(forbidden_words),
                spam_patterns: split_list(spam_patterns),
                max_caps_percent: max_caps_percent
                    .filter(|p| *p > 0)
                    .unwrap_or(DEFAULT_MAX_CAPS_PERCENT),
            },
        })
    }

    /// Read back a generated or stored moderation config, if it is one.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "post_url": self.post_url,
            "action": self.action,
            "filters": {
                "forbidden_words": self.filters.forbidden_words,
                "spam_patterns": self.filters.spam_patterns,
                "max_caps_percent": self.filters.max_caps_percent,
            }
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_deserialize_renames_type() {
        let json = r#"{"id":7,"account_id":2,"type":"moderar","config_json":{"post_url":"x"},"status":"pending","created_at":"2025-01-01T00:00:00"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.kind(), Some(TaskKind::Moderate));
        assert_eq!(task.status_kind(), Some(TaskStatus::Pending));
        assert_eq!(task.config_json["post_url"], "x");
    }

    #[test]
    fn test_unknown_kind_and_status() {
        assert!(TaskKind::from_wire("dance").is_none());
        assert!(TaskStatus::from_wire("queued").is_none());
        assert_eq!(TaskKind::from_wire("validar_cuentas"), Some(TaskKind::ValidateAccounts));
    }

    #[test]
    fn test_new_task_wire_shape() {
        let body = serde_json::to_value(NewTask {
            task_type: "publicar".to_string(),
            account_id: 4,
            config_json: serde_json::json!({"title": "hi"}),
        })
        .unwrap();
        assert_eq!(body["type"], "publicar");
        assert_eq!(body["account_id"], 4);
    }

    #[test]
    fn test_task_update_omits_unset() {
        let update = TaskUpdate {
            config_json: Some(serde_json::json!({})),
            ..TaskUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"config_json":{}}"#);
    }

    #[test]
    fn test_moderation_lists_are_trimmed() {
        let config = ModerationConfig::build(
            " https://reddit.com/r/x/1 ",
            "spam, scam ,, ",
            "http,www",
            None,
        )
        .unwrap();
        assert_eq!(config.post_url, "https://reddit.com/r/x/1");
        assert_eq!(config.filters.forbidden_words, vec!["spam", "scam"]);
        assert_eq!(config.filters.spam_patterns, vec!["http", "www"]);
        assert_eq!(config.filters.max_caps_percent, 100);
        assert_eq!(config.action, "remove");
    }

    #[test]
    fn test_moderation_zero_caps_means_default() {
        let config = ModerationConfig::build("u", "", "", Some(0)).unwrap();
        assert_eq!(config.filters.max_caps_percent, 100);
        let config = ModerationConfig::build("u", "", "", Some(70)).unwrap();
        assert_eq!(config.filters.max_caps_percent, 70);
        assert!(config.filters.forbidden_words.is_empty());
    }

    #[test]
    fn test_moderation_requires_post_url() {
        let err = ModerationConfig::build("  ", "a", "b", None).unwrap_err();
        assert!(matches!(err, TaskConfigError::MissingPostUrl));
    }

    #[test]
    fn test_moderation_value_round_trip() {
        let config = ModerationConfig::build("u", "a", "", Some(50)).unwrap();
        assert_eq!(ModerationConfig::from_value(&config.to_value()), Some(config));
    }

    #[test]
    fn test_parse_task_config() {
        assert!(parse_task_config(r#"{"subreddit":"rust"}"#).is_ok());
        assert!(matches!(parse_task_config("[1]"), Err(TaskConfigError::NotAnObject)));
        assert!(matches!(parse_task_config("{oops"), Err(TaskConfigError::InvalidJson(_))));
    }
}
