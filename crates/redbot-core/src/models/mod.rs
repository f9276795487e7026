//! Data models for the RedBot backend.
//!
//! - `Account`: a platform handle with its access token
//! - `Task`: an automation job bound to an account
//! - `ExecutionLog`: one recorded task execution

pub mod account;
pub mod log;
pub mod task;
pub mod timestamp;

pub use account::{Account, AccountUpdate, NewAccount};
pub use log::{ExecutionLog, ExecutionSummary};
pub use task::{
    parse_task_config, GeneratedTask, ModerationConfig, ModerationFilters, NewTask, Task,
    TaskConfigError, TaskKind, TaskStatus, TaskUpdate,
};
pub use timestamp::parse_timestamp;
