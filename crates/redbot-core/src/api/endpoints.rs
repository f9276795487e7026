//! REST endpoints of the RedBot gateway.
//!
//! Login and registration are public. Everything else goes through
//! `secure_fetch`, so `401`/`403` surface as `ApiError::ReauthRequired` and
//! `ApiError::SecurityMismatch`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, RequestOptions, SessionSecurityClient};
use crate::auth::{SecurityCredentials, SecurityMode};
use crate::models::{
    Account, AccountUpdate, ExecutionLog, ExecutionSummary, GeneratedTask, NewAccount, NewTask,
    Task, TaskUpdate,
};

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const ACCOUNTS_PATH: &str = "/api/accounts";
/// The task service routes its collection with a trailing slash
const TASKS_PATH: &str = "/api/tasks/";
const GENERATE_TASK_PATH: &str = "/api/tasks/generate-from-prompt";
const LOGS_PATH: &str = "/api/logs";
const EXECUTE_PATH: &str = "/api/executor/execute";

#[derive(Serialize)]
struct UserCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

impl SessionSecurityClient {
    // ===== Authentication =====

    /// Log in and store the issued session token.
    ///
    /// An optional security selection (as offered on the login form) is
    /// validated before anything is sent and applied after the token is
    /// stored.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        security: Option<(SecurityMode, SecurityCredentials)>,
    ) -> Result<(), ApiError> {
        if let Some((mode, credentials)) = &security {
            self.credentials().with_security(*mode, credentials.clone())?;
        }

        let response = self
            .post_public(LOGIN_PATH, &UserCredentials { username, password })
            .await?;

        if !response.is_success() {
            return Err(match ApiError::from_response(&response) {
                err @ (ApiError::ServerError(_) | ApiError::BadGateway(_)) => err,
                _ => ApiError::InvalidLogin,
            });
        }

        let login: LoginResponse = response.json()?;
        self.set_session_token(login.access_token)?;

        if let Some((mode, credentials)) = security {
            self.update_security_config(mode, credentials)?;
        }

        info!(username = username, "Logged in");
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        self.post_public(REGISTER_PATH, &UserCredentials { username, password })
            .await?
            .error_for_status()?;
        info!(username = username, "Registered new user");
        Ok(())
    }

    // ===== Accounts =====

    pub async fn list_accounts(&self) -> Result<Vec<Account>, ApiError> {
        self.fetch_json(Method::GET, ACCOUNTS_PATH, RequestOptions::new())
            .await
    }

    pub async fn get_account(&self, id: i64) -> Result<Account, ApiError> {
        self.fetch_json(Method::GET, &format!("{}/{}", ACCOUNTS_PATH, id), RequestOptions::new())
            .await
    }

    pub async fn create_account(&self, account: &NewAccount) -> Result<Account, ApiError> {
        self.fetch_json(Method::POST, ACCOUNTS_PATH, RequestOptions::json(account)?)
            .await
    }

    pub async fn update_account(&self, id: i64, update: &AccountUpdate) -> Result<Account, ApiError> {
        self.fetch_json(
            Method::PUT,
            &format!("{}/{}", ACCOUNTS_PATH, id),
            RequestOptions::json(update)?,
        )
        .await
    }

    pub async fn delete_account(&self, id: i64) -> Result<(), ApiError> {
        self.fetch_checked(
            Method::DELETE,
            &format!("{}/{}", ACCOUNTS_PATH, id),
            RequestOptions::new(),
        )
        .await?;
        Ok(())
    }

    // ===== Tasks =====

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.fetch_json(Method::GET, TASKS_PATH, RequestOptions::new())
            .await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task, ApiError> {
        self.fetch_json(Method::GET, &format!("{}{}", TASKS_PATH, id), RequestOptions::new())
            .await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.fetch_json(Method::POST, TASKS_PATH, RequestOptions::json(task)?)
            .await
    }

    pub async fn update_task(&self, id: i64, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.fetch_json(
            Method::PUT,
            &format!("{}{}", TASKS_PATH, id),
            RequestOptions::json(update)?,
        )
        .await
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.fetch_checked(
            Method::DELETE,
            &format!("{}{}", TASKS_PATH, id),
            RequestOptions::new(),
        )
        .await?;
        Ok(())
    }

    /// Ask the task service to draft a task from a natural-language prompt.
    pub async fn generate_task(&self, prompt: &str) -> Result<GeneratedTask, ApiError> {
        self.fetch_json(
            Method::POST,
            GENERATE_TASK_PATH,
            RequestOptions::json(&PromptRequest { prompt })?,
        )
        .await
    }

    // ===== Execution =====

    /// Execution logs, newest first, optionally for one account.
    pub async fn list_logs(&self, account_id: Option<i64>) -> Result<Vec<ExecutionLog>, ApiError> {
        let mut options = RequestOptions::new();
        if let Some(id) = account_id {
            options = options.query("account_id", id);
        }
        self.fetch_json(Method::GET, LOGS_PATH, options).await
    }

    /// Run every task of an account now.
    pub async fn execute_account(&self, account_id: i64) -> Result<ExecutionSummary, ApiError> {
        self.fetch_json(
            Method::POST,
            &format!("{}/{}", EXECUTE_PATH, account_id),
            RequestOptions::new(),
        )
        .await
    }
}
