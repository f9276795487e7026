//! Command handlers.

use anyhow::{bail, Context, Result};
use redbot_core::metrics::fetch_metrics;
use redbot_core::models::{
    parse_task_config, AccountUpdate, ModerationConfig, NewAccount, NewTask, TaskKind, TaskUpdate,
};
use redbot_core::{Config, Redirect, SecurityCredentials, SecurityMode, SessionSecurityClient};
use serde_json::Value;
use tracing::warn;

use crate::format::{cell, format_timestamp, mask_secret, security_indicator, truncate_string};
use crate::prompt::{self, confirm, is_interactive, prompt_line, prompt_secret};
use crate::{AccountAction, Commands, SecurityAction, TaskAction};

/// Width of free-text columns in tables
const DETAIL_WIDTH: usize = 48;

pub async fn dispatch(client: &SessionSecurityClient, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, security } => login(client, username, security).await,
        Commands::Register { username } => register(client, username).await,
        Commands::Logout => logout(client),
        Commands::Status => {
            status(client, config);
            Ok(())
        }
        Commands::Security { action } => security(client, action),
        Commands::Accounts { action } => accounts(client, action).await,
        Commands::Tasks { action } => tasks(client, action).await,
        Commands::Logs { account_id } => logs(client, account_id).await,
        Commands::Execute { account_id } => execute(client, account_id).await,
        Commands::Metrics => metrics(client).await,
    }
}

// ===== Session =====

async fn login(client: &SessionSecurityClient, username: Option<String>, with_security: bool) -> Result<()> {
    let mut stored = Config::load().unwrap_or_default();
    let username = match username {
        Some(username) => username,
        None => prompt_line("Username", stored.last_username.as_deref())?,
    };
    if username.is_empty() {
        bail!("Username and password required");
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Username and password required");
    }

    let security = if with_security {
        Some(prompt::prompt_selection(&client.credentials().prefill())?)
    } else {
        None
    };

    client.login(&username, &password, security).await?;

    stored.last_username = Some(username.clone());
    if let Err(e) = stored.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {}.", username);
    let mode = client.security_mode();
    if mode != SecurityMode::Disabled {
        println!("Security: {}", security_indicator(mode));
    }
    Ok(())
}

async fn register(client: &SessionSecurityClient, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt_line("Username", None)?,
    };
    if username.is_empty() {
        bail!("Username and password required");
    }
    let password = rpassword::prompt_password("Password: ")?;
    let repeated = rpassword::prompt_password("Repeat password: ")?;
    if password.is_empty() {
        bail!("Username and password required");
    }
    if password != repeated {
        bail!("Passwords do not match");
    }

    client.register(&username, &password).await?;
    println!("User {} created. Run `redbot login` to sign in.", username);
    Ok(())
}

fn logout(client: &SessionSecurityClient) -> Result<()> {
    match client.logout()? {
        Redirect::Login => println!("Logged out. Run `redbot login` to sign in again."),
    }
    Ok(())
}

fn status(client: &SessionSecurityClient, config: &Config) {
    println!("Gateway:  {}", client.base_url());
    println!(
        "Session:  {}",
        if client.is_logged_in() { "logged in" } else { "not logged in" }
    );
    println!("Security: {}", security_indicator(client.security_mode()));
    println!("Storage:  {:?}", config.credential_backend);
}

// ===== Security =====

fn security(client: &SessionSecurityClient, action: SecurityAction) -> Result<()> {
    match action {
        SecurityAction::Show => {
            let prefill = client.credentials().prefill();
            println!("Mode: {}", prefill.mode.label());
            let creds = &prefill.credentials;
            match prefill.mode {
                SecurityMode::Disabled => {}
                SecurityMode::Symmetric => {
                    println!("Shared key: {}", creds.shared_secret.as_deref().map(mask_secret).unwrap_or_default());
                }
                SecurityMode::Asymmetric => {
                    println!("Access token: {}", creds.access_token.as_deref().map(mask_secret).unwrap_or_default());
                    println!(
                        "Access signature: {}",
                        creds.access_signature.as_deref().map(mask_secret).unwrap_or_default()
                    );
                }
            }
        }
        SecurityAction::Configure { mode: Some(mode) } => {
            let stored = client.credentials().prefill().credentials;
            let credentials = match mode {
                SecurityMode::Disabled => SecurityCredentials::default(),
                SecurityMode::Symmetric => {
                    SecurityCredentials::shared_secret(prompt_secret("Shared key", stored.shared_secret.as_deref())?)
                }
                SecurityMode::Asymmetric => SecurityCredentials::access_pair(
                    prompt_secret("Access token", stored.access_token.as_deref())?,
                    prompt_secret("Access signature", stored.access_signature.as_deref())?,
                ),
            };
            client.update_security_config(mode, credentials)?;
            println!("Security mode set to {}.", mode);
        }
        SecurityAction::Configure { mode: None } => {
            if !is_interactive() {
                bail!("No terminal available; pass --mode to configure security");
            }
            let mode = prompt::configure_security(client, &client.credentials().prefill())?;
            println!("Security mode set to {}.", mode);
        }
        SecurityAction::Clear => {
            client.clear_security_config()?;
            println!("Security disabled.");
        }
    }
    Ok(())
}

// ===== Accounts =====

async fn accounts(client: &SessionSecurityClient, action: AccountAction) -> Result<()> {
    match action {
        AccountAction::List => {
            let accounts = client.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts.");
                return Ok(());
            }
            println!("{} {} {} CREATED", cell("ID", 6), cell("PLATFORM", 12), cell("HANDLE", 24));
            for account in &accounts {
                println!(
                    "{} {} {} {}",
                    cell(&account.id.to_string(), 6),
                    cell(&account.platform, 12),
                    cell(&account.handle, 24),
                    format_timestamp(account.created())
                );
            }
        }
        AccountAction::Show { id } => {
            let account = client.get_account(id).await?;
            println!("ID:       {}", account.id);
            println!("Platform: {}", account.platform);
            println!("Handle:   {}", account.handle);
            println!("Token:    {}", mask_secret(&account.token));
            println!("Created:  {}", format_timestamp(account.created()));
        }
        AccountAction::Add { platform, handle } => {
            let token = prompt_secret("Access token", None)?;
            if platform.trim().is_empty() || handle.trim().is_empty() || token.is_empty() {
                bail!("Platform, handle and token are required");
            }
            let account = client
                .create_account(&NewAccount::new(platform.trim(), handle.trim(), token))
                .await?;
            println!("Account {} created ({} on {}).", account.id, account.handle, account.platform);
        }
        AccountAction::Edit { id, handle, token } => {
            let update = AccountUpdate {
                handle: handle.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()),
                token: if token {
                    Some(prompt_secret("New access token", None)?).filter(|t| !t.is_empty())
                } else {
                    None
                },
            };
            if update.is_empty() {
                bail!("Nothing to update; pass --handle and/or --token");
            }
            let account = client.update_account(id, &update).await?;
            println!("Account {} updated.", account.id);
        }
        AccountAction::Delete { id, yes } => {
            if !confirm_delete(&format!("Delete account {}?", id), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            client.delete_account(id).await?;
            println!("Account {} deleted.", id);
        }
    }
    Ok(())
}

fn confirm_delete(question: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !is_interactive() {
        bail!("Refusing to delete without confirmation; pass --yes");
    }
    confirm(question)
}

// ===== Tasks =====

/// Configuration payload for a new task.
fn task_config(
    kind: TaskKind,
    config: Option<&str>,
    post_url: Option<&str>,
    forbidden_words: &str,
    spam_patterns: &str,
    max_caps: Option<u32>,
) -> Result<Value> {
    match (kind, config) {
        (_, Some(raw)) => Ok(parse_task_config(raw)?),
        (TaskKind::Moderate, None) => Ok(ModerationConfig::build(
            post_url.unwrap_or_default(),
            forbidden_words,
            spam_patterns,
            max_caps,
        )?
        .to_value()),
        (_, None) => Ok(Value::Object(Default::default())),
    }
}

async fn tasks(client: &SessionSecurityClient, action: TaskAction) -> Result<()> {
    match action {
        TaskAction::List => {
            let tasks = client.list_tasks().await?;
            if tasks.is_empty() {
                println!("No tasks.");
                return Ok(());
            }
            println!(
                "{} {} {} {} CREATED",
                cell("ID", 6),
                cell("ACCOUNT", 8),
                cell("TYPE", 20),
                cell("STATUS", 12)
            );
            for task in &tasks {
                println!(
                    "{} {} {} {} {}",
                    cell(&task.id.to_string(), 6),
                    cell(&task.account_id.to_string(), 8),
                    cell(&task.task_type, 20),
                    cell(&task.status, 12),
                    format_timestamp(task.created())
                );
            }
        }
        TaskAction::Show { id } => {
            let task = client.get_task(id).await?;
            println!("ID:      {}", task.id);
            println!("Account: {}", task.account_id);
            match task.kind() {
                Some(kind) => println!("Type:    {} ({})", kind, kind.label()),
                None => println!("Type:    {}", task.task_type),
            }
            println!("Status:  {}", task.status);
            println!("Created: {}", format_timestamp(task.created()));
            println!("Config:");
            println!("{}", serde_json::to_string_pretty(&task.config_json)?);
        }
        TaskAction::Add {
            account_id,
            kind,
            config,
            post_url,
            forbidden_words,
            spam_patterns,
            max_caps,
        } => {
            let config_json = task_config(
                kind,
                config.as_deref(),
                post_url.as_deref(),
                &forbidden_words,
                &spam_patterns,
                max_caps,
            )?;
            let task = client
                .create_task(&NewTask {
                    task_type: kind.as_wire().to_string(),
                    account_id,
                    config_json,
                })
                .await?;
            println!("Task {} created ({}).", task.id, task.task_type);
        }
        TaskAction::Edit { id, kind, config } => {
            let update = TaskUpdate {
                task_type: kind.map(|k| k.as_wire().to_string()),
                config_json: config.as_deref().map(parse_task_config).transpose()?,
            };
            if update.task_type.is_none() && update.config_json.is_none() {
                bail!("Nothing to update; pass --type and/or --config");
            }
            let task = client.update_task(id, &update).await?;
            println!("Task {} updated.", task.id);
        }
        TaskAction::Delete { id, yes } => {
            if !confirm_delete(&format!("Delete task {}?", id), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            client.delete_task(id).await?;
            println!("Task {} deleted.", id);
        }
        TaskAction::Generate { prompt, account_id } => {
            if prompt.trim().is_empty() {
                bail!("Prompt must not be empty");
            }
            let generated = client.generate_task(prompt.trim()).await?;
            println!("Type: {}", generated.task_type);
            println!("{}", serde_json::to_string_pretty(&generated.config)?);

            if let Some(account_id) = account_id {
                let task = client
                    .create_task(&NewTask {
                        task_type: generated.task_type,
                        account_id,
                        config_json: generated.config,
                    })
                    .await?;
                println!("Task {} created for account {}.", task.id, account_id);
            }
        }
    }
    Ok(())
}

// ===== Execution =====

async fn logs(client: &SessionSecurityClient, account_id: Option<i64>) -> Result<()> {
    let logs = client.list_logs(account_id).await?;
    if logs.is_empty() {
        println!("No execution logs.");
        return Ok(());
    }
    println!(
        "{} {} {} {} DETAIL",
        cell("CREATED", 19),
        cell("ACCOUNT", 8),
        cell("TYPE", 20),
        cell("STATUS", 10)
    );
    for log in &logs {
        let detail = log
            .detail
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        println!(
            "{} {} {} {} {}",
            cell(&format_timestamp(log.created()), 19),
            cell(&log.account_id, 8),
            cell(&log.task_type, 20),
            cell(&log.status, 10),
            truncate_string(&detail, DETAIL_WIDTH)
        );
    }
    Ok(())
}

async fn execute(client: &SessionSecurityClient, account_id: i64) -> Result<()> {
    let summary = client
        .execute_account(account_id)
        .await
        .with_context(|| format!("Failed to execute tasks of account {}", account_id))?;
    println!("Executed {} task(s).", summary.count);
    for result in &summary.results {
        println!("  {}", truncate_string(&result.to_string(), DETAIL_WIDTH * 2));
    }
    Ok(())
}

async fn metrics(client: &SessionSecurityClient) -> Result<()> {
    let metrics = fetch_metrics(client).await?;
    println!("Accounts:     {}", metrics.total_accounts);
    println!("Tasks:        {}", metrics.total_tasks);
    println!("  completed   {}", metrics.by_status.completed);
    println!("  pending     {}", metrics.by_status.pending);
    println!("  in progress {}", metrics.by_status.in_progress);
    println!("  failed      {}", metrics.by_status.failed);
    println!("Success rate: {}%", metrics.success_rate);

    if !metrics.by_platform.is_empty() {
        println!("Accounts by platform:");
        for (platform, count) in &metrics.by_platform {
            println!("  {} {}", cell(platform, 20), count);
        }
    }
    if !metrics.by_task_type.is_empty() {
        println!("Tasks by type:");
        for (task_type, count) in &metrics.by_task_type {
            println!("  {} {}", cell(task_type, 20), count);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_config_from_flags() {
        let value = task_config(
            TaskKind::Moderate,
            None,
            Some(" https://reddit.com/r/x/1 "),
            "spam, scam ,",
            "",
            Some(0),
        )
        .unwrap();
        assert_eq!(value["post_url"], "https://reddit.com/r/x/1");
        assert_eq!(value["action"], "remove");
        assert_eq!(value["filters"]["forbidden_words"], serde_json::json!(["spam", "scam"]));
        assert_eq!(value["filters"]["max_caps_percent"], 100);
    }

    #[test]
    fn test_moderation_requires_post_url() {
        assert!(task_config(TaskKind::Moderate, None, None, "", "", None).is_err());
    }

    #[test]
    fn test_explicit_config_wins() {
        let value = task_config(TaskKind::Moderate, Some(r#"{"post_url":"u"}"#), None, "", "", None).unwrap();
        assert_eq!(value, serde_json::json!({"post_url": "u"}));
        assert!(task_config(TaskKind::Publish, Some("[1]"), None, "", "", None).is_err());
    }

    #[test]
    fn test_default_config_is_empty_object() {
        let value = task_config(TaskKind::ValidateAccounts, None, None, "", "", None).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_confirm_delete_with_yes() {
        assert!(confirm_delete("Delete?", true).unwrap());
    }
}
