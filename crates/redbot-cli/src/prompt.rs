//! Interactive terminal prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Result;
use redbot_core::auth::{SecurityConfigError, SecurityPrefill, UnknownSecurityMode};
use redbot_core::{SecurityCredentials, SecurityMode, SessionSecurityClient};

use crate::format::mask_secret;

/// True when both stdin and stdout are attached to a terminal.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Read one line, falling back to `default` on empty input.
pub fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(value) if !value.is_empty() => print!("{} [{}]: ", label, value),
        _ => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(keep_or_replace(&line, default))
}

/// Read a secret without echo. Empty input keeps `current`.
pub fn prompt_secret(label: &str, current: Option<&str>) -> Result<String> {
    let label = match current {
        Some(value) if !value.is_empty() => format!("{} [{}]: ", label, mask_secret(value)),
        _ => format!("{}: ", label),
    };
    let entered = rpassword::prompt_password(label)?;
    Ok(keep_or_replace(&entered, current))
}

pub fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{} (y/N)", question), None)?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn keep_or_replace(input: &str, current: Option<&str>) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        current.unwrap_or_default().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a mode choice given by number (1-3) or by name.
fn parse_mode_choice(input: &str, default: SecurityMode) -> Result<SecurityMode, UnknownSecurityMode> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(default);
    }
    if let Ok(index) = input.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| SecurityMode::ALL.get(i).copied())
            .ok_or_else(|| UnknownSecurityMode(input.to_string()));
    }
    input.parse()
}

fn prompt_mode(default: SecurityMode) -> Result<SecurityMode> {
    println!("Security mode:");
    for (i, mode) in SecurityMode::ALL.iter().enumerate() {
        let marker = if *mode == default { "*" } else { " " };
        println!("  {}{}) {}", marker, i + 1, mode.label());
    }
    loop {
        let input = prompt_line("Choose", Some(default.as_str()))?;
        match parse_mode_choice(&input, default) {
            Ok(mode) => return Ok(mode),
            Err(e) => eprintln!("{}", e),
        }
    }
}

/// Ask for a mode and its credentials, seeded from `prefill`.
pub fn prompt_selection(prefill: &SecurityPrefill) -> Result<(SecurityMode, SecurityCredentials)> {
    let mode = prompt_mode(prefill.mode)?;
    let stored = &prefill.credentials;
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
    Ok((mode, credentials))
}

/// Run the security prompt until the client accepts the selection.
/// Rejected input leaves the stored configuration untouched.
pub fn configure_security(client: &SessionSecurityClient, prefill: &SecurityPrefill) -> Result<SecurityMode> {
    let mut prefill = prefill.clone();
    loop {
        let (mode, credentials) = prompt_selection(&prefill)?;
        match client.update_security_config(mode, credentials.clone()) {
            Ok(()) => return Ok(mode),
            Err(SecurityConfigError::Storage(e)) => return Err(e),
            Err(e) => {
                eprintln!("{}", e);
                prefill = SecurityPrefill { mode, credentials };
            }
        }
    }
}
