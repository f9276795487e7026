use anyhow::{Context, Result};
use keyring::Entry;
use tracing::warn;

use super::{SessionCredentials, SessionStore};

const SERVICE_NAME: &str = "redbot-console";

/// Keychain account under which the snapshot is stored
const DEFAULT_ENTRY: &str = "session";

/// Stores the session snapshot as one JSON blob in the OS keychain.
pub struct KeyringSessionStore {
    entry: Entry,
}

impl KeyringSessionStore {
    pub fn new() -> Result<Self> {
        Self::named(DEFAULT_ENTRY)
    }

    /// Use a separate keychain entry, e.g. one per backend deployment.
    pub fn named(entry_name: &str) -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, entry_name).context("Failed to create keyring entry")?;
        Ok(Self { entry })
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<SessionCredentials> {
        let stored = match self.entry.get_password() {
            Ok(stored) => stored,
            Err(keyring::Error::NoEntry) => return Ok(SessionCredentials::default()),
            Err(e) => return Err(e).context("Failed to retrieve session from keychain"),
        };

        match serde_json::from_str(&stored) {
            Ok(credentials) => Ok(credentials),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session in keychain");
                Ok(SessionCredentials::default())
            }
        }
    }

    fn save(&self, credentials: &SessionCredentials) -> Result<()> {
        let contents = serde_json::to_string(credentials)?;
        self.entry
            .set_password(&contents)
            .context("Failed to store session in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}
