//! Persisted storage for `SessionCredentials`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use super::SessionCredentials;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Backing storage for the session snapshot.
pub trait SessionStore: Send + Sync {
    /// Read the persisted snapshot; nothing stored yields the defaults.
    fn load(&self) -> Result<SessionCredentials>;

    fn save(&self, credentials: &SessionCredentials) -> Result<()>;

    /// Remove everything that was persisted.
    fn clear(&self) -> Result<()>;
}

/// Stores the snapshot as pretty-printed JSON in the cache directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<SessionCredentials> {
        if !self.path.exists() {
            return Ok(SessionCredentials::default());
        }

        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read session file")?;

        match serde_json::from_str(&contents) {
            Ok(credentials) => Ok(credentials),
            Err(e) => {
                // A corrupt snapshot must not lock the user out; start over.
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                Ok(SessionCredentials::default())
            }
        }
    }

    fn save(&self, credentials: &SessionCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(credentials)?;
        write_private(&self.path, contents.as_bytes())?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Write `contents` to a sibling temp file that only the owner can read,
/// then rename it over `path`. Readers see the old or the new snapshot,
/// never a partial one.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    // A leftover from an interrupted write may carry looser permissions.
    let _ = std::fs::remove_file(&tmp);

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(&tmp)
        .context("Failed to create temporary session file")?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .context("Failed to write session file")?;
    drop(file);

    std::fs::rename(&tmp, path).context("Failed to replace session file")?;
    Ok(())
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<SessionCredentials>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: SessionCredentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<SessionCredentials> {
        let guard = self.inner.lock().map_err(|_| anyhow!("Session store lock poisoned"))?;
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, credentials: &SessionCredentials) -> Result<()> {
        let mut guard = self.inner.lock().map_err(|_| anyhow!("Session store lock poisoned"))?;
        *guard = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.inner.lock().map_err(|_| anyhow!("Session store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
