use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
}

/// Durable bearer-credential store.
///
/// The token is written through to a JSON file so a sign-in survives
/// process restarts; clearing removes the file.
pub struct TokenStore {
    path: PathBuf,
    token: Mutex<Option<String>>,
}

impl TokenStore {
    /// Default location under the user's local data dir.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scribe-assist")
            .join("token.json")
    }

    /// Open the store, loading any previously persisted token. A missing
    /// or unreadable file just means "signed out".
    pub fn open(path: PathBuf) -> Self {
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<StoredToken>(&contents) {
                Ok(stored) => {
                    info!("Loaded persisted credential from {:?}", path);
                    Some(stored.access_token)
                }
                Err(e) => {
                    warn!("Ignoring malformed token file {:?}: {}", path, e);
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path,
            token: Mutex::new(token),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .lock()
            .expect("token store mutex poisoned")
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Store a new token and persist it.
    pub fn set(&self, access_token: String) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("failed to create token directory")?;
        }

        let stored = StoredToken {
            access_token: access_token.clone(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents).context("failed to persist token")?;

        *self.token.lock().expect("token store mutex poisoned") = Some(access_token);
        info!("Credential persisted to {:?}", self.path);
        Ok(())
    }

    /// Forget the token and remove the persisted file.
    pub fn clear(&self) -> Result<()> {
        *self.token.lock().expect("token store mutex poisoned") = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("failed to remove token file"),
        }
    }
}
