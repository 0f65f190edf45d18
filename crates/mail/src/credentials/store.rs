//! Token persistence

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::models::Credential;

/// Trait for credential persistence
///
/// A missing record is a valid state and loads as `Ok(None)`.
pub trait TokenStore: Send + Sync {
    /// Load the stored credential, if any
    fn load(&self) -> Result<Option<Credential>>;

    /// Replace the stored credential
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove the stored credential; removing nothing is not an error
    fn clear(&self) -> Result<()>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn load(&self) -> Result<Option<Credential>> {
        (**self).load()
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        (**self).save(credential)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// JSON token file at a fixed path
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Default token file name in the config directory
    pub const DEFAULT_FILE: &'static str = "token.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Token file in the assistant config directory (~/.config/gmail-assistant/token.json)
    pub fn default_location() -> Result<Self> {
        let path = config::config_path(Self::DEFAULT_FILE)
            .context("Could not determine config directory")?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let credential = config::load_json_file(&self.path)?;
        Ok(Some(credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        config::save_private_json_file(&self.path, credential)?;
        log::info!("Credentials saved to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove token file: {}", self.path.display()))?;
            log::info!("Removed token file {}", self.path.display());
        }
        Ok(())
    }
}

/// In-memory token store (for testing)
#[derive(Default)]
pub struct InMemoryTokenStore {
    credential: Mutex<Option<Credential>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }

    /// Snapshot of the stored credential
    pub fn stored(&self) -> Option<Credential> {
        self.credential.lock().ok().and_then(|guard| guard.clone())
    }
}

impl TokenStore for InMemoryTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        let guard = self
            .credential
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut guard = self
            .credential
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .credential
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
