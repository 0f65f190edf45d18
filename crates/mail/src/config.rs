//! Configuration loading for the assistant
//!
//! OAuth client secrets are loaded from (in order of priority):
//! 1. An explicit JSON file (Google Cloud Console format)
//! 2. Compile-time embedded credentials (for production builds)
//! 3. JSON file in the config directory (~/.config/gmail-assistant/client_secret.json)
//! 4. Runtime environment variables (fallback)
//!
//! Optional settings live in ~/.config/gmail-assistant/settings.json.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::credentials::{FileTokenStore, GMAIL_MODIFY_SCOPE};
use crate::gmail::GoogleAuthorizer;

/// Client secrets filename in the config directory
const CLIENT_SECRETS_FILE: &str = "client_secret.json";

/// Settings filename in the config directory
const SETTINGS_FILE: &str = "settings.json";

/// OAuth client credentials registered with Google
#[derive(Debug, Clone)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientSecrets {
    /// Load client secrets, preferring `explicit_path` when given
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Some(secrets) = Self::from_compile_time() {
            return Ok(secrets);
        }

        if config::config_exists(CLIENT_SECRETS_FILE) {
            let file: GoogleCredentialFile = config::load_json(CLIENT_SECRETS_FILE)?;
            return Self::from_credential_file(file);
        }

        Self::from_env()
    }

    /// Credentials embedded at build time.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(file)
    }

    /// Parse client secrets from JSON (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse client secrets JSON")?;
        Self::from_credential_file(file)
    }

    fn from_credential_file(file: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = file
            .installed
            .or(file.web)
            .context("Client secrets file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID")
            .context("GMAIL_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GMAIL_CLIENT_SECRET")
            .context("GMAIL_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Default client secrets path (~/.config/gmail-assistant/client_secret.json)
    pub fn default_path() -> Option<PathBuf> {
        config::config_path(CLIENT_SECRETS_FILE)
    }
}

/// Optional user settings; every field falls back to a default
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// Token file location (default: token.json in the config directory)
    pub token_file: Option<PathBuf>,
    /// Seconds to wait for the browser consent flow
    pub auth_timeout_secs: Option<u64>,
    /// OAuth scopes to request
    pub scopes: Option<Vec<String>>,
}

impl AssistantSettings {
    /// Load settings.json from the config directory, or defaults if absent
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)
        } else {
            Ok(Self::default())
        }
    }

    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_file {
            Some(path) => Ok(path.clone()),
            None => Ok(FileTokenStore::default_location()?.path().to_path_buf()),
        }
    }

    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(GoogleAuthorizer::DEFAULT_CALLBACK_TIMEOUT)
    }

    pub fn scopes(&self) -> Vec<String> {
        match &self.scopes {
            Some(scopes) if !scopes.is_empty() => scopes.clone(),
            _ => vec![GMAIL_MODIFY_SCOPE.to_string()],
        }
    }
}
