//! Credential manager
//!
//! Produces a usable credential, in order of preference:
//! 1. the cached or stored credential, if still valid
//! 2. a refreshed credential, if a refresh token is available
//! 3. a new credential from the interactive consent flow
//!
//! A failed refresh clears the stored record and falls through to step 3.
//! Each call makes at most one refresh attempt and one interactive attempt.

use std::sync::Mutex;

use log::{debug, info, warn};

use super::{Authorizer, GMAIL_MODIFY_SCOPE, TokenStore};
use crate::error::{MailError, Result};
use crate::models::Credential;

pub struct CredentialManager {
    store: Box<dyn TokenStore>,
    authorizer: Box<dyn Authorizer>,
    scopes: Vec<String>,
    cached: Mutex<Option<Credential>>,
}

impl CredentialManager {
    /// Create a manager requesting the Gmail modify scope
    pub fn new(store: Box<dyn TokenStore>, authorizer: Box<dyn Authorizer>) -> Self {
        Self {
            store,
            authorizer,
            scopes: vec![GMAIL_MODIFY_SCOPE.to_string()],
            cached: Mutex::new(None),
        }
    }

    /// Override the scopes requested during interactive authorization
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        if !scopes.is_empty() {
            self.scopes = scopes;
        }
        self
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Return a valid credential, refreshing or re-authorizing as needed.
    ///
    /// Fails with [`MailError::Authentication`] only when interactive
    /// authorization fails or is unavailable.
    pub fn obtain(&self) -> Result<Credential> {
        let mut cached = self.cached.lock().map_err(|_| MailError::Authentication {
            message: "credential cache lock poisoned".to_string(),
        })?;

        let candidate = match cached.take() {
            Some(credential) => Some(credential),
            None => self.load_stored(),
        };

        if let Some(credential) = candidate {
            if credential.is_valid() {
                *cached = Some(credential.clone());
                return Ok(credential);
            }

            if credential.can_refresh() {
                match self.authorizer.refresh(&credential) {
                    Ok(refreshed) => {
                        info!("Access token refreshed");
                        self.persist(&refreshed);
                        *cached = Some(refreshed.clone());
                        return Ok(refreshed);
                    }
                    Err(e) => {
                        warn!("Error refreshing token: {:#}", e);
                        self.discard_stored();
                    }
                }
            } else {
                debug!("Stored credential expired and cannot be refreshed");
            }
        }

        let credential = self
            .authorizer
            .authorize(&self.scopes)
            .map_err(|e| MailError::authentication(&e))?;
        info!("Interactive authorization completed");
        self.persist(&credential);
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Forget the cached credential and remove the stored one
    pub fn logout(&self) -> anyhow::Result<()> {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
        self.store.clear()
    }

    /// Load the stored credential; an unreadable record is removed
    fn load_stored(&self) -> Option<Credential> {
        match self.store.load() {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Ignoring unreadable stored credential: {:#}", e);
                self.discard_stored();
                None
            }
        }
    }

    fn discard_stored(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove stored credential: {:#}", e);
        }
    }

    // A credential that could not be written is still usable for this session
    fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential) {
            warn!("Failed to persist credential: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::InMemoryTokenStore;
    use anyhow::bail;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Calls {
        refresh: AtomicUsize,
        authorize: AtomicUsize,
    }

    struct ScriptedAuthorizer {
        calls: Arc<Calls>,
        refresh_ok: bool,
        authorize_ok: bool,
    }

    impl Authorizer for ScriptedAuthorizer {
        fn refresh(&self, credential: &Credential) -> anyhow::Result<Credential> {
            self.calls.refresh.fetch_add(1, Ordering::SeqCst);
            if !self.refresh_ok {
                bail!("invalid_grant");
            }
            let mut refreshed =
                Credential::new("refreshed").with_expiry(Utc::now() + Duration::hours(1));
            refreshed.refresh_token = credential.refresh_token.clone();
            Ok(refreshed)
        }

        fn authorize(&self, scopes: &[String]) -> anyhow::Result<Credential> {
            self.calls.authorize.fetch_add(1, Ordering::SeqCst);
            if !self.authorize_ok {
                bail!("user closed the browser");
            }
            Ok(Credential::new("interactive")
                .with_refresh_token("fresh-refresh")
                .with_expiry(Utc::now() + Duration::hours(1))
                .with_scopes(scopes.to_vec()))
        }
    }

    fn manager(
        stored: Option<Credential>,
        refresh_ok: bool,
        authorize_ok: bool,
    ) -> (CredentialManager, Arc<InMemoryTokenStore>, Arc<Calls>) {
        let store = Arc::new(match stored {
            Some(c) => InMemoryTokenStore::with_credential(c),
            None => InMemoryTokenStore::new(),
        });
        let calls = Arc::new(Calls::default());
        let authorizer = ScriptedAuthorizer {
            calls: calls.clone(),
            refresh_ok,
            authorize_ok,
        };
        let manager = CredentialManager::new(Box::new(store.clone()), Box::new(authorizer));
        (manager, store, calls)
    }

    /// Store whose writes always fail
    struct ReadOnlyStore;

    impl TokenStore for ReadOnlyStore {
        fn load(&self) -> anyhow::Result<Option<Credential>> {
            Ok(None)
        }

        fn save(&self, _credential: &Credential) -> anyhow::Result<()> {
            bail!("disk full")
        }

        fn clear(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn expired() -> Credential {
        Credential::new("stale")
            .with_refresh_token("refresh")
            .with_expiry(Utc::now() - Duration::hours(1))
    }

    #[test]
    fn test_cached_credential_skips_store_and_authorizer() {
        let valid = Credential::new("valid").with_expiry(Utc::now() + Duration::hours(1));
        let (manager, store, calls) = manager(Some(valid.clone()), true, true);

        assert_eq!(manager.obtain().unwrap(), valid);
        store.clear().unwrap();
        assert_eq!(manager.obtain().unwrap(), valid);

        assert_eq!(calls.refresh.load(Ordering::SeqCst), 0);
        assert_eq!(calls.authorize.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_expired_without_refresh_token_reauthorizes() {
        let stale = Credential::new("stale").with_expiry(Utc::now() - Duration::hours(1));
        let (manager, store, calls) = manager(Some(stale), true, true);

        let credential = manager.obtain().unwrap();
        assert_eq!(credential.access_token, "interactive");
        assert_eq!(calls.refresh.load(Ordering::SeqCst), 0);
        assert_eq!(calls.authorize.load(Ordering::SeqCst), 1);
        assert_eq!(store.stored(), Some(credential));
    }

    #[test]
    fn test_refresh_and_authorize_both_fail() {
        let (manager, store, calls) = manager(Some(expired()), false, false);

        let err = manager.obtain().unwrap_err();
        assert!(matches!(err, MailError::Authentication { .. }));
        assert!(err.to_string().contains("user closed the browser"));
        assert_eq!(calls.refresh.load(Ordering::SeqCst), 1);
        assert_eq!(calls.authorize.load(Ordering::SeqCst), 1);
        assert!(store.stored().is_none());
    }

    #[test]
    fn test_interactive_credential_carries_scopes() {
        let (manager, _store, _calls) = manager(None, true, true);
        let manager = manager.with_scopes(vec!["scope-x".to_string()]);
        assert_eq!(manager.obtain().unwrap().scopes, vec!["scope-x".to_string()]);
    }

    #[test]
    fn test_empty_scope_override_keeps_default() {
        let (manager, _store, _calls) = manager(None, true, true);
        let manager = manager.with_scopes(Vec::new());
        assert_eq!(manager.scopes(), [GMAIL_MODIFY_SCOPE.to_string()]);
    }

    #[test]
    fn test_failed_save_still_returns_credential() {
        let calls = Arc::new(Calls::default());
        let authorizer = ScriptedAuthorizer {
            calls: calls.clone(),
            refresh_ok: true,
            authorize_ok: true,
        };
        let manager = CredentialManager::new(Box::new(ReadOnlyStore), Box::new(authorizer));

        let credential = manager.obtain().unwrap();
        assert_eq!(credential.access_token, "interactive");

        // Cached for the session despite the failed write
        assert_eq!(manager.obtain().unwrap(), credential);
        assert_eq!(calls.authorize.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logout_clears_cache_and_store() {
        let (manager, store, calls) = manager(None, true, true);
        manager.obtain().unwrap();
        assert!(store.stored().is_some());

        manager.logout().unwrap();
        assert!(store.stored().is_none());

        manager.obtain().unwrap();
        assert_eq!(calls.authorize.load(Ordering::SeqCst), 2);
    }
}
