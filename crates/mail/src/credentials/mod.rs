//! Credential lifecycle
//!
//! - [`TokenStore`]: persistence of the serialized credential
//! - [`Authorizer`]: the authorization server (refresh + interactive consent)
//! - [`CredentialManager`]: load, validate, refresh, re-authorize, persist

mod manager;
mod store;

pub use manager::CredentialManager;
pub use store::{FileTokenStore, InMemoryTokenStore, TokenStore};

use anyhow::Result;
use std::sync::Arc;

use crate::models::Credential;

/// Scope requested by default: read plus label changes
pub const GMAIL_MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Trait for the OAuth2 authorization server
pub trait Authorizer: Send + Sync {
    /// Exchange the credential's refresh token for a new access token
    fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Run the interactive consent flow for the given scopes.
    ///
    /// May block until the user completes or abandons the flow; implementations
    /// must give up after a bounded time.
    fn authorize(&self, scopes: &[String]) -> Result<Credential>;
}

impl<T: Authorizer + ?Sized> Authorizer for Arc<T> {
    fn refresh(&self, credential: &Credential) -> Result<Credential> {
        (**self).refresh(credential)
    }

    fn authorize(&self, scopes: &[String]) -> Result<Credential> {
        (**self).authorize(scopes)
    }
}
