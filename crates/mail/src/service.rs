//! Mail query service
//!
//! The three mailbox queries exposed to the assistant. Every operation returns
//! a `Result`; faults from the API, the credential manager or extraction are
//! converted into [`MailError`] values and never escape as panics.

use anyhow::Result as AnyResult;
use std::sync::Arc;

use crate::credentials::CredentialManager;
use crate::error::{MailError, Result};
use crate::extract::extract;
use crate::models::{Credential, ExtractedMessage, MessageId, Payload, SearchPage};

/// Trait for the remote mail API
pub trait MailApi: Send + Sync {
    /// Search the mailbox with a Gmail query string (`is:unread`, `in:all`, free text...)
    fn search(
        &self,
        credential: &Credential,
        query: &str,
        max_results: Option<u32>,
    ) -> AnyResult<SearchPage>;

    /// Fetch and normalize a full message
    fn get(&self, credential: &Credential, id: &MessageId) -> AnyResult<Payload>;
}

impl<T: MailApi + ?Sized> MailApi for Arc<T> {
    fn search(
        &self,
        credential: &Credential,
        query: &str,
        max_results: Option<u32>,
    ) -> AnyResult<SearchPage> {
        (**self).search(credential, query, max_results)
    }

    fn get(&self, credential: &Credential, id: &MessageId) -> AnyResult<Payload> {
        (**self).get(credential, id)
    }
}

/// Gmail search queries used by the service
pub mod queries {
    pub const UNREAD: &str = "is:unread";
    pub const UNREAD_PRIMARY: &str = "is:unread category:primary";

    /// Search the whole mailbox (read or unread, any category)
    pub fn all_mail(keywords: &str) -> String {
        format!("in:all {}", keywords)
    }
}

enum ServiceState {
    Ready(CredentialManager),
    /// Authentication failed at startup; never retried
    Unavailable { reason: String },
}

/// Query service over one mailbox
pub struct MailQueryService {
    api: Box<dyn MailApi>,
    state: ServiceState,
}

impl MailQueryService {
    /// Create the service, authenticating once up front.
    ///
    /// If no credential can be obtained the service is still returned, but
    /// every operation fails with [`MailError::ServiceUnavailable`].
    pub fn new(api: Box<dyn MailApi>, credentials: CredentialManager) -> Self {
        let state = match credentials.obtain() {
            Ok(_) => {
                log::info!("Gmail service created successfully");
                ServiceState::Ready(credentials)
            }
            Err(e) => {
                log::error!("Credentials not available, Gmail service disabled: {}", e);
                ServiceState::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        Self { api, state }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    /// Estimated number of unread messages in the whole mailbox.
    ///
    /// This is the server's estimate, not an exact count.
    pub fn unread_count(&self) -> Result<u32> {
        let credential = self.credential()?;
        let page = self
            .api
            .search(&credential, queries::UNREAD, None)
            .map_err(|e| MailError::remote("An error occurred while getting unread count", &e))?;
        Ok(page.result_size_estimate)
    }

    /// Subject and body of the most recent unread message in the primary category
    pub fn latest_unread_primary_message(&self) -> Result<Option<ExtractedMessage>> {
        let credential = self.credential()?;
        self.first_match(
            &credential,
            queries::UNREAD_PRIMARY,
            "An error occurred while fetching the latest unread primary email",
        )
    }

    /// Subject and body of the first message matching free-text keywords
    pub fn find_by_keywords(&self, keywords: &str) -> Result<Option<ExtractedMessage>> {
        self.ensure_available()?;
        if keywords.trim().is_empty() {
            return Err(MailError::InvalidArgument {
                message: "Keywords are required for searching emails.".to_string(),
            });
        }

        let credential = self.credential()?;
        self.first_match(
            &credential,
            &queries::all_mail(keywords),
            "An error occurred while finding email by keywords",
        )
    }

    /// Forget and delete the stored credential
    pub fn logout(&self) -> Result<()> {
        self.ensure_available()?
            .logout()
            .map_err(|e| MailError::remote("Failed to remove stored credential", &e))
    }

    /// Search for at most one message, then fetch and extract it
    fn first_match(
        &self,
        credential: &Credential,
        query: &str,
        context: &str,
    ) -> Result<Option<ExtractedMessage>> {
        let page = self
            .api
            .search(credential, query, Some(1))
            .map_err(|e| MailError::remote(context, &e))?;

        let Some(id) = page.ids.first() else {
            log::debug!("No messages match {:?}", query);
            return Ok(None);
        };

        let payload = self
            .api
            .get(credential, id)
            .map_err(|e| MailError::remote(context, &e))?;

        Ok(Some(extract(&payload)?))
    }

    fn ensure_available(&self) -> Result<&CredentialManager> {
        match &self.state {
            ServiceState::Ready(credentials) => Ok(credentials),
            ServiceState::Unavailable { reason } => Err(MailError::ServiceUnavailable {
                reason: reason.clone(),
            }),
        }
    }

    fn credential(&self) -> Result<Credential> {
        self.ensure_available()?.obtain()
    }
}
