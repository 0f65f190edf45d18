//! Gmail API HTTP client
//!
//! Search and fetch for messages in the authenticated user's mailbox.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};

use super::api::{GmailMessage, ListMessagesResponse};
use super::normalize_message;
use crate::models::{Credential, MessageId, Payload, SearchPage};
use crate::service::MailApi;

/// Gmail API client; the bearer token is supplied per request
pub struct GmailClient {
    base_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Upper bound Gmail accepts for maxResults
    const MAX_PAGE_SIZE: u32 = 500;

    pub fn new() -> Self {
        Self::with_base_url(Self::BASE_URL)
    }

    /// Point the client at a different API root
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn list_messages_url(&self, query: &str, max_results: Option<u32>) -> String {
        let mut url = format!(
            "{}/users/me/messages?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        if let Some(max) = max_results {
            url.push_str(&format!("&maxResults={}", max.clamp(1, Self::MAX_PAGE_SIZE)));
        }
        url
    }

    fn get_message_url(&self, id: &MessageId) -> String {
        format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url,
            urlencoding::encode(id.as_str())
        )
    }

    /// List messages matching a Gmail search query
    pub fn list_messages(
        &self,
        credential: &Credential,
        query: &str,
        max_results: Option<u32>,
    ) -> Result<ListMessagesResponse> {
        let url = self.list_messages_url(query, max_results);
        log::debug!("Listing messages with query {:?}", query);

        let mut response = ureq::get(&url)
            .header("Authorization", &credential.authorization_header())
            .call()
            .context("Failed to send list messages request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")
    }

    /// Get full message details by ID
    pub fn get_message(&self, credential: &Credential, id: &MessageId) -> Result<GmailMessage> {
        let url = self.get_message_url(id);
        log::debug!("Fetching message {}", id.as_str());

        let mut response = ureq::get(&url)
            .header("Authorization", &credential.authorization_header())
            .call()
            .context("Failed to send get message request")?;

        response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")
    }
}

impl MailApi for GmailClient {
    fn search(
        &self,
        credential: &Credential,
        query: &str,
        max_results: Option<u32>,
    ) -> Result<SearchPage> {
        let list = self.list_messages(credential, query, max_results)?;
        Ok(SearchPage {
            ids: list
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| MessageId::new(m.id))
                .collect(),
            result_size_estimate: list.result_size_estimate.unwrap_or(0),
        })
    }

    fn get(&self, credential: &Credential, id: &MessageId) -> Result<Payload> {
        let message = self.get_message(credential, id)?;
        Ok(normalize_message(&message))
    }
}
