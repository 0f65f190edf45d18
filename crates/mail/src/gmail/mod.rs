//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authorization against Google (refresh + loopback consent flow)
//! - Gmail API client for searching and fetching messages
//! - Normalization of API payloads into [`crate::models::Payload`]

mod auth;
mod client;
mod normalize;

pub use auth::GoogleAuthorizer;
pub use client::GmailClient;
pub use normalize::{normalize_message, normalize_part};

/// Gmail API response types
pub mod api {
    use serde::Deserialize;

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message in a listing
    #[derive(Debug, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Full message from Gmail API; only the payload is consumed
    #[derive(Debug, Deserialize)]
    pub struct GmailMessage {
        pub payload: Option<MessagePart>,
    }

    /// Message part; the top-level payload is a part too
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub mime_type: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Message body (base64url encoded when inline)
    #[derive(Debug, Deserialize)]
    pub struct MessageBody {
        pub data: Option<String>,
    }
}
