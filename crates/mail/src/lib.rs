//! Mail crate - Gmail access for a conversational assistant
//!
//! This crate provides:
//! - Credential lifecycle for Google OAuth2 (load, refresh, re-authorize, persist)
//! - Gmail API client and payload normalization
//! - Subject/body extraction from multipart payloads
//! - The query service behind the assistant's three tools
//! - Tool definitions and JSON dispatch for an agent runtime
//!
//! All I/O is synchronous; nothing here depends on an async executor.

pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod gmail;
pub mod models;
pub mod service;
pub mod tools;

pub use crate::config::{AssistantSettings, ClientSecrets};
pub use credentials::{
    Authorizer, CredentialManager, FileTokenStore, GMAIL_MODIFY_SCOPE, InMemoryTokenStore,
    TokenStore,
};
pub use error::{ExtractionError, MailError};
pub use extract::{DEFAULT_SUBJECT, extract};
pub use gmail::{GmailClient, GoogleAuthorizer};
pub use models::{
    BodyFormat, Credential, ExtractedMessage, Header, MessageId, Payload, PayloadContent,
    SearchPage,
};
pub use service::{MailApi, MailQueryService};
pub use tools::{MailTools, ToolDefinition};
