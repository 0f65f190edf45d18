//! Message payload model
//!
//! A [`Payload`] is the tagged, recursive form of a message as returned by the
//! mail API: headers, a declared format and either inline body data or child
//! parts.

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Email header (name-value pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Declared format of a payload, parsed from its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyFormat {
    PlainText,
    Html,
    Multipart,
    /// Any other MIME type, lowercased (empty when none was declared)
    Other(String),
}

impl BodyFormat {
    /// Parse a MIME type such as `text/plain; charset="UTF-8"`.
    ///
    /// Only the essence before `;` is considered, case-insensitively.
    pub fn from_mime_type(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/plain" => Self::PlainText,
            "text/html" => Self::Html,
            m if m.starts_with("multipart/") => Self::Multipart,
            _ => Self::Other(essence),
        }
    }

    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::PlainText)
    }
}

/// Body of a payload: inline encoded data, child parts, or nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadContent {
    /// URL-safe base64 body data, still encoded
    Inline(String),
    /// Ordered child parts (multipart); never empty
    Parts(Vec<Payload>),
    Empty,
}

/// One message (or message part) as a recursive tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub format: BodyFormat,
    pub headers: Vec<Header>,
    pub content: PayloadContent,
}

impl Payload {
    /// Leaf payload with inline encoded data
    pub fn inline(format: BodyFormat, data: impl Into<String>) -> Self {
        Self {
            format,
            headers: Vec::new(),
            content: PayloadContent::Inline(data.into()),
        }
    }

    /// Container payload; an empty child list yields [`PayloadContent::Empty`]
    pub fn multipart(parts: Vec<Payload>) -> Self {
        let content = if parts.is_empty() {
            PayloadContent::Empty
        } else {
            PayloadContent::Parts(parts)
        };
        Self {
            format: BodyFormat::Multipart,
            headers: Vec::new(),
            content,
        }
    }

    /// Payload with neither data nor children
    pub fn empty(format: BodyFormat) -> Self {
        Self {
            format,
            headers: Vec::new(),
            content: PayloadContent::Empty,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Value of the first header whose name matches exactly (case-sensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// Human-readable subject/body pair extracted from a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMessage {
    pub subject: String,
    pub body: String,
}

/// Result of a mailbox search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Matching message IDs, most recent first
    pub ids: Vec<MessageId>,
    /// Server-side estimate of the total number of matches
    pub result_size_estimate: u32,
}
