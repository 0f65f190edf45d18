//! Gmail API response normalization
//!
//! Converts loosely typed Gmail message parts into the tagged [`Payload`] tree.

use super::api::{GmailMessage, MessagePart};
use crate::models::{BodyFormat, Header, Payload, PayloadContent};

/// Normalize a full Gmail message; a message without payload becomes an empty payload
pub fn normalize_message(message: &GmailMessage) -> Payload {
    match &message.payload {
        Some(part) => normalize_part(part),
        None => Payload::empty(BodyFormat::Other(String::new())),
    }
}

/// Normalize one message part, recursing into its children.
///
/// Child parts take precedence over inline data when both are present.
pub fn normalize_part(part: &MessagePart) -> Payload {
    let format = BodyFormat::from_mime_type(part.mime_type.as_deref().unwrap_or_default());

    let headers = part
        .headers
        .as_ref()
        .map(|headers| {
            headers
                .iter()
                .map(|h| Header::new(&h.name, &h.value))
                .collect()
        })
        .unwrap_or_default();

    let content = match &part.parts {
        Some(children) if !children.is_empty() => {
            PayloadContent::Parts(children.iter().map(normalize_part).collect())
        }
        _ => match part.body.as_ref().and_then(|b| b.data.as_ref()) {
            Some(data) => PayloadContent::Inline(data.clone()),
            None => PayloadContent::Empty,
        },
    };

    Payload {
        format,
        headers,
        content,
    }
}
