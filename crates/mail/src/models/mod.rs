//! Domain models for mail entities

mod credential;
mod message;

pub use credential::Credential;
pub use message::{
    BodyFormat, ExtractedMessage, Header, MessageId, Payload, PayloadContent, SearchPage,
};
