//! Agent tool binding
//!
//! Exposes the query service as named tools with JSON-schema parameters, the
//! way an agent runtime discovers and invokes them. Every invocation yields a
//! JSON object the agent can narrate: a result, `{}` when nothing matched, or
//! `{"error": "..."}`.

use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::MailError;
use crate::models::ExtractedMessage;
use crate::service::MailQueryService;

pub const AGENT_NAME: &str = "gmail_assistant";

pub const AGENT_DESCRIPTION: &str = "Agent to summarize the emails from user's inbox";

/// First thing the assistant says to the user
pub const GREETING: &str = "Hi, I am your Gmail Assistant. What can I do for you?";

/// Asked before calling [`FIND_BY_KEYWORDS`]
pub const KEYWORD_PROMPT: &str = "Which keywords should I search your mailbox for?";

/// System instruction for a language-model agent driving these tools
pub const INSTRUCTIONS: &str = "\
You should start by greeting the user with - \"Hi, I am your Gmail Assistant. What can I do for you?\"
You are a helpful agent. Examples of stuff you can do:
1. If asked, list the total number of unread emails.
2. If asked to list the latest unread email, you need to get and summarize the latest unread email for the user.
3. If the user asks you to search an email from the inbox, ask users to specify keywords. When the user has shared keywords, send it as a string to the function.";

pub const UNREAD_COUNT: &str = "get_unread_email_count";
pub const LATEST_UNREAD_PRIMARY: &str = "get_latest_unread_primary_email_body";
pub const FIND_BY_KEYWORDS: &str = "find_email_by_keywords";

/// A tool the agent can invoke
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters
    pub parameters: Value,
}

/// Tool facade over a shared [`MailQueryService`]
pub struct MailTools {
    service: Arc<MailQueryService>,
}

impl MailTools {
    pub fn new(service: Arc<MailQueryService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &MailQueryService {
        &self.service
    }

    /// Definitions of every tool, in a stable order
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: UNREAD_COUNT.to_string(),
                description: "Returns the total number of unread emails in the inbox \
                              under the key 'unread_count'."
                    .to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: LATEST_UNREAD_PRIMARY.to_string(),
                description: "Returns the 'subject' and 'body' of the latest unread email \
                              in the primary inbox, or an empty object if there is none."
                    .to_string(),
                parameters: json!({ "type": "object", "properties": {} }),
            },
            ToolDefinition {
                name: FIND_BY_KEYWORDS.to_string(),
                description: "Finds an email matching the keywords and returns its \
                              'subject' and 'body', or an empty object if none matches."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "keywords": {
                            "type": "string",
                            "description": "The keywords to search for in the email."
                        }
                    },
                    "required": ["keywords"]
                }),
            },
        ]
    }

    /// Invoke a tool by name with JSON arguments
    pub fn invoke(&self, name: &str, args: &Value) -> Value {
        log::debug!("Invoking tool {}", name);
        match name {
            UNREAD_COUNT => self.unread_count(),
            LATEST_UNREAD_PRIMARY => self.latest_unread_primary_message(),
            FIND_BY_KEYWORDS => {
                let keywords = args.get("keywords").and_then(Value::as_str).unwrap_or("");
                self.find_by_keywords(keywords)
            }
            other => json!({ "error": format!("Unknown tool: {}", other) }),
        }
    }

    pub fn unread_count(&self) -> Value {
        match self.service.unread_count() {
            Ok(count) => json!({ "unread_count": count }),
            Err(e) => error_value(&e),
        }
    }

    pub fn latest_unread_primary_message(&self) -> Value {
        message_value(self.service.latest_unread_primary_message())
    }

    pub fn find_by_keywords(&self, keywords: &str) -> Value {
        message_value(self.service.find_by_keywords(keywords))
    }
}

fn message_value(result: Result<Option<ExtractedMessage>, MailError>) -> Value {
    match result {
        Ok(Some(message)) => json!({ "subject": message.subject, "body": message.body }),
        Ok(None) => json!({}),
        Err(e) => error_value(&e),
    }
}

fn error_value(err: &MailError) -> Value {
    log::warn!("Tool call failed: {}", err);
    json!({ "error": err.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_names_and_schema() {
        let defs = MailTools::definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![UNREAD_COUNT, LATEST_UNREAD_PRIMARY, FIND_BY_KEYWORDS]);
        assert_eq!(defs[2].parameters["required"], json!(["keywords"]));
        assert_eq!(defs[2].parameters["properties"]["keywords"]["type"], "string");
    }

    #[test]
    fn test_message_value_shapes() {
        let found = message_value(Ok(Some(ExtractedMessage {
            subject: "Hi".to_string(),
            body: "there".to_string(),
        })));
        assert_eq!(found, json!({ "subject": "Hi", "body": "there" }));
        assert_eq!(message_value(Ok(None)), json!({}));

        let failed = message_value(Err(MailError::InvalidArgument {
            message: "Keywords are required for searching emails.".to_string(),
        }));
        assert_eq!(
            failed["error"],
            "Invalid argument: Keywords are required for searching emails."
        );
    }

    #[test]
    fn test_instructions_open_with_greeting() {
        assert!(INSTRUCTIONS.contains(GREETING));
    }
}
