//! Subject and body extraction from message payloads
//!
//! The body policy is deliberately shallow: for a multipart payload only the
//! direct children are scanned and the first `text/plain` child wins, even
//! when it is empty. Nested multiparts are not searched.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::ExtractionError;
use crate::models::{ExtractedMessage, Payload, PayloadContent};

/// Subject used when the payload has no `Subject` header
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// URL-safe base64 that accepts data with or without padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Extract the subject line and preferred text body from a payload
pub fn extract(payload: &Payload) -> Result<ExtractedMessage, ExtractionError> {
    let subject = payload
        .header("Subject")
        .unwrap_or(DEFAULT_SUBJECT)
        .to_string();

    let body = match &payload.content {
        PayloadContent::Parts(parts) => match parts.iter().find(|p| p.format.is_plain_text()) {
            Some(part) => match &part.content {
                PayloadContent::Inline(data) => decode_body(data)?,
                _ => String::new(),
            },
            None => String::new(),
        },
        PayloadContent::Inline(data) => decode_body(data)?,
        PayloadContent::Empty => String::new(),
    };

    Ok(ExtractedMessage { subject, body })
}

/// Decode URL-safe base64 body data to text
pub fn decode_body(data: &str) -> Result<String, ExtractionError> {
    let bytes = URL_SAFE_LENIENT.decode(data.trim())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BodyFormat;
    use base64::prelude::*;

    fn encode(text: &str) -> String {
        BASE64_URL_SAFE.encode(text)
    }

    #[test]
    fn test_first_plain_part_wins_over_html() {
        let payload = Payload::multipart(vec![
            Payload::inline(BodyFormat::Html, encode("<p>hi</p>")),
            Payload::inline(BodyFormat::PlainText, encode("hello")),
        ])
        .with_header("Subject", "Greetings");

        let extracted = extract(&payload).unwrap();
        assert_eq!(extracted.subject, "Greetings");
        assert_eq!(extracted.body, "hello");
    }

    #[test]
    fn test_missing_subject_uses_default() {
        let payload = Payload::inline(BodyFormat::PlainText, encode("body"));
        assert_eq!(extract(&payload).unwrap().subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn test_subject_header_is_case_sensitive() {
        let payload = Payload::inline(BodyFormat::PlainText, encode("body"))
            .with_header("SUBJECT", "shouting");
        assert_eq!(extract(&payload).unwrap().subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn test_inline_body_decoded_regardless_of_format() {
        let payload = Payload::inline(BodyFormat::Html, encode("<b>bold</b>"));
        assert_eq!(extract(&payload).unwrap().body, "<b>bold</b>");
    }

    #[test]
    fn test_empty_plain_part_stops_scan() {
        let payload = Payload::multipart(vec![
            Payload::empty(BodyFormat::PlainText),
            Payload::inline(BodyFormat::PlainText, encode("second")),
        ]);
        assert_eq!(extract(&payload).unwrap().body, "");
    }

    #[test]
    fn test_nested_multipart_not_searched() {
        let payload = Payload::multipart(vec![
            Payload::multipart(vec![Payload::inline(
                BodyFormat::PlainText,
                encode("deep"),
            )]),
            Payload::inline(BodyFormat::Html, encode("<p>deep</p>")),
        ]);
        assert_eq!(extract(&payload).unwrap().body, "");
    }

    #[test]
    fn test_no_content_gives_empty_body() {
        let payload = Payload::empty(BodyFormat::PlainText).with_header("Subject", "Blank");
        let extracted = extract(&payload).unwrap();
        assert_eq!(extracted.subject, "Blank");
        assert_eq!(extracted.body, "");
    }

    #[test]
    fn test_malformed_base64_is_an_error() {
        let payload = Payload::multipart(vec![Payload::inline(
            BodyFormat::PlainText,
            "not*valid*base64!",
        )]);
        assert!(matches!(
            extract(&payload),
            Err(ExtractionError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let data = BASE64_URL_SAFE.encode([0xff, 0xfe, 0xfd]);
        let payload = Payload::inline(BodyFormat::PlainText, data);
        assert!(matches!(
            extract(&payload),
            Err(ExtractionError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_malformed_html_part_ignored_when_not_selected() {
        let payload = Payload::multipart(vec![
            Payload::inline(BodyFormat::PlainText, encode("fine")),
            Payload::inline(BodyFormat::Html, "%%%"),
        ]);
        assert_eq!(extract(&payload).unwrap().body, "fine");
    }

    #[test]
    fn test_extract_is_deterministic() {
        let payload = Payload::multipart(vec![
            Payload::inline(BodyFormat::Html, encode("<i>x</i>")),
            Payload::inline(BodyFormat::PlainText, encode("x")),
        ])
        .with_header("Subject", "Same");
        assert_eq!(extract(&payload).unwrap(), extract(&payload).unwrap());
    }

    #[test]
    fn test_decode_body_with_and_without_padding() {
        // "Hello, World!" in base64url
        assert_eq!(decode_body("SGVsbG8sIFdvcmxkIQ").unwrap(), "Hello, World!");
        assert_eq!(decode_body("SGVsbG8sIFdvcmxkIQ==").unwrap(), "Hello, World!");
    }

    #[test]
    fn test_decode_body_url_safe_alphabet() {
        // "??>" encodes to "Pz8-" in the URL-safe alphabet
        assert_eq!(decode_body("Pz8-").unwrap(), "??>");
    }
}
