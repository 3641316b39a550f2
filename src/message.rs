//! Decoded email message content.
//!
//! This module provides [`MessageContent`], the already-decoded representation of
//! one email message that the analysis pipeline consumes. Decoding the binary
//! message container happens elsewhere; this type only carries plain text and
//! attachment metadata.
//!
//! # Examples
//!
//! ## Builder Pattern
//!
//! ```
//! use mailsift::message::{Attachment, MessageContent};
//!
//! let msg = MessageContent::new("Quarterly report", "Please find the report attached.")
//!     .with_sender("alice@example.com")
//!     .with_attachment(Attachment::new("report.pdf", 48_000, "application/pdf"));
//!
//! assert_eq!(msg.subject(), "Quarterly report");
//! assert_eq!(msg.attachments().len(), 1);
//! ```
//!
//! ## Deserialization
//!
//! Decoders usually hand messages over as JSON:
//!
//! ```
//! use mailsift::message::MessageContent;
//!
//! let json = r#"{"subject":"Hi","body_text":"Hello there","sender":"bob@example.com"}"#;
//! let msg: MessageContent = serde_json::from_str(json)?;
//! assert_eq!(msg.sender(), "bob@example.com");
//! assert!(msg.attachments().is_empty());
//! # Ok::<(), serde_json::Error>(())
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Metadata for one attachment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name as presented by the message (long name preferred).
    pub filename: String,

    /// Size in bytes.
    #[serde(default, alias = "size")]
    pub size_bytes: u64,

    /// MIME type, possibly empty.
    #[serde(default)]
    pub content_type: String,
}

impl Attachment {
    /// Creates attachment metadata.
    pub fn new(filename: impl Into<String>, size_bytes: u64, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            size_bytes,
            content_type: content_type.into(),
        }
    }

    /// Returns the lower-cased extension (text after the last dot), if any.
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }
}

/// One decoded email message.
///
/// Sender and recipient fields are carried through unmodified; only subject,
/// body text and attachment metadata take part in analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message-ID header or a decoder-assigned identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub message_id: Option<String>,

    /// Subject line.
    #[serde(default)]
    pub subject: String,

    /// Sender display string.
    #[serde(default)]
    pub sender: String,

    /// Primary recipients.
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Carbon-copy recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc_recipients: Vec<String>,

    /// When the message was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,

    /// Plain-text body.
    #[serde(default)]
    pub body_text: String,

    /// HTML body, when the message had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub body_html: Option<String>,

    /// Attachment metadata in message order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl MessageContent {
    /// Creates a message with subject and plain-text body.
    pub fn new(subject: impl Into<String>, body_text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body_text: body_text.into(),
            ..Self::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Builder method to set the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Builder method to set the primary recipients.
    #[must_use]
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.recipients = recipients;
        self
    }

    /// Builder method to set the message id.
    #[must_use]
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Builder method to set the send time.
    #[must_use]
    pub fn with_sent_at(mut self, ts: DateTime<Utc>) -> Self {
        self.sent_at = Some(ts);
        self
    }

    /// Builder method to set the HTML body.
    #[must_use]
    pub fn with_body_html(mut self, html: impl Into<String>) -> Self {
        self.body_html = Some(html.into());
        self
    }

    /// Builder method to append an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Returns the subject line.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the plain-text body.
    pub fn body_text(&self) -> &str {
        &self.body_text
    }

    /// Returns the sender.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the attachments.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Checks that the message is fit for analysis.
    ///
    /// Every attachment must have a filename, and subject and body must be
    /// decoded text (no NUL characters).
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.subject.contains('\0') {
            return Err(AnalysisError::NonTextContent { field: "subject" });
        }
        if self.body_text.contains('\0') {
            return Err(AnalysisError::NonTextContent { field: "body_text" });
        }
        if let Some(index) = self
            .attachments
            .iter()
            .position(|att| att.filename.trim().is_empty())
        {
            return Err(AnalysisError::MissingField {
                field: format!("attachments[{index}].filename"),
            });
        }
        Ok(())
    }
}

/// Splits a raw recipient header into individual addresses.
///
/// Recipients are separated by `;` or `,`; surrounding whitespace and empty
/// entries are dropped.
///
/// ```
/// use mailsift::message::parse_recipients;
///
/// let list = parse_recipients("alice@example.com; bob@example.com,, carol");
/// assert_eq!(list, vec!["alice@example.com", "bob@example.com", "carol"]);
/// ```
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_message_new() {
        let msg = MessageContent::new("Hello", "Body");
        assert_eq!(msg.subject(), "Hello");
        assert_eq!(msg.body_text(), "Body");
        assert!(msg.attachments().is_empty());
        assert!(msg.sent_at.is_none());
    }

    #[test]
    fn test_message_builder() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let msg = MessageContent::new("Hello", "Body")
            .with_sender("alice@example.com")
            .with_message_id("<abc@example.com>")
            .with_sent_at(ts)
            .with_body_html("<p>Body</p>")
            .with_attachment(Attachment::new("a.pdf", 10, "application/pdf"));

        assert_eq!(msg.sender(), "alice@example.com");
        assert_eq!(msg.message_id.as_deref(), Some("<abc@example.com>"));
        assert_eq!(msg.sent_at, Some(ts));
        assert_eq!(msg.body_html.as_deref(), Some("<p>Body</p>"));
        assert_eq!(msg.attachments().len(), 1);
    }

    #[test]
    fn test_attachment_extension() {
        assert_eq!(Attachment::new("Report.PDF", 0, "").extension().as_deref(), Some("pdf"));
        assert_eq!(Attachment::new("archive.tar.gz", 0, "").extension().as_deref(), Some("gz"));
        assert!(Attachment::new("README", 0, "").extension().is_none());
    }

    #[test]
    fn test_validate_accepts_plain_message() {
        let msg = MessageContent::new("", "").with_attachment(Attachment::new("x.csv", 1, ""));
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_attachment_name() {
        let msg = MessageContent::new("s", "b")
            .with_attachment(Attachment::new("ok.txt", 1, ""))
            .with_attachment(Attachment::new("  ", 1, ""));
        assert_eq!(
            msg.validate(),
            Err(AnalysisError::MissingField {
                field: "attachments[1].filename".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_binary_body() {
        let msg = MessageContent::new("s", "bin\0ary");
        assert_eq!(
            msg.validate(),
            Err(AnalysisError::NonTextContent { field: "body_text" })
        );
    }

    #[test]
    fn test_message_deserialization_defaults() {
        let json = r#"{"subject":"Hi","attachments":[{"filename":"a.png","size":2048}]}"#;
        let msg: MessageContent = serde_json::from_str(json).unwrap();
        assert_eq!(msg.subject(), "Hi");
        assert_eq!(msg.body_text(), "");
        assert_eq!(msg.attachments()[0].size_bytes, 2048);
        assert_eq!(msg.attachments()[0].content_type, "");
    }

    #[test]
    fn test_message_serialization_skips_empty_optionals() {
        let msg = MessageContent::new("Hi", "Body");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("sent_at"));
        assert!(!json.contains("body_html"));
        assert!(!json.contains("cc_recipients"));
    }

    #[test]
    fn test_parse_recipients() {
        assert_eq!(parse_recipients(""), Vec::<String>::new());
        assert_eq!(parse_recipients("a@x.com"), vec!["a@x.com"]);
        assert_eq!(parse_recipients(" a@x.com ;b@y.com , "), vec!["a@x.com", "b@y.com"]);
    }
}
