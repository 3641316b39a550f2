//! Keyword-table message categorization.
//!
//! A [`CategoryTable`] maps category labels to keyword lists and attachment
//! labels to extension lists. Categorization is a substring test over the
//! lower-cased `subject + " " + body`, in table declaration order, followed by
//! attachment-derived labels. An empty result is replaced by [`GENERAL`].

use crate::message::Attachment;

/// Label added when a message has at least one attachment.
pub const HAS_ATTACHMENTS: &str = "has_attachments";

/// Fallback label when nothing else matched.
pub const GENERAL: &str = "general";

const STANDARD_KEYWORDS: &[(&str, &[&str])] = &[
    ("meeting", &["meeting", "conference", "call", "appointment", "schedule"]),
    ("invoice", &["invoice", "bill", "payment", "amount due", "billing"]),
    ("report", &["report", "analysis", "summary", "findings", "results"]),
    ("urgent", &["urgent", "asap", "immediate", "critical", "emergency"]),
    ("follow_up", &["follow up", "followup", "reminder", "checking in"]),
    ("contract", &["contract", "agreement", "terms", "legal", "signature"]),
    ("support", &["help", "support", "issue", "problem", "assistance"]),
];

const STANDARD_EXTENSIONS: &[(&str, &[&str])] = &[
    ("document", &["pdf", "doc", "docx"]),
    ("image", &["jpg", "png", "gif", "bmp"]),
    ("spreadsheet", &["xls", "xlsx", "csv"]),
];

/// A category keyword table plus attachment extension labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    keywords: Vec<(String, Vec<String>)>,
    extensions: Vec<(String, Vec<String>)>,
}

impl CategoryTable {
    /// Returns the standard table.
    pub fn standard() -> Self {
        Self {
            keywords: own(STANDARD_KEYWORDS),
            extensions: own(STANDARD_EXTENSIONS),
        }
    }

    /// Creates a table with no categories at all.
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
            extensions: Vec::new(),
        }
    }

    /// Builder method to add a keyword category, or replace its keywords if
    /// the label already exists (keeping its position).
    #[must_use]
    pub fn with_category<I, S>(mut self, label: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        upsert(&mut self.keywords, label, keywords);
        self
    }

    /// Builder method to add an attachment label for a set of extensions.
    #[must_use]
    pub fn with_extension_label<I, S>(mut self, label: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        upsert(&mut self.extensions, label, extensions);
        self
    }

    /// Returns keyword category labels in declaration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|(label, _)| label.as_str())
    }

    /// Returns the keywords for a label.
    pub fn keywords(&self, label: &str) -> Option<&[String]> {
        self.keywords
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, k)| k.as_slice())
    }

    /// Assigns category labels to a message. Never returns an empty list.
    ///
    /// # Example
    ///
    /// ```
    /// use mailsift::analysis::CategoryTable;
    /// use mailsift::message::Attachment;
    ///
    /// let table = CategoryTable::standard();
    /// let labels = table.categorize(
    ///     "Invoice for March",
    ///     "Payment is urgent",
    ///     &[Attachment::new("invoice.pdf", 1, "application/pdf")],
    /// );
    /// assert_eq!(labels, ["invoice", "urgent", "has_attachments", "document"]);
    ///
    /// assert_eq!(table.categorize("Hi", "Hello", &[]), ["general"]);
    /// ```
    pub fn categorize(&self, subject: &str, body: &str, attachments: &[Attachment]) -> Vec<String> {
        let text = format!("{subject} {body}").to_lowercase();
        let mut labels: Vec<String> = Vec::new();

        for (label, keywords) in &self.keywords {
            if keywords.iter().any(|k| text.contains(k.as_str())) {
                push_unique(&mut labels, label);
            }
        }

        if !attachments.is_empty() {
            push_unique(&mut labels, HAS_ATTACHMENTS);

            for attachment in attachments {
                let name = attachment.filename.to_lowercase();
                let matched = self.extensions.iter().find(|(_, exts)| {
                    exts.iter()
                        .any(|ext| name.strip_suffix(ext.as_str()).is_some_and(|s| s.ends_with('.')))
                });
                if let Some((label, _)) = matched {
                    push_unique(&mut labels, label);
                }
            }
        }

        if labels.is_empty() {
            labels.push(GENERAL.to_string());
        }
        labels
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Categorizes with the standard table.
pub fn categorize(subject: &str, body: &str, attachments: &[Attachment]) -> Vec<String> {
    CategoryTable::standard().categorize(subject, body, attachments)
}

fn own(table: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    table
        .iter()
        .map(|(label, words)| {
            (
                (*label).to_string(),
                words.iter().map(|w| (*w).to_string()).collect(),
            )
        })
        .collect()
}

fn upsert(entries: &mut Vec<(String, Vec<String>)>, label: &str, values: Vec<String>) {
    match entries.iter_mut().find(|(l, _)| l == label) {
        Some(slot) => slot.1 = values,
        None => entries.push((label.to_string(), values)),
    }
}

fn push_unique(labels: &mut Vec<String>, label: &str) {
    if !labels.iter().any(|l| l == label) {
        labels.push(label.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn att(name: &str) -> Attachment {
        Attachment::new(name, 1, "")
    }

    #[test]
    fn test_general_fallback() {
        assert_eq!(categorize("Hello", "How are you", &[]), vec!["general"]);
        assert_eq!(categorize("", "", &[]), vec!["general"]);
    }

    #[test]
    fn test_declaration_order() {
        // support keyword appears first in text, meeting is declared first
        let labels = categorize("Need help", "Can we schedule a call?", &[]);
        assert_eq!(labels, vec!["meeting", "support"]);
    }

    #[test]
    fn test_multiword_keyword() {
        assert_eq!(categorize("Just checking in", "", &[]), vec!["follow_up"]);
        assert_eq!(categorize("", "The amount due is 10", &[]), vec!["invoice"]);
    }

    #[test]
    fn test_substring_semantics() {
        // "bill" matches inside "billing"
        assert_eq!(categorize("Billing", "", &[]), vec!["invoice"]);
    }

    #[test]
    fn test_attachment_labels() {
        let labels = categorize(
            "Hi",
            "See files",
            &[att("photo.JPG"), att("sheet.xlsx"), att("notes.pdf"), att("more.png")],
        );
        assert_eq!(labels, vec!["has_attachments", "image", "spreadsheet", "document"]);
    }

    #[test]
    fn test_unknown_extension_only_has_attachments() {
        assert_eq!(categorize("Hi", "", &[att("archive.zip")]), vec!["has_attachments"]);
    }

    #[test]
    fn test_extension_needs_dot() {
        assert_eq!(categorize("Hi", "", &[att("mypdf")]), vec!["has_attachments"]);
    }

    #[test]
    fn test_custom_table() {
        let table = CategoryTable::empty()
            .with_category("travel", ["Flight", "hotel"])
            .with_extension_label("archive", [".zip"]);
        assert_eq!(
            table.categorize("Flight booked", "", &[att("docs.zip")]),
            vec!["travel", "has_attachments", "archive"]
        );
        assert_eq!(table.keywords("travel").unwrap(), ["flight", "hotel"]);
    }

    #[test]
    fn test_replace_category_keeps_position() {
        let table = CategoryTable::standard().with_category("meeting", ["standup"]);
        assert_eq!(table.labels().next(), Some("meeting"));
        assert_eq!(table.categorize("Meeting", "", &[]), vec!["general"]);
        assert_eq!(table.categorize("Standup", "", &[]), vec!["meeting"]);
    }
}
