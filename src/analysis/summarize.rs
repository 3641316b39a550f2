//! Rule-based message summarization.
//!
//! Nothing here understands language. Sentences are whatever lies between runs
//! of `.`, `!` and `?`, so abbreviations like `Mr.` split a sentence. That is
//! kept deliberately stable: output for a given body never changes.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::message::Attachment;

/// Maximum number of key points returned.
pub const MAX_KEY_POINTS: usize = 5;

/// Maximum number of action items returned.
pub const MAX_ACTION_ITEMS: usize = 3;

/// Maximum length (in characters) of the first sentence inside a summary.
pub const SUMMARY_SENTENCE_LIMIT: usize = 100;

/// Phrases that promote a sentence to a key point.
const KEY_INDICATORS: &[&str] = &["important", "note that", "please", "action required", "deadline"];

/// Sentences no longer than this are not key points.
const MIN_KEY_SENTENCE_CHARS: usize = 10;

const PRIORITY_TABLE: &[(&str, &[&str])] = &[
    ("high", &["urgent", "asap", "immediate", "critical", "emergency", "high priority"]),
    ("medium", &["important", "soon", "reminder", "follow up"]),
    ("deadline", &["deadline", "due date", "expires", "by end of day", "eod"]),
];

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:•[ \t]*|[-*][ \t]+|\d+[.)][ \t]+)(\S[^\r\n]*)").unwrap()
});

static ACTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:please|could you|can you|need to|must|should)\s+(.+?)(?:[.!?]|$)",
        r"\baction\s*(?:item|required):\s*(.+?)(?:[.!?]|$)",
        r"\bto\s*do:\s*(.+?)(?:[.!?]|$)",
    ]
    .iter()
    .map(|p| {
        RegexBuilder::new(p)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .unwrap()
    })
    .collect()
});

/// Summary, key points and action items of one message body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentSummary {
    /// `"Re: {subject}. {first sentence}"`, or the subject alone
    pub summary: String,
    /// At most [`MAX_KEY_POINTS`] entries, in document order
    pub key_points: Vec<String>,
    /// At most [`MAX_ACTION_ITEMS`] entries, in document order
    pub action_items: Vec<String>,
}

/// Summarizes a message body.
///
/// ```
/// use mailsift::analysis::summarize;
///
/// let body = "Please review the draft. Note that the deadline is Friday!\n- Budget\n- Staffing";
/// let s = summarize("Project plan", body);
///
/// assert_eq!(s.summary, "Re: Project plan. Please review the draft");
/// assert_eq!(s.key_points[0], "Please review the draft");
/// assert!(s.key_points.contains(&"Budget".to_string()));
/// assert_eq!(s.action_items, ["review the draft"]);
/// ```
pub fn summarize(subject: &str, body: &str) -> ContentSummary {
    ContentSummary {
        summary: generate_summary(subject, body),
        key_points: extract_key_points(body),
        action_items: extract_action_items(body),
    }
}

/// Builds the one-line summary.
pub fn generate_summary(subject: &str, body: &str) -> String {
    let first = sentences(body.trim())
        .into_iter()
        .next()
        .map(|(_, s)| s.trim())
        .unwrap_or_default();

    if first.is_empty() {
        return subject.to_string();
    }

    let first = if first.chars().count() > SUMMARY_SENTENCE_LIMIT {
        let head: String = first.chars().take(SUMMARY_SENTENCE_LIMIT - 3).collect();
        format!("{head}...")
    } else {
        first.to_string()
    };

    format!("Re: {subject}. {first}")
}

/// Collects list items and indicator sentences, in document order.
pub fn extract_key_points(body: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut list_spans: Vec<(usize, usize)> = Vec::new();

    for caps in LIST_ITEM.captures_iter(body) {
        let (Some(line), Some(item)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let text = item.as_str().trim();
        if !text.is_empty() {
            list_spans.push((line.start(), line.end()));
            found.push((item.start(), text.to_string()));
        }
    }

    // Sentences never run across a list line.
    let mut prose: Vec<(usize, &str)> = Vec::new();
    let mut cursor = 0;
    for &(start, end) in &list_spans {
        prose.push((cursor, &body[cursor..start]));
        cursor = end;
    }
    prose.push((cursor, &body[cursor..]));

    for (base, region) in prose {
        for (offset, sentence) in sentences(region) {
            let lowered = sentence.to_lowercase();
            if !KEY_INDICATORS.iter().any(|k| lowered.contains(k)) {
                continue;
            }
            let clean = sentence.trim();
            if clean.chars().count() <= MIN_KEY_SENTENCE_CHARS {
                continue;
            }
            found.push((base + offset, clean.to_string()));
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    found
        .into_iter()
        .map(|(_, text)| text)
        .take(MAX_KEY_POINTS)
        .collect()
}

/// Collects request phrases, in document order.
pub fn extract_action_items(body: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();

    for pattern in ACTION_PATTERNS.iter() {
        for caps in pattern.captures_iter(body) {
            if let Some(item) = caps.get(1) {
                let text = item.as_str().trim();
                if !text.is_empty() {
                    found.push((item.start(), text.to_string()));
                }
            }
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    found
        .into_iter()
        .map(|(_, text)| text)
        .take(MAX_ACTION_ITEMS)
        .collect()
}

/// Returns the priority levels whose phrases occur in subject or body.
///
/// ```
/// use mailsift::analysis::priority_indicators;
///
/// assert_eq!(priority_indicators("URGENT", "deadline is EOD"), ["high", "deadline"]);
/// assert!(priority_indicators("Hi", "Thanks").is_empty());
/// ```
pub fn priority_indicators(subject: &str, body: &str) -> Vec<String> {
    let text = format!("{subject} {body}").to_lowercase();
    PRIORITY_TABLE
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| text.contains(p)))
        .map(|(level, _)| (*level).to_string())
        .collect()
}

/// Describes attachment count, extensions and total size.
///
/// ```
/// use mailsift::analysis::attachment_summary;
/// use mailsift::message::Attachment;
///
/// assert_eq!(attachment_summary(&[]), "No attachments");
///
/// let files = [
///     Attachment::new("a.PDF", 1_048_576, ""),
///     Attachment::new("notes", 524_288, ""),
/// ];
/// assert_eq!(attachment_summary(&files), "2 attachments (pdf, unknown) - 1.5 MB total");
/// ```
pub fn attachment_summary(attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return "No attachments".to_string();
    }

    let total = attachments
        .iter()
        .fold(0u64, |sum, a| sum.saturating_add(a.size_bytes));
    let megabytes = total as f64 / (1024.0 * 1024.0);

    let types: BTreeSet<String> = attachments
        .iter()
        .filter(|a| !a.filename.is_empty())
        .map(|a| a.extension().unwrap_or_else(|| "unknown".to_string()))
        .collect();
    let types: Vec<String> = types.into_iter().collect();

    let count = attachments.len();
    let plural = if count == 1 { "" } else { "s" };
    format!(
        "{count} attachment{plural} ({}) - {megabytes:.1} MB total",
        types.join(", ")
    )
}

/// Splits text on runs of sentence punctuation, keeping byte offsets.
fn sentences(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        out.push((start, &text[start..m.start()]));
        start = m.end();
    }
    out.push((start, &text[start..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_first_sentence() {
        assert_eq!(
            generate_summary("Lunch", "  See you at noon! Bring snacks."),
            "Re: Lunch. See you at noon"
        );
    }

    #[test]
    fn test_summary_without_body() {
        assert_eq!(generate_summary("Lunch", ""), "Lunch");
        assert_eq!(generate_summary("Lunch", "   "), "Lunch");
        assert_eq!(generate_summary("Lunch", "...!"), "Lunch");
    }

    #[test]
    fn test_summary_truncates_long_sentence() {
        let body = "x".repeat(150);
        let summary = generate_summary("S", &body);
        let tail = summary.strip_prefix("Re: S. ").unwrap();
        assert_eq!(tail.chars().count(), SUMMARY_SENTENCE_LIMIT);
        assert!(tail.ends_with("..."));
    }

    #[test]
    fn test_summary_exactly_at_limit_is_kept() {
        let body = "y".repeat(SUMMARY_SENTENCE_LIMIT);
        assert_eq!(generate_summary("S", &body), format!("Re: S. {body}"));
    }

    #[test]
    fn test_summary_naive_abbreviation_split() {
        assert_eq!(generate_summary("Intro", "Mr. Smith called."), "Re: Intro. Mr");
    }

    #[test]
    fn test_key_points_lists() {
        let body = "Agenda:\n• Budget\n  - Hiring plan\n* Office move\n1. First\n2) Second\n";
        assert_eq!(
            extract_key_points(body),
            vec!["Budget", "Hiring plan", "Office move", "First", "Second"]
        );
    }

    #[test]
    fn test_key_points_cap() {
        let body = (1..=8).map(|i| format!("- item {i}\n")).collect::<String>();
        let points = extract_key_points(&body);
        assert_eq!(points.len(), MAX_KEY_POINTS);
        assert_eq!(points[4], "item 5");
    }

    #[test]
    fn test_key_points_ignore_inline_hyphens() {
        let body = "Call 555-123-4567 tomorrow";
        assert!(extract_key_points(body).is_empty());
    }

    #[test]
    fn test_key_points_indicator_sentences_in_order() {
        let body = "- Kickoff\nIt is important to arrive early. Short note. Deadline moved to May";
        assert_eq!(
            extract_key_points(body),
            vec!["Kickoff", "It is important to arrive early", "Deadline moved to May"]
        );
    }

    #[test]
    fn test_key_points_short_indicator_sentence_dropped() {
        assert!(extract_key_points("Please. Thanks.").is_empty());
    }

    #[test]
    fn test_list_line_not_repeated_as_sentence() {
        let points = extract_key_points("- Please sign the form\n");
        assert_eq!(points, vec!["Please sign the form"]);
    }

    #[test]
    fn test_action_items() {
        let body = "Hi team. Action required: sign the NDA. Could you book a room? To do: order lunch.";
        assert_eq!(
            extract_action_items(body),
            vec!["sign the NDA", "book a room", "order lunch"]
        );
    }

    #[test]
    fn test_action_items_cap_and_order() {
        let body = "You must pay. You should call. Please reply. Need to file it.";
        assert_eq!(extract_action_items(body), vec!["pay", "call", "reply"]);
    }

    #[test]
    fn test_action_item_ends_at_line_end() {
        let body = "please check the logs\nthanks";
        assert_eq!(extract_action_items(body), vec!["check the logs"]);
    }

    #[test]
    fn test_priority_indicators() {
        assert_eq!(priority_indicators("Reminder", "due date soon"), vec!["medium", "deadline"]);
        assert_eq!(priority_indicators("High priority", ""), vec!["high"]);
    }

    #[test]
    fn test_attachment_summary_single() {
        let files = [Attachment::new("scan.png", 0, "")];
        assert_eq!(attachment_summary(&files), "1 attachment (png) - 0.0 MB total");
    }

    #[test]
    fn test_attachment_summary_huge_sizes_saturate() {
        let files = [
            Attachment::new("a.bin", u64::MAX, ""),
            Attachment::new("b.bin", u64::MAX, ""),
        ];
        assert_eq!(
            attachment_summary(&files),
            "2 attachments (bin) - 17592186044416.0 MB total"
        );
    }
}
