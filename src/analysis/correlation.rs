//! Subject/body/attachment correlation scoring.
//!
//! The score is a coarse bag-of-words overlap measure:
//!
//! - subject vs. body: `|S ∩ B| / max(|S|, |B|)` when both are non-empty
//! - each attachment name vs. subject: `|A ∩ S| / |S| * 0.5`, summed
//!
//! The raw sum is clamped to `1.0`. Several attachments each contribute up to
//! half a point, so the pre-clamp total is unbounded and saturates quickly.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::message::Attachment;

/// Weight applied to each attachment-name overlap term.
pub const ATTACHMENT_WEIGHT: f64 = 0.5;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// Lower-cases `text` and returns its set of Unicode word tokens.
pub fn word_set(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Scores how strongly subject, body and attachment names relate, in `[0, 1]`.
///
/// Tokens are compared literally: no stemming, so `meet` and `meeting` do not
/// overlap.
///
/// # Example
///
/// ```
/// use mailsift::analysis::correlation_score;
/// use mailsift::message::Attachment;
///
/// assert_eq!(correlation_score("Meeting", "Let's meet", &[]), 0.0);
///
/// let report = [Attachment::new("report.pdf", 1024, "application/pdf")];
/// let score = correlation_score("Quarterly report", "See report", &report);
/// assert!((score - 0.75).abs() < 1e-9);
/// ```
pub fn correlation_score(subject: &str, body: &str, attachments: &[Attachment]) -> f64 {
    let subject_words = word_set(subject);
    let body_words = word_set(body);

    let mut score = 0.0;

    if !subject_words.is_empty() && !body_words.is_empty() {
        let shared = subject_words.intersection(&body_words).count();
        let larger = subject_words.len().max(body_words.len());
        score += shared as f64 / larger as f64;
    }

    if !subject_words.is_empty() {
        for attachment in attachments {
            let name_words = word_set(&attachment.filename);
            if name_words.is_empty() {
                continue;
            }
            let shared = name_words.intersection(&subject_words).count();
            score += shared as f64 / subject_words.len() as f64 * ATTACHMENT_WEIGHT;
        }
    }

    score.min(1.0)
}
