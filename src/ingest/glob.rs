//! Path patterns used by routing rules.
//!
//! A pattern containing `*`, `?` or `[` is a glob, compiled to an anchored
//! regex over the whole normalized path:
//!
//! | Glob | Matches |
//! |------|---------|
//! | `*` | any run of characters except `/` |
//! | `**` | any run of characters, `/` included |
//! | `?` | one character except `/` |
//! | `[abc]`, `[!abc]` | one character in / not in the set |
//!
//! Any other pattern is a literal and matches when the path contains it.

use regex::Regex;

use crate::error::{MailsiftError, Result};

/// Converts backslashes to `/`, drops `./` segments and repeated slashes.
///
/// ```
/// use mailsift::ingest::normalize_path;
///
/// assert_eq!(normalize_path(r".\data\\in/a.csv"), "data/in/a.csv");
/// ```
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let parts: Vec<&str> = unified
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect();
    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

/// A compiled include/exclude pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Glob(Regex),
    Literal(String),
}

impl PathPattern {
    /// Compiles a glob or literal pattern.
    pub fn compile(pattern: &str) -> Result<Self> {
        let matcher = if is_glob(pattern) {
            let translated = glob_to_regex(&normalize_path(pattern));
            let regex =
                Regex::new(&translated).map_err(|e| MailsiftError::invalid_pattern(pattern, e))?;
            Matcher::Glob(regex)
        } else {
            Matcher::Literal(normalize_path(pattern))
        };
        Ok(Self {
            source: pattern.to_string(),
            matcher,
        })
    }

    /// Tests an already-normalized path.
    pub fn matches(&self, normalized_path: &str) -> bool {
        match &self.matcher {
            Matcher::Glob(re) => re.is_match(normalized_path),
            Matcher::Literal(lit) => normalized_path.contains(lit.as_str()),
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if this is a glob rather than a literal.
    pub fn is_glob(&self) -> bool {
        matches!(self.matcher, Matcher::Glob(_))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        out.push_str("(?:.*/)?");
                    } else {
                        out.push_str(".*");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut look = chars.clone();
                let mut class = String::new();
                let mut closed = false;
                for n in look.by_ref() {
                    if n == ']' && !class.is_empty() {
                        closed = true;
                        break;
                    }
                    class.push(n);
                }
                if closed {
                    chars = look;
                    out.push('[');
                    let body = match class.strip_prefix('!') {
                        Some(rest) => {
                            out.push('^');
                            rest
                        }
                        None => class.as_str(),
                    };
                    for ch in body.chars() {
                        if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(ch);
                    }
                    out.push(']');
                } else {
                    out.push_str(r"\[");
                }
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PathPattern::compile(pattern)
            .unwrap()
            .matches(&normalize_path(path))
    }

    #[test]
    fn test_star_stays_in_segment() {
        assert!(matches("data/*.csv", "data/a.csv"));
        assert!(matches("data/*.csv", "./data/a.csv"));
        assert!(!matches("data/*.csv", "data/sub/a.csv"));
        assert!(!matches("data/*.csv", "data/a.xlsx"));
        assert!(!matches("data/*.csv", "other/data/a.csv"));
    }

    #[test]
    fn test_double_star() {
        assert!(matches("data/**/*.csv", "data/a.csv"));
        assert!(matches("data/**/*.csv", "data/x/y/a.csv"));
        assert!(matches("**/Change files/*", "input/Change files/AON.xls"));
    }

    #[test]
    fn test_question_and_class() {
        assert!(matches("group ?.csv", "group 1.csv"));
        assert!(!matches("group ?.csv", "group 12.csv"));
        assert!(matches("file[0-9].csv", "file7.csv"));
        assert!(!matches("file[!0-9].csv", "file7.csv"));
        assert!(matches("file[!0-9].csv", "fileA.csv"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(matches("data/(v1)+*.csv", "data/(v1)+x.csv"));
        assert!(!matches("data/a.csv*", "data/abcsv"));
    }

    #[test]
    fn test_unclosed_class_is_literal() {
        assert!(matches("data/[x*", "data/[x1"));
    }

    #[test]
    fn test_literal_pattern_is_substring() {
        let p = PathPattern::compile("Batchload files").unwrap();
        assert!(!p.is_glob());
        assert!(p.matches("examples/Batchload files/Group 1.xls"));
        assert!(!p.matches("examples/Change files/AON.xls"));
    }

    #[test]
    fn test_windows_separators() {
        assert!(matches(r"data\*.csv", r"data\a.csv"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/abs//x/./y"), "/abs/x/y");
        assert_eq!(normalize_path("a/b/"), "a/b");
    }
}
