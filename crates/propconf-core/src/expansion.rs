//! Incremental placeholder scanning over a single raw value
//!
//! [`ExpansionBuffer`] finds the leftmost, shortest `${...}` placeholder,
//! moves the text in front of it into the resolved output, and lets the
//! caller splice in whatever the placeholder resolved to. Braces do not
//! nest: a key never contains `}` or `${`, so in `${a${b}}` the first
//! placeholder is `${b}` and `${a` stays literal text.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// `${`, then a key without `}` or `${`, then the first `}`
const PLACEHOLDER_PATTERN: &str = r"\$\{((?:[^$}]|\$+[^{}$])*\$*)\}";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is valid"))
}

/// Check if a string contains at least one `${...}` placeholder
pub fn contains_placeholder(input: &str) -> bool {
    placeholder_pattern().is_match(input)
}

/// Split state of a raw value being expanded
pub struct ExpansionBuffer {
    resolved: String,
    unresolved: String,
    fully_resolved: bool,
}

impl ExpansionBuffer {
    /// Start expanding `raw`
    ///
    /// A value without placeholders is complete immediately.
    pub fn new(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or_default();
        if contains_placeholder(raw) {
            Self {
                resolved: String::with_capacity(raw.len()),
                unresolved: raw.to_string(),
                fully_resolved: false,
            }
        } else {
            Self {
                resolved: raw.to_string(),
                unresolved: String::new(),
                fully_resolved: true,
            }
        }
    }

    /// Key of the next placeholder in the unscanned text.
    ///
    /// Returns `None` once no placeholder remains, after moving the rest of
    /// the unscanned text into the resolved output.
    pub fn extract_next_key(&mut self) -> Option<String> {
        match placeholder_pattern().captures(&self.unresolved) {
            Some(caps) => caps.get(1).map(|m| m.as_str().to_string()),
            None => {
                self.resolved.push_str(&self.unresolved);
                self.unresolved.clear();
                self.fully_resolved = true;
                None
            }
        }
    }

    /// Consume the placeholder found by [`extract_next_key`](Self::extract_next_key).
    ///
    /// Text in front of `${` goes to the output; the placeholder itself is
    /// dropped so the caller can append its replacement.
    pub fn advance_past_placeholder(&mut self) {
        let Some(found) = placeholder_pattern().find(&self.unresolved) else {
            return;
        };
        let (start, end) = (found.start(), found.end());
        self.resolved.push_str(&self.unresolved[..start]);
        self.unresolved.drain(..end);
    }

    /// Append replacement text to the resolved output
    pub fn append_resolved(&mut self, text: &str) {
        self.resolved.push_str(text);
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.fully_resolved
    }

    /// The expanded value; only available once scanning has finished
    pub fn fully_resolved(&self) -> Result<&str> {
        if !self.fully_resolved {
            return Err(Error::internal("Property value is not fully resolved yet"));
        }
        Ok(&self.resolved)
    }
}

impl fmt::Debug for ExpansionBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpansionBuffer")
            .field("fully_resolved", &self.fully_resolved)
            .field("resolved", &self.resolved)
            .field("unresolved", &self.unresolved)
            .finish()
    }
}
