//! Property mappings and the `.properties` text format
//!
//! [`Properties`] is an insertion-ordered `String -> String` map. It can be
//! read from and written to the classic line-oriented `.properties` format:
//!
//! ```text
//! # comment
//! db.host = localhost
//! db.url : jdbc:postgresql://${db.host}/app
//! greeting Hello \
//!          World
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, SourceLocation};

/// An ordered mapping of property keys to raw (possibly unresolved) values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: IndexMap<String, String>,
}

impl Properties {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment
    pub fn from_env() -> Self {
        std::env::vars().collect()
    }

    /// Get the value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert a value, returning the previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `.properties` text.
    ///
    /// Later definitions of a key override earlier ones.
    pub fn parse(text: &str) -> Result<Self> {
        let mut props = Self::new();
        for (line_no, line) in logical_lines(text) {
            let (key, value) = split_key_value(&line);
            let key = unescape(key).map_err(|e| at_line(e, line_no))?;
            let value = unescape(value).map_err(|e| at_line(e, line_no))?;
            props.insert(key, value);
        }
        Ok(props)
    }

    /// Render as `.properties` text, one `key=value` per line.
    ///
    /// No header or timestamp is written. With `sort`, entries are ordered
    /// by key; otherwise insertion order is kept.
    pub fn to_properties_string(&self, sort: bool) -> String {
        let mut entries: Vec<(&str, &str)> = self.iter().collect();
        if sort {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }

        let mut out = String::new();
        for (key, value) in entries {
            out.push_str(&escape(key, true));
            out.push('=');
            out.push_str(&escape(value, false));
            out.push('\n');
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        props.extend(iter);
        props
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Properties {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn at_line(err: Error, line: usize) -> Error {
    err.with_source_location(SourceLocation {
        file: "<properties>".into(),
        line: Some(line),
        column: None,
    })
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Join continuation lines and drop comments and blank lines.
///
/// Yields each logical line with the 1-based number of its first physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut result = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = raw.trim_start_matches(is_blank);

        let (start, mut buf) = match current.take() {
            Some(pending) => pending,
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                (idx + 1, String::new())
            }
        };

        let trailing = trimmed.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            buf.push_str(&trimmed[..trimmed.len() - 1]);
            current = Some((start, buf));
        } else {
            buf.push_str(trimmed);
            result.push((start, buf));
        }
    }

    // A continuation on the last line just ends the entry
    if let Some(pending) = current {
        result.push(pending);
    }

    result
}

/// Split a logical line at the first unescaped separator.
///
/// The separator is `=`, `:` or whitespace; whitespace around it is ignored.
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    let mut has_separator_char = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                has_separator_char = true;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = &line[key_end..];
    if has_separator_char {
        rest = &rest[1..];
    } else {
        rest = rest.trim_start_matches(is_blank);
        if let Some(stripped) = rest.strip_prefix(&['=', ':'][..]) {
            rest = stripped;
        }
    }

    (key, rest.trim_start_matches(is_blank))
}

/// Read four hex digits as one UTF-16 code unit
fn read_code_unit(chars: &mut std::str::Chars<'_>) -> Result<u16> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 {
        return Err(malformed_unicode(&hex));
    }
    u16::from_str_radix(&hex, 16).map_err(|_| malformed_unicode(&hex))
}

fn malformed_unicode(hex: &str) -> Error {
    Error::parse(format!("Malformed \\uxxxx encoding: \\u{}", hex))
}

/// Decode the escape after `\u`, joining a surrogate pair written as two escapes
fn unescape_unicode(chars: &mut std::str::Chars<'_>) -> Result<char> {
    let high = read_code_unit(chars)?;
    let mut units = vec![high];

    if (0xD800..=0xDBFF).contains(&high) {
        let mut lookahead = chars.clone();
        if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
            units.push(read_code_unit(&mut lookahead)?);
            *chars = lookahead;
        }
    }

    match char::decode_utf16(units.iter().copied()).next() {
        Some(Ok(ch)) if units.len() == 1 || ch.len_utf16() == 2 => Ok(ch),
        _ => Err(Error::parse(format!(
            "Unpaired surrogate in \\u escape: {}",
            units
                .iter()
                .map(|u| format!("\\u{:04X}", u))
                .collect::<String>()
        ))),
    }
}

fn unescape(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => out.push(unescape_unicode(&mut chars)?),
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn escape(input: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(input.len());

    for (i, c) in input.chars().enumerate() {
        match c {
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_separators() {
        let props = Properties::parse("a=1\nb: 2\nc 3\nd   =   4\n").unwrap();

        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
        assert_eq!(props.get("d"), Some("4"));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let text = "# comment\n! also comment\n\n   \nkey=value\n";
        let props = Properties::parse(text).unwrap();

        assert_eq!(props.len(), 1);
        assert_eq!(props.get("key"), Some("value"));
    }

    #[test]
    fn test_parse_keeps_placeholders_raw() {
        let props = Properties::parse("url=jdbc:postgresql://${db.host}/app").unwrap();
        assert_eq!(props.get("url"), Some("jdbc:postgresql://${db.host}/app"));
    }

    #[test]
    fn test_parse_line_continuation() {
        let text = "greeting = Hello \\\n           World\nnext=1";
        let props = Properties::parse(text).unwrap();

        assert_eq!(props.get("greeting"), Some("Hello World"));
        assert_eq!(props.get("next"), Some("1"));
    }

    #[test]
    fn test_parse_escaped_backslash_is_not_continuation() {
        let props = Properties::parse("path=C:\\\\dir\\\\\nother=x").unwrap();

        assert_eq!(props.get("path"), Some("C:\\dir\\"));
        assert_eq!(props.get("other"), Some("x"));
    }

    #[test]
    fn test_parse_escapes() {
        let props = Properties::parse("my\\ key=tab\\there\\u0041\nk\\=x=v").unwrap();

        assert_eq!(props.get("my key"), Some("tab\thereA"));
        assert_eq!(props.get("k=x"), Some("v"));
    }

    #[test]
    fn test_parse_key_without_value() {
        let props = Properties::parse("empty\nempty2=").unwrap();

        assert_eq!(props.get("empty"), Some(""));
        assert_eq!(props.get("empty2"), Some(""));
    }

    #[test]
    fn test_parse_later_definition_wins() {
        let props = Properties::parse("a=1\nb=2\na=3").unwrap();

        assert_eq!(props.get("a"), Some("3"));
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_malformed_unicode_escape() {
        let err = Properties::parse("ok=1\nbad=\\u12G4").unwrap_err();

        assert_eq!(err.kind, crate::error::ErrorKind::Parse);
        assert_eq!(err.source_location.unwrap().line, Some(2));
    }

    #[test]
    fn test_parse_surrogate_pair_escape() {
        let props = Properties::parse("smile=\\uD83D\\uDE00\nmixed=a\\u00e9\\uD834\\uDD1Eb").unwrap();

        assert_eq!(props.get("smile"), Some("\u{1F600}"));
        assert_eq!(props.get("mixed"), Some("a\u{e9}\u{1D11E}b"));
    }

    #[test]
    fn test_parse_unpaired_surrogate_is_rejected() {
        for text in ["lone=\\uD83D", "low=\\uDE00", "wrong=\\uD83D\\u0041", "tail=\\uD83Dx"] {
            let err = Properties::parse(text).unwrap_err();
            assert_eq!(err.kind, crate::error::ErrorKind::Parse, "{}", text);
        }
    }

    #[test]
    fn test_to_string_preserves_insertion_order() {
        let props: Properties = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(props.to_properties_string(false), "b=2\na=1\n");
    }

    #[test]
    fn test_to_string_sorted() {
        let props: Properties = [("b", "2"), ("c", "3"), ("a", "1")].into_iter().collect();
        assert_eq!(props.to_properties_string(true), "a=1\nb=2\nc=3\n");
    }

    #[test]
    fn test_written_text_reads_back() {
        let props: Properties = [
            ("my key", " leading space"),
            ("url", "http://host:80/a=b#frag"),
            ("multi", "line1\nline2\\end"),
        ]
        .into_iter()
        .collect();

        let text = props.to_properties_string(false);
        assert_eq!(Properties::parse(&text).unwrap(), props);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut props: Properties = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        props.remove("b");
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let props: Properties = [("a", "1")].into_iter().collect();
        assert_eq!(serde_json::to_string(&props).unwrap(), r#"{"a":"1"}"#);
    }
}
