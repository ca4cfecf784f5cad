//! Key-value property sets and their load format.

use std::{collections::HashMap, io::Read};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// String-to-string property map.
///
/// Insertion order is irrelevant and duplicate keys overwrite. The load
/// format follows the conventional properties file grammar: `#`/`!`
/// comments, `=`/`:`/whitespace key terminators, backslash escapes
/// (including `\uXXXX`), and backslash line continuations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse properties from a byte stream, consuming it whole. Invalid
    /// UTF-8 decodes lossily before parsing.
    pub fn load(reader: &mut dyn Read) -> Result<Self> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        Self::parse(&String::from_utf8_lossy(&raw))
    }

    /// Parse properties from text.
    pub fn parse(input: &str) -> Result<Self> {
        let lines: Vec<&str> = input.lines().collect();
        let mut entries = HashMap::new();
        let mut index = 0;

        while index < lines.len() {
            let line_no = index + 1;
            let mut line = lines[index].trim_start().to_string();
            index += 1;

            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            // A trailing odd run of backslashes joins the next physical line,
            // with its leading whitespace dropped.
            while ends_with_continuation(&line) {
                line.pop();
                let Some(next) = lines.get(index) else {
                    break;
                };
                index += 1;
                line.push_str(next.trim_start());
            }

            let (key, value) = split_key_value(&line);
            entries.insert(unescape(key, line_no)?, unescape(value, line_no)?);
        }

        Ok(Self { entries })
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert a pair, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the stored pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Consume the set into its underlying map.
    pub fn into_map(self) -> HashMap<String, String> {
        self.entries
    }
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|&ch| ch == '\\').count();
    trailing % 2 == 1
}

/// Split a logical line at the first unescaped `=`, `:`, or whitespace.
/// The separator may be padded with whitespace; a missing value is empty.
fn split_key_value(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut key_end = bytes.len();
    let mut found_separator = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'=' | b':' => {
                key_end = i;
                found_separator = true;
                break;
            }
            b' ' | b'\t' | b'\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
        i += 1;
    }

    if key_end == bytes.len() {
        return (line, "");
    }

    let key = &line[..key_end];
    let mut rest = key_end;
    if found_separator {
        rest += 1;
    } else {
        // Key ended on whitespace; an `=` or `:` may still follow it.
        while rest < bytes.len() && matches!(bytes[rest], b' ' | b'\t' | b'\x0c') {
            rest += 1;
        }
        if rest < bytes.len() && matches!(bytes[rest], b'=' | b':') {
            rest += 1;
        }
    }
    while rest < bytes.len() && matches!(bytes[rest], b' ' | b'\t' | b'\x0c') {
        rest += 1;
    }
    (key, &line[rest..])
}

fn unescape(input: &str, line_no: usize) -> Result<String> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('t') => output.push('\t'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('f') => output.push('\x0c'),
            Some('u') => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = chars
                        .next()
                        .and_then(|hex| hex.to_digit(16))
                        .ok_or_else(|| Error::Properties {
                            line: line_no,
                            reason: "truncated \\u escape".to_string(),
                        })?;
                    code = code * 16 + digit;
                }
                let decoded = char::from_u32(code).ok_or_else(|| Error::Properties {
                    line: line_no,
                    reason: format!("\\u{code:04x} is not a scalar value"),
                })?;
                output.push(decoded);
            }
            // An unknown escaped character is taken literally.
            Some(other) => output.push(other),
            // A dangling backslash has already been handled as a
            // continuation; drop it.
            None => {}
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn parses_simple_pairs() -> Result<()> {
        let props = Properties::parse("a=1\nb=2\n")?;
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), None);
        Ok(())
    }

    #[test]
    fn skips_comments_and_blank_lines() -> Result<()> {
        let props = Properties::parse("# comment\n\n! also a comment\nkey=value\n")?;
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("key"), Some("value"));
        Ok(())
    }

    #[test]
    fn accepts_alternate_separators() -> Result<()> {
        let props = Properties::parse("colon:value\npadded = spaced\nbare value\nlonely\n")?;
        assert_eq!(props.get("colon"), Some("value"));
        assert_eq!(props.get("padded"), Some("spaced"));
        assert_eq!(props.get("bare"), Some("value"));
        assert_eq!(props.get("lonely"), Some(""));
        Ok(())
    }

    #[test]
    fn duplicate_keys_overwrite() -> Result<()> {
        let props = Properties::parse("key=first\nkey=second\n")?;
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("key"), Some("second"));
        Ok(())
    }

    #[test]
    fn joins_continuation_lines() -> Result<()> {
        let props = Properties::parse("fruits=apple,\\\n    banana,\\\n    pear\n")?;
        assert_eq!(props.get("fruits"), Some("apple,banana,pear"));

        // An even run of backslashes is a literal backslash, not a join.
        let props = Properties::parse("path=C:\\\\\nnext=value\n")?;
        assert_eq!(props.get("path"), Some("C:\\"));
        assert_eq!(props.get("next"), Some("value"));
        Ok(())
    }

    #[test]
    fn decodes_escapes() -> Result<()> {
        let props = Properties::parse("tabbed=a\\tb\nunicode=\\u00e9\\u0142\nspaced\\ key=ok\n")?;
        assert_eq!(props.get("tabbed"), Some("a\tb"));
        assert_eq!(props.get("unicode"), Some("éł"));
        assert_eq!(props.get("spaced key"), Some("ok"));
        Ok(())
    }

    #[test]
    fn rejects_malformed_unicode_escapes() {
        let err = Properties::parse("bad=\\u12\n").expect_err("truncated escape");
        assert!(matches!(err, Error::Properties { line: 1, .. }));
    }

    #[test]
    fn loads_from_a_stream() -> Result<()> {
        let mut stream: &[u8] = b"a=1\nb=2\n";
        let props = Properties::load(&mut stream)?;
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        Ok(())
    }

    #[test]
    fn serializes_as_a_plain_map() -> Result<()> {
        let props = Properties::parse("a=1\n")?;
        let json = serde_json::to_value(&props)?;
        assert_eq!(json, serde_json::json!({"a": "1"}));
        let back: Properties = serde_json::from_value(json)?;
        assert_eq!(back, props);
        Ok(())
    }
}
