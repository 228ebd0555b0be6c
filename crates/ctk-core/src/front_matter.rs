//! # Front-Matter Parsing
//!
//! Markdown manifests (`SKILL.md`) carry their structured payload in a
//! leading block delimited by two `---` lines. Parsing is two-phase:
//!
//! 1. [`split`]: lexical split on the delimiter lines. The first line of
//!    the file must be `---`; the block ends at the next line that is
//!    exactly `---`.
//! 2. [`parse_block`]: strict flat `key: value` grammar. Blank lines and
//!    `#` comments are skipped. Indented lines (nesting), lines without a
//!    colon, invalid keys, and duplicate keys are errors.
//!
//! There is no best-effort recovery. Anything ambiguous is a
//! [`FrontMatterError`] and surfaces as an `invalid-front-matter` finding.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// The delimiter line.
pub const DELIMITER: &str = "---";

/// Errors from front-matter parsing. Line numbers are 1-based and refer to
/// the whole file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    /// The file does not start with a `---` line.
    #[error("document does not start with a '---' front-matter delimiter")]
    MissingOpeningDelimiter,

    /// No closing `---` line follows the opening delimiter.
    #[error("front-matter opened on line 1 is never closed by a '---' line")]
    MissingClosingDelimiter,

    /// A line inside the block is not a flat `key: value` pair.
    #[error("line {line}: expected 'key: value', found \"{content}\"")]
    MalformedLine {
        /// Line number in the file.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// An indented line, which would imply nesting.
    #[error("line {line}: nested values are not supported in front-matter")]
    NestedValue {
        /// Line number in the file.
        line: usize,
    },

    /// A key was declared twice.
    #[error("line {line}: duplicate key \"{key}\"")]
    DuplicateKey {
        /// Line number of the second declaration.
        line: usize,
        /// The repeated key.
        key: String,
    },
}

/// A parsed front-matter block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrontMatter {
    /// Flat key/value pairs, key-ordered.
    pub fields: BTreeMap<String, String>,
}

impl FrontMatter {
    /// The fields as a JSON object of strings, for schema evaluation.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

/// The raw result of the lexical phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    /// Lines between the delimiters, each with its 1-based file line number.
    pub lines: Vec<(usize, &'a str)>,
}

/// Phase one: find the delimited block at the head of `content`.
///
/// Scanning stops at the closing delimiter, so `content` only needs to
/// hold the head of the file.
pub fn split(content: &str) -> Result<RawBlock<'_>, FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut lines = Vec::new();
    let mut opened = false;

    for (index, raw) in content.split_inclusive('\n').enumerate() {
        let line = raw.trim_end_matches(|c: char| c == '\n' || c == '\r');

        if !opened {
            if line.trim_end() != DELIMITER {
                return Err(FrontMatterError::MissingOpeningDelimiter);
            }
            opened = true;
            continue;
        }

        if line.trim_end() == DELIMITER {
            return Ok(RawBlock { lines });
        }
        lines.push((index + 1, line));
    }

    if opened {
        Err(FrontMatterError::MissingClosingDelimiter)
    } else {
        Err(FrontMatterError::MissingOpeningDelimiter)
    }
}

/// Phase two: parse the block lines with the flat `key: value` grammar.
pub fn parse_block(lines: &[(usize, &str)]) -> Result<BTreeMap<String, String>, FrontMatterError> {
    let mut fields = BTreeMap::new();

    for &(line_no, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if line.starts_with(|c: char| c == ' ' || c == '\t') {
            return Err(FrontMatterError::NestedValue { line: line_no });
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(FrontMatterError::MalformedLine {
                line: line_no,
                content: line.to_string(),
            });
        };

        let key = key.trim_end();
        if !is_valid_key(key) {
            return Err(FrontMatterError::MalformedLine {
                line: line_no,
                content: line.to_string(),
            });
        }

        let value = unquote(value.trim());
        if fields.insert(key.to_string(), value).is_some() {
            return Err(FrontMatterError::DuplicateKey {
                line: line_no,
                key: key.to_string(),
            });
        }
    }

    Ok(fields)
}

/// Parse a whole markdown document's front-matter.
pub fn parse(content: &str) -> Result<FrontMatter, FrontMatterError> {
    let raw = split(content)?;
    let fields = parse_block(&raw.lines)?;
    Ok(FrontMatter { fields })
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "---\nname: code-review\ndescription: \"Review a diff: carefully\"\n---\n\n# Code Review\n";

    #[test]
    fn parses_flat_block() {
        let fm = parse(VALID).unwrap();
        assert_eq!(fm.fields["name"], "code-review");
        assert_eq!(fm.fields["description"], "Review a diff: carefully");
    }

    #[test]
    fn to_value_produces_string_object() {
        let fm = parse(VALID).unwrap();
        let value = fm.to_value();
        assert_eq!(value["name"], "code-review");
        assert!(value.as_object().unwrap().len() == 2);
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let fm = parse("---\n# comment\n\nname: x\n---\n").unwrap();
        assert_eq!(fm.fields.len(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let fm = parse("---\r\nname: x\r\n---\r\nbody\r\n").unwrap();
        assert_eq!(fm.fields["name"], "x");
    }

    #[test]
    fn empty_block_is_valid() {
        let fm = parse("---\n---\nbody").unwrap();
        assert!(fm.fields.is_empty());
    }

    #[test]
    fn head_of_file_is_enough() {
        let head = "---\nname: x\n---\n# Tit";
        assert_eq!(parse(head).unwrap().fields.len(), 1);
    }

    #[test]
    fn missing_opening_delimiter() {
        assert_eq!(
            parse("# Title\n---\nname: x\n---\n"),
            Err(FrontMatterError::MissingOpeningDelimiter)
        );
        assert_eq!(parse(""), Err(FrontMatterError::MissingOpeningDelimiter));
    }

    #[test]
    fn missing_closing_delimiter() {
        assert_eq!(
            parse("---\nname: x\n# Title\n"),
            Err(FrontMatterError::MissingClosingDelimiter)
        );
    }

    #[test]
    fn nested_value_is_rejected() {
        let err = parse("---\nmetadata:\n  owner: me\n---\n").unwrap_err();
        assert_eq!(err, FrontMatterError::NestedValue { line: 3 });
    }

    #[test]
    fn line_without_colon_is_rejected() {
        let err = parse("---\nname x\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn invalid_key_is_rejected() {
        let err = parse("---\nmy key: x\n---\n").unwrap_err();
        assert!(matches!(err, FrontMatterError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let err = parse("---\nname: a\nname: b\n---\n").unwrap_err();
        assert_eq!(
            err,
            FrontMatterError::DuplicateKey {
                line: 3,
                key: "name".to_string()
            }
        );
    }

    #[test]
    fn split_reports_file_line_numbers() {
        let raw = split("---\na: 1\nb: 2\n---\n").unwrap();
        assert_eq!(raw.lines, vec![(2, "a: 1"), (3, "b: 2")]);
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        fn flat_fields() -> impl Strategy<Value = BTreeMap<String, String>> {
            proptest::collection::btree_map("[a-z][a-z0-9_-]{0,12}", "[A-Za-z0-9 .,]{0,30}", 0..8)
        }

        proptest! {
            /// The parser never panics, whatever the input.
            #[test]
            fn parse_never_panics(content in ".{0,200}") {
                let _ = parse(&content);
            }

            /// Any flat mapping rendered as front-matter parses back to itself.
            #[test]
            fn rendered_fields_parse_back(fields in flat_fields(), body in "[a-z \n]{0,40}") {
                let mut doc = String::from("---\n");
                for (key, value) in &fields {
                    doc.push_str(&format!("{key}: {value}\n"));
                }
                doc.push_str("---\n");
                doc.push_str(&body);

                let parsed = parse(&doc).unwrap();
                let trimmed: BTreeMap<String, String> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.trim().to_string()))
                    .collect();
                prop_assert_eq!(parsed.fields, trimmed);
            }
        }
    }
}
