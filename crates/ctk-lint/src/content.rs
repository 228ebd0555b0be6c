//! # Content Rules
//!
//! Checks on the text of individual files: credential-like values,
//! `requirements.txt` and `.env.example` formats, authoring guidance for
//! skill documents and the per-kind content checks of the kind table.
//!
//! Each function takes the entry name, the file's relative path and its
//! text, and returns findings. Nothing here touches the filesystem.

use std::sync::OnceLock;

use ctk_core::{ContentCheck, Finding, Guidance, RuleId};
use regex::{Regex, RegexBuilder};

/// Credential-like assignments, labelled by what they look like.
fn credential_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                "API key",
                r#"api[_-]?key["']?\s*[:=]\s*["']?[a-zA-Z0-9]{20,}"#,
            ),
            ("password", r#"password["']?\s*[:=]\s*["']?[^"'\s]{8,}"#),
            ("token", r#"token["']?\s*[:=]\s*["']?[a-zA-Z0-9]{20,}"#),
            ("secret", r#"secret["']?\s*[:=]\s*["']?[a-zA-Z0-9]{20,}"#),
        ]
        .into_iter()
        .map(|(label, pattern)| (label, case_insensitive(pattern)))
        .collect()
    })
}

/// A quoted literal assigned to a credential-named variable in source code.
fn hardcoded_assignment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        case_insensitive(r#"(api[_-]?key|password|token|secret)\s*=\s*["'][^"']+["']"#)
    })
}

/// A long quoted alphanumeric literal, the usual shape of a pasted key.
fn long_literal() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r#"["'][a-zA-Z0-9]{32,}["']"#))
}

/// Values in `.env.example` that look like real keys instead of
/// placeholders.
fn key_like_values() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("hex key", r"[a-f0-9]{32,}"),
            ("OpenAI-style key", r"sk-[a-zA-Z0-9]{20,}"),
            ("GitHub token", r"ghp_[a-zA-Z0-9]{36}"),
        ]
        .into_iter()
        .map(|(label, pattern)| (label, compile(pattern)))
        .collect()
    })
}

fn requirement_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| compile(r"^[a-zA-Z0-9_-]+([<>=!]=?[0-9.]+)?$"))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("content rule patterns are valid")
}

fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("content rule patterns are valid")
}

/// Whether a file is source code, where quoted credential assignments are
/// checked in addition to the general patterns.
fn is_source_file(relative: &str) -> bool {
    [".py", ".js", ".ts", ".mjs", ".cjs"]
        .iter()
        .any(|ext| relative.ends_with(ext))
}

/// `sensitive-data` findings for credential-like values in a text file.
/// Matches of the credential patterns are errors; in source files a bare
/// long quoted literal is a warning. At most one finding per line.
pub fn sensitive_data(entry: &str, relative: &str, text: &str) -> Vec<Finding> {
    let source = is_source_file(relative);
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let number = index + 1;
            let label = credential_patterns()
                .iter()
                .find(|(_, re)| re.is_match(line))
                .map(|(label, _)| *label)
                .or_else(|| {
                    (source && hardcoded_assignment().is_match(line)).then_some("credential")
                });
            match label {
                Some(label) => Some(Finding::error(
                    entry,
                    RuleId::SensitiveData,
                    format!("{relative}:{number}: possible hardcoded {label}"),
                )),
                None if source && long_literal().is_match(line) => Some(Finding::warning(
                    entry,
                    RuleId::SensitiveData,
                    format!("{relative}:{number}: possible credential literal"),
                )),
                None => None,
            }
        })
        .collect()
}

/// Checks on `.env.example`: every assignment line needs `=`, and values
/// must be placeholders rather than real keys.
pub fn env_example(entry: &str, relative: &str, text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let number = index + 1;
        if !line.contains('=') {
            findings.push(Finding::warning(
                entry,
                RuleId::EnvExampleFormat,
                format!("{relative}:{number}: line has no '=': {line}"),
            ));
        }
        if let Some((label, _)) = key_like_values().iter().find(|(_, re)| re.is_match(line)) {
            findings.push(Finding::error(
                entry,
                RuleId::SensitiveData,
                format!("{relative}:{number}: value looks like a real {label}; use a placeholder"),
            ));
        }
    }
    findings
}

/// Checks on `requirements.txt`: unusual line formats, and the declared
/// dependency every entry of this kind needs.
pub fn requirements(
    entry: &str,
    relative: &str,
    text: &str,
    required_dependency: Option<&str>,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut declared = false;
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(dependency) = required_dependency {
            declared |= package_name(line).eq_ignore_ascii_case(dependency);
        }
        if !requirement_line().is_match(line) {
            findings.push(Finding::warning(
                entry,
                RuleId::RequirementsFormat,
                format!("{relative}:{}: unusual requirement format: {line}", index + 1),
            ));
        }
    }
    if let Some(dependency) = required_dependency {
        if !declared {
            findings.push(Finding::warning(
                entry,
                RuleId::RequirementsFormat,
                format!("{relative} does not declare the '{dependency}' package"),
            ));
        }
    }
    findings
}

/// Leading distribution name of a requirement line (`mcp[cli]>=1.0` →
/// `mcp`).
fn package_name(line: &str) -> &str {
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(line.len());
    &line[..end]
}

/// `content-guidance` info findings for a markdown document.
pub fn guidance(entry: &str, guidance: &Guidance, text: &str) -> Vec<Finding> {
    let lower = text.to_lowercase();
    let mut findings: Vec<Finding> = guidance
        .sections
        .iter()
        .filter(|section| !lower.contains(&section.to_lowercase()))
        .map(|section| {
            Finding::info(
                entry,
                RuleId::ContentGuidance,
                format!("{} has no '{section}' section", guidance.file),
            )
        })
        .collect();
    if let Some(min) = guidance.min_chars {
        let chars = text.chars().count();
        if chars < min {
            findings.push(Finding::info(
                entry,
                RuleId::ContentGuidance,
                format!(
                    "{} is short ({chars} characters; at least {min} recommended)",
                    guidance.file
                ),
            ));
        }
    }
    findings
}

/// `missing-content` findings for one content check against the text of
/// its file.
pub fn content_check(entry: &str, check: &ContentCheck, text: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    if !check.contains.is_empty() {
        let found = if check.ignore_case {
            let lower = text.to_lowercase();
            check
                .contains
                .iter()
                .any(|needle| lower.contains(&needle.to_lowercase()))
        } else {
            check.contains.iter().any(|needle| text.contains(needle.as_str()))
        };
        if !found {
            findings.push(Finding::new(
                check.severity,
                entry,
                RuleId::MissingContent,
                format!("{} has no {}", check.file, check.label),
            ));
        }
    }
    if let Some(min) = check.min_chars {
        let chars = text.chars().count();
        if chars < min {
            findings.push(Finding::new(
                check.severity,
                entry,
                RuleId::MissingContent,
                format!(
                    "{} is short ({chars} characters; at least {min} expected)",
                    check.file
                ),
            ));
        }
    }
    findings
}
