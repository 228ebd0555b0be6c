//! # Structural Rules
//!
//! Evaluates one entry against its row of the kind table. Rules run in a
//! fixed order so that findings for an entry are stable:
//!
//! 1. `missing-required-file`, one per unmet requirement group
//! 2. `missing-recommended-file`, at the row's severity
//! 3. `naming-convention`
//! 4. `oversized-file`, one per file over the ceiling
//! 5. `committed-env-file`, one per forbidden file present
//! 6. `unreadable-file`, for any file a later rule needs
//! 7. `invalid-front-matter`, for front-matter manifests that exist
//! 8. content rules from [`crate::content`], ending with the row's
//!    content checks
//!
//! Each text file is read at most once per evaluation. Files over the size
//! ceiling are not read, except that the head of an oversized front-matter
//! manifest, up to the ceiling, is still checked for a well-formed block.
//! This engine is the only place that reports an unreadable manifest.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;

use ctk_core::{
    front_matter, is_conventional_name, ContributionEntry, Finding, KindSpec, KindTable,
    LintConfig, ManifestFormat, RuleId, NAMING_PATTERN,
};

use crate::content;

const REQUIREMENTS_FILE: &str = "requirements.txt";
const ENV_EXAMPLE_FILE: &str = ".env.example";

/// File-presence, naming, size and content rules.
#[derive(Debug, Clone)]
pub struct StructuralRuleEngine {
    table: KindTable,
    max_file_size: u64,
}

impl StructuralRuleEngine {
    /// Create an engine from the run configuration.
    pub fn new(config: &LintConfig) -> Self {
        Self {
            table: config.kinds.clone(),
            max_file_size: config.max_file_size,
        }
    }

    /// Evaluate every structural rule for `entry`.
    pub fn evaluate(&self, entry: &ContributionEntry) -> Vec<Finding> {
        let Some(spec) = self.table.spec(entry.kind()) else {
            return Vec::new();
        };
        let name = entry.name();
        let mut findings = Vec::new();

        for group in &spec.required {
            if !group.any_of.iter().any(|file| entry.has(file)) {
                findings.push(Finding::error(
                    name,
                    RuleId::MissingRequiredFile,
                    format!("missing required file {}", group.describe()),
                ));
            }
        }

        for recommended in &spec.recommended {
            if !entry.has(&recommended.file) {
                findings.push(Finding::new(
                    recommended.severity,
                    name,
                    RuleId::MissingRecommendedFile,
                    format!("missing recommended file {}", recommended.file),
                ));
            }
        }

        if !is_conventional_name(name) {
            findings.push(Finding::warning(
                name,
                RuleId::NamingConvention,
                format!(
                    "directory name '{name}' should be lowercase and hyphen-separated ({NAMING_PATTERN})"
                ),
            ));
        }

        for (file, size) in entry.files() {
            if size > self.max_file_size {
                findings.push(Finding::error(
                    name,
                    RuleId::OversizedFile,
                    format!(
                        "{file} is {size} bytes, over the {} byte limit",
                        self.max_file_size
                    ),
                ));
            }
        }

        for forbidden in &spec.forbidden {
            if entry.has(forbidden) {
                findings.push(Finding::error(
                    name,
                    RuleId::CommittedEnvFile,
                    format!("{forbidden} must not be committed; provide {ENV_EXAMPLE_FILE} instead"),
                ));
            }
        }

        let texts = self.read_texts(entry, spec, &mut findings);

        if let Some(manifest) = &spec.manifest {
            if manifest.format == ManifestFormat::FrontMatter {
                let text = match texts.get(manifest.file.as_str()) {
                    Some(text) => Some(Cow::Borrowed(text.as_str())),
                    None => self
                        .read_oversized_head(entry, &manifest.file, &mut findings)
                        .map(Cow::Owned),
                };
                if let Some(text) = text {
                    if let Err(e) = front_matter::parse(&text) {
                        findings.push(Finding::error(
                            name,
                            RuleId::InvalidFrontMatter,
                            format!("{}: {e}", manifest.file),
                        ));
                    }
                }
            }
        }

        for file in &spec.secret_scan {
            if let Some(text) = texts.get(file.as_str()) {
                findings.extend(content::sensitive_data(name, file, text));
            }
        }
        if let Some(text) = texts.get(REQUIREMENTS_FILE) {
            findings.extend(content::requirements(
                name,
                REQUIREMENTS_FILE,
                text,
                spec.required_dependency.as_deref(),
            ));
        }
        if let Some(text) = texts.get(ENV_EXAMPLE_FILE) {
            findings.extend(content::env_example(name, ENV_EXAMPLE_FILE, text));
        }
        if let Some(guidance) = &spec.guidance {
            if let Some(text) = texts.get(guidance.file.as_str()) {
                findings.extend(content::guidance(name, guidance, text));
            }
        }
        for check in &spec.content_checks {
            if let Some(text) = texts.get(check.file.as_str()) {
                findings.extend(content::content_check(name, check, text));
            }
        }

        tracing::trace!(entry = name, findings = findings.len(), "structural rules evaluated");
        findings
    }

    /// Read every text file a rule needs. Unreadable files become
    /// `unreadable-file` findings and are left out of the map.
    fn read_texts(
        &self,
        entry: &ContributionEntry,
        spec: &KindSpec,
        findings: &mut Vec<Finding>,
    ) -> BTreeMap<String, String> {
        let mut wanted: BTreeSet<&str> = spec.secret_scan.iter().map(String::as_str).collect();
        wanted.insert(REQUIREMENTS_FILE);
        wanted.insert(ENV_EXAMPLE_FILE);
        if let Some(manifest) = &spec.manifest {
            wanted.insert(manifest.file.as_str());
        }
        if let Some(guidance) = &spec.guidance {
            wanted.insert(guidance.file.as_str());
        }
        wanted.extend(spec.content_checks.iter().map(|check| check.file.as_str()));

        let mut texts = BTreeMap::new();
        for file in wanted {
            match entry.size_of(file) {
                Some(size) if size <= self.max_file_size => {}
                _ => continue,
            }
            match std::fs::read(entry.path_of(file)) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        texts.insert(file.to_string(), text);
                    }
                    Err(_) => findings.push(Finding::error(
                        entry.name(),
                        RuleId::UnreadableFile,
                        format!("{file} is not valid UTF-8"),
                    )),
                },
                Err(e) => findings.push(Finding::error(
                    entry.name(),
                    RuleId::UnreadableFile,
                    format!("cannot read {file}: {e}"),
                )),
            }
        }
        texts
    }

    /// The first `max_file_size` bytes of an oversized file, cut back to
    /// the last complete line. `None` if the file is within the ceiling,
    /// absent or unreadable; the last case is also a finding.
    fn read_oversized_head(
        &self,
        entry: &ContributionEntry,
        file: &str,
        findings: &mut Vec<Finding>,
    ) -> Option<String> {
        match entry.size_of(file) {
            Some(size) if size > self.max_file_size => {}
            _ => return None,
        }
        let mut bytes = Vec::new();
        let read = File::open(entry.path_of(file))
            .and_then(|f| f.take(self.max_file_size).read_to_end(&mut bytes));
        if let Err(e) = read {
            findings.push(Finding::error(
                entry.name(),
                RuleId::UnreadableFile,
                format!("cannot read {file}: {e}"),
            ));
            return None;
        }
        if let Some(end) = bytes.iter().rposition(|b| *b == b'\n') {
            bytes.truncate(end + 1);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            // A character cut in half by the ceiling is not corruption.
            Err(e) if e.utf8_error().error_len().is_none() => {
                let valid = e.utf8_error().valid_up_to();
                let mut bytes = e.into_bytes();
                bytes.truncate(valid);
                String::from_utf8(bytes).ok()
            }
            Err(_) => {
                findings.push(Finding::error(
                    entry.name(),
                    RuleId::UnreadableFile,
                    format!("{file} is not valid UTF-8"),
                ));
                None
            }
        }
    }
}
