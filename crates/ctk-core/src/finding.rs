//! # Findings
//!
//! A [`Finding`] is one detected issue on one contribution. Findings are
//! created by the structural rule engine or the schema validator, collected
//! by the report aggregator, and never mutated afterwards. Strict mode
//! produces promoted copies instead of editing the originals.

use serde::{Deserialize, Serialize};

/// Severity of a finding.
///
/// Ordered `Info < Warning < Error`. Only `Error` fails an entry; strict
/// mode promotes `Warning` to `Error`. `Info` never affects status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory note; never fails an entry.
    Info,
    /// Convention violation; fails an entry only in strict mode.
    Warning,
    /// Hard failure.
    Error,
}

impl Severity {
    /// The stable string form used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Apply strict-mode promotion: warnings become errors.
    pub fn promoted(self, strict: bool) -> Self {
        match self {
            Self::Warning if strict => Self::Error,
            other => other,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the rule that produced a finding.
///
/// Single definition shared by every producer so that rule ids in reports
/// cannot drift between the structural engine and the schema validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    /// A file required for the entry's kind is absent.
    MissingRequiredFile,
    /// A recommended file for the entry's kind is absent.
    MissingRecommendedFile,
    /// Directory name is not lowercase and hyphen-separated.
    NamingConvention,
    /// A tracked file exceeds the size ceiling.
    OversizedFile,
    /// A file that must never be committed (such as `.env`) is present.
    CommittedEnvFile,
    /// Front-matter block is absent or malformed.
    InvalidFrontMatter,
    /// A credential-like value appears in a tracked file.
    SensitiveData,
    /// A `requirements.txt` line has an unusual format.
    RequirementsFormat,
    /// A `.env.example` line has an unusual format.
    EnvExampleFormat,
    /// Authoring guidance: missing section or very short document.
    ContentGuidance,
    /// A file lacks content its kind expects, such as a server instance.
    MissingContent,
    /// A file needed by a rule could not be read.
    UnreadableFile,
    /// The structured manifest could not be parsed.
    ManifestUnparseable,
    /// An optional manifest is absent, so schema checks were skipped.
    ManifestAbsent,
    /// A required manifest field is missing.
    SchemaRequired,
    /// A manifest field has the wrong type.
    SchemaType,
    /// A manifest string does not match a suggested pattern.
    SchemaPattern,
    /// A manifest string does not match a suggested format.
    SchemaFormat,
    /// A manifest object carries a property the schema does not declare.
    SchemaAdditionalProperty,
    /// Any other schema constraint (enum, range, length, uniqueness).
    SchemaConstraint,
}

impl RuleId {
    /// The stable kebab-case form used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequiredFile => "missing-required-file",
            Self::MissingRecommendedFile => "missing-recommended-file",
            Self::NamingConvention => "naming-convention",
            Self::OversizedFile => "oversized-file",
            Self::CommittedEnvFile => "committed-env-file",
            Self::InvalidFrontMatter => "invalid-front-matter",
            Self::SensitiveData => "sensitive-data",
            Self::RequirementsFormat => "requirements-format",
            Self::EnvExampleFormat => "env-example-format",
            Self::ContentGuidance => "content-guidance",
            Self::MissingContent => "missing-content",
            Self::UnreadableFile => "unreadable-file",
            Self::ManifestUnparseable => "manifest-unparseable",
            Self::ManifestAbsent => "manifest-absent",
            Self::SchemaRequired => "schema-required",
            Self::SchemaType => "schema-type",
            Self::SchemaPattern => "schema-pattern",
            Self::SchemaFormat => "schema-format",
            Self::SchemaAdditionalProperty => "schema-additional-property",
            Self::SchemaConstraint => "schema-constraint",
        }
    }

    /// Whether this rule is produced by schema evaluation.
    pub fn is_schema_rule(&self) -> bool {
        matches!(
            self,
            Self::ManifestUnparseable
                | Self::ManifestAbsent
                | Self::SchemaRequired
                | Self::SchemaType
                | Self::SchemaPattern
                | Self::SchemaFormat
                | Self::SchemaAdditionalProperty
                | Self::SchemaConstraint
        )
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported issue on one contribution entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// How serious the issue is.
    pub severity: Severity,
    /// Name of the entry the finding belongs to.
    #[serde(skip)]
    pub entry: String,
    /// The rule that produced the finding.
    pub rule: RuleId,
    /// JSON pointer into the manifest, for schema findings.
    pub field_path: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Finding {
    /// Create a finding without a field path.
    pub fn new(
        severity: Severity,
        entry: impl Into<String>,
        rule: RuleId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            entry: entry.into(),
            rule,
            field_path: None,
            message: message.into(),
        }
    }

    /// Shorthand for an error-severity finding.
    pub fn error(entry: impl Into<String>, rule: RuleId, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, entry, rule, message)
    }

    /// Shorthand for a warning-severity finding.
    pub fn warning(entry: impl Into<String>, rule: RuleId, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, entry, rule, message)
    }

    /// Shorthand for an info-severity finding.
    pub fn info(entry: impl Into<String>, rule: RuleId, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, entry, rule, message)
    }

    /// Attach a JSON pointer field path.
    pub fn at(mut self, field_path: impl Into<String>) -> Self {
        self.field_path = Some(field_path.into());
        self
    }

    /// Returns a copy with strict-mode promotion applied.
    pub fn promoted(&self, strict: bool) -> Self {
        Self {
            severity: self.severity.promoted(strict),
            ..self.clone()
        }
    }

    /// Whether this finding fails its entry.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field_path {
            Some(path) => write!(f, "{} {} {}: {}", self.severity, self.rule, path, self.message),
            None => write!(f, "{} {}: {}", self.severity, self.rule, self.message),
        }
    }
}
