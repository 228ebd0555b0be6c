//! # Manifest Validation
//!
//! Checks an entry's manifest against the schema its kind names and turns
//! every violation into a [`Finding`] with a JSON pointer field path.
//!
//! | Violation | Rule | Severity |
//! |---|---|---|
//! | missing required property | `schema-required` | error |
//! | wrong type | `schema-type` | error |
//! | `pattern` mismatch | `schema-pattern` | warning |
//! | `format` mismatch | `schema-format` | warning |
//! | undeclared property | `schema-additional-property` | warning |
//! | anything else | `schema-constraint` | error |
//!
//! Absent required manifests, unreadable or oversized manifests and
//! unparseable front-matter produce nothing here; the structural rules
//! already report them.

use ctk_core::{
    front_matter, ContributionEntry, Finding, KindTable, ManifestFormat, ManifestSpec, RuleId,
    Severity,
};
use serde_json::Value;

use crate::error::RegistryError;
use crate::registry::SchemaRegistry;
use crate::schema::{Violation, ViolationKind};

/// Validates manifests for the kinds of one [`KindTable`].
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    table: KindTable,
    max_file_size: u64,
}

impl SchemaValidator {
    /// Create a validator for `table` with no size ceiling.
    pub fn new(table: &KindTable) -> Self {
        Self {
            table: table.clone(),
            max_file_size: u64::MAX,
        }
    }

    /// Skip manifests larger than `max_file_size` bytes.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// Validate the manifest of `entry`.
    ///
    /// The schema must already be loaded in `registry`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::SchemaNotFound`] if the kind names a schema the
    /// registry does not hold. Problems with the manifest itself are
    /// findings, never errors.
    pub fn validate(
        &self,
        entry: &ContributionEntry,
        registry: &SchemaRegistry,
    ) -> Result<Vec<Finding>, RegistryError> {
        let Some(manifest) = self
            .table
            .spec(entry.kind())
            .and_then(|spec| spec.manifest.as_ref())
        else {
            return Ok(Vec::new());
        };
        let Some(schema_id) = manifest.schema.as_deref() else {
            return Ok(Vec::new());
        };
        let schema = registry.get(schema_id)?;

        if !entry.has(&manifest.file) {
            if manifest.optional {
                return Ok(vec![Finding::info(
                    entry.name(),
                    RuleId::ManifestAbsent,
                    format!(
                        "optional manifest {} not present; schema checks skipped",
                        manifest.file
                    ),
                )]);
            }
            return Ok(Vec::new());
        }
        if entry
            .size_of(&manifest.file)
            .is_some_and(|size| size > self.max_file_size)
        {
            tracing::debug!(
                entry = entry.name(),
                file = %manifest.file,
                "manifest over the size ceiling; schema checks skipped"
            );
            return Ok(Vec::new());
        }

        let Some(instance) = load_instance(entry, manifest) else {
            return Ok(Vec::new());
        };
        let instance = match instance {
            Loaded::Value(value) => value,
            Loaded::Finding(finding) => return Ok(vec![finding]),
        };

        let mut findings: Vec<Finding> = schema
            .evaluate(&instance)
            .into_iter()
            .map(|violation| to_finding(entry.name(), violation))
            .collect();
        findings.sort_by(|a, b| {
            (&a.field_path, a.rule, &a.message).cmp(&(&b.field_path, b.rule, &b.message))
        });
        tracing::trace!(
            entry = entry.name(),
            schema = schema_id,
            violations = findings.len(),
            "evaluated manifest"
        );
        Ok(findings)
    }
}

enum Loaded {
    Value(Value),
    Finding(Finding),
}

/// Read and parse the manifest. `None` means there is nothing to evaluate
/// and nothing to report.
fn load_instance(entry: &ContributionEntry, manifest: &ManifestSpec) -> Option<Loaded> {
    let path = entry.path_of(&manifest.file);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "manifest not readable");
            return None;
        }
    };

    match manifest.format {
        ManifestFormat::Json => match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(Loaded::Value(value)),
            Err(e) => Some(Loaded::Finding(Finding::error(
                entry.name(),
                RuleId::ManifestUnparseable,
                format!("{} is not valid JSON: {e}", manifest.file),
            ))),
        },
        ManifestFormat::FrontMatter => front_matter::parse(&text)
            .ok()
            .map(|fm| Loaded::Value(fm.to_value())),
    }
}

fn to_finding(entry: &str, violation: Violation) -> Finding {
    let (rule, severity) = match violation.kind {
        ViolationKind::Required => (RuleId::SchemaRequired, Severity::Error),
        ViolationKind::Type => (RuleId::SchemaType, Severity::Error),
        ViolationKind::Pattern => (RuleId::SchemaPattern, Severity::Warning),
        ViolationKind::Format => (RuleId::SchemaFormat, Severity::Warning),
        ViolationKind::AdditionalProperties => {
            (RuleId::SchemaAdditionalProperty, Severity::Warning)
        }
        ViolationKind::Other => (RuleId::SchemaConstraint, Severity::Error),
    };
    Finding::new(severity, entry, rule, violation.message).at(violation.pointer)
}
