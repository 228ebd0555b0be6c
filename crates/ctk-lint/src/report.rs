//! # Report Aggregation
//!
//! Workers evaluate entries in any order and hand their findings to a
//! shared [`ReportAggregator`]. Each record is keyed by the entry's scan
//! index, so [`ReportAggregator::finalize`] can emit entries in scan order
//! no matter which worker finished first.
//!
//! Recorded findings are never edited. Strict mode is applied in
//! `finalize` on copies, which keeps `finalize` idempotent and lets the
//! same records be rendered strict and non-strict.
//!
//! ## Status
//!
//! An entry fails iff it has at least one error after promotion. The run
//! fails iff any entry fails. Info findings never fail anything.

use std::collections::BTreeMap;

use ctk_core::{ContributionEntry, ContributionKind, Finding, Severity};
use parking_lot::Mutex;
use serde::Serialize;

/// Pass/fail status of an entry or a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No error-severity findings.
    Passed,
    /// At least one error-severity finding.
    Failed,
}

impl RunStatus {
    /// The stable string form used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Findings for one entry, after strict promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// Directory name.
    pub entry: String,
    /// Contribution kind.
    pub kind: ContributionKind,
    /// Directory path with `/` separators.
    pub path: String,
    /// Entry status.
    pub status: RunStatus,
    /// Findings in evaluation order.
    pub findings: Vec<Finding>,
}

/// Counts over a finalized report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Entries evaluated.
    pub entries: usize,
    /// Entries that passed.
    pub passed: usize,
    /// Entries that failed.
    pub failed: usize,
    /// Error findings.
    pub errors: usize,
    /// Warning findings.
    pub warnings: usize,
    /// Info findings.
    pub infos: usize,
}

/// The result of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Overall status.
    pub status: RunStatus,
    /// Whether strict promotion was applied.
    pub strict: bool,
    /// Counts.
    pub summary: Summary,
    /// Entries in scan order.
    pub entries: Vec<EntryReport>,
}

impl ValidationReport {
    /// Whether every entry passed.
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    /// The entry list as pretty-printed JSON with a trailing newline: an
    /// array of `{entry, kind, path, status, findings}` objects in scan
    /// order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(&self.entries)?;
        out.push('\n');
        Ok(out)
    }

    /// The whole report, including status and summary counts, as
    /// pretty-printed JSON with a trailing newline.
    pub fn to_json_summary(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Human-readable rendering; see the [`Display`](std::fmt::Display)
    /// impl.
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

/// ```text
/// subagent code-reviewer (repo/subagents/examples/code-reviewer): failed
///   [error] schema-required /model: "model" is a required property
/// failed: 1 entries, 0 passed, 1 failed; 1 errors, 0 warnings, 0 infos
/// ```
impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{} {} ({}): {}",
                entry.kind, entry.entry, entry.path, entry.status
            )?;
            for finding in &entry.findings {
                match finding.field_path.as_deref() {
                    Some(path) if !path.is_empty() => writeln!(
                        f,
                        "  [{}] {} {}: {}",
                        finding.severity, finding.rule, path, finding.message
                    )?,
                    _ => writeln!(
                        f,
                        "  [{}] {}: {}",
                        finding.severity, finding.rule, finding.message
                    )?,
                }
            }
        }
        let s = &self.summary;
        writeln!(
            f,
            "{}{}: {} entries, {} passed, {} failed; {} errors, {} warnings, {} infos",
            self.status,
            if self.strict { " (strict)" } else { "" },
            s.entries,
            s.passed,
            s.failed,
            s.errors,
            s.warnings,
            s.infos
        )
    }
}

#[derive(Debug)]
struct Record {
    kind: ContributionKind,
    name: String,
    path: String,
    findings: Vec<Finding>,
}

/// Thread-safe collector of per-entry findings.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    records: Mutex<BTreeMap<usize, Record>>,
}

impl ReportAggregator {
    /// An empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the findings of the entry at scan position `index`. Recording
    /// the same index again appends.
    pub fn record(&self, index: usize, entry: &ContributionEntry, findings: Vec<Finding>) {
        let mut records = self.records.lock();
        records
            .entry(index)
            .or_insert_with(|| Record {
                kind: entry.kind(),
                name: entry.name().to_string(),
                path: entry.display_path(),
                findings: Vec::new(),
            })
            .findings
            .extend(findings);
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Build the report. Calling this again, with or without `strict`,
    /// never changes what was recorded.
    pub fn finalize(&self, strict: bool) -> ValidationReport {
        let records = self.records.lock();
        let mut summary = Summary::default();
        let entries: Vec<EntryReport> = records
            .values()
            .map(|record| {
                let findings: Vec<Finding> =
                    record.findings.iter().map(|f| f.promoted(strict)).collect();
                let status = if findings.iter().any(Finding::is_error) {
                    RunStatus::Failed
                } else {
                    RunStatus::Passed
                };
                summary.entries += 1;
                match status {
                    RunStatus::Passed => summary.passed += 1,
                    RunStatus::Failed => summary.failed += 1,
                }
                for finding in &findings {
                    match finding.severity {
                        Severity::Error => summary.errors += 1,
                        Severity::Warning => summary.warnings += 1,
                        Severity::Info => summary.infos += 1,
                    }
                }
                EntryReport {
                    entry: record.name.clone(),
                    kind: record.kind,
                    path: record.path.clone(),
                    status,
                    findings,
                }
            })
            .collect();

        ValidationReport {
            status: if summary.failed > 0 {
                RunStatus::Failed
            } else {
                RunStatus::Passed
            },
            strict,
            summary,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctk_core::RuleId;
    use proptest::prelude::*;

    fn entry(name: &str) -> ContributionEntry {
        ContributionEntry::new(
            ContributionKind::Skill,
            name,
            format!("repo/skills/examples/{name}"),
            BTreeMap::new(),
        )
    }

    fn finding(severity: Severity) -> Finding {
        Finding::new(severity, "x", RuleId::NamingConvention, "m")
    }

    #[test]
    fn entries_come_out_in_scan_order() {
        let agg = ReportAggregator::new();
        agg.record(2, &entry("c"), vec![]);
        agg.record(0, &entry("a"), vec![]);
        agg.record(1, &entry("b"), vec![]);
        let report = agg.finalize(false);
        let names: Vec<&str> = report.entries.iter().map(|e| e.entry.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(agg.len(), 3);
    }

    #[test]
    fn warnings_fail_only_in_strict_mode() {
        let agg = ReportAggregator::new();
        agg.record(0, &entry("a"), vec![finding(Severity::Warning)]);
        agg.record(1, &entry("b"), vec![finding(Severity::Info)]);

        let lenient = agg.finalize(false);
        assert!(lenient.passed());
        assert_eq!(lenient.summary.warnings, 1);

        let strict = agg.finalize(true);
        assert_eq!(strict.status, RunStatus::Failed);
        assert_eq!(strict.entries[0].status, RunStatus::Failed);
        assert_eq!(strict.entries[1].status, RunStatus::Passed);
        assert_eq!(strict.summary.errors, 1);
        assert_eq!(strict.summary.warnings, 0);
        assert_eq!(strict.summary.infos, 1);

        // Promotion works on copies.
        assert_eq!(agg.finalize(false), lenient);
    }

    #[test]
    fn repeated_index_appends() {
        let agg = ReportAggregator::new();
        agg.record(0, &entry("a"), vec![finding(Severity::Info)]);
        agg.record(0, &entry("a"), vec![finding(Severity::Error)]);
        let report = agg.finalize(false);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].findings.len(), 2);
        assert_eq!(report.status, RunStatus::Failed);
    }

    #[test]
    fn empty_run_passes() {
        let report = ReportAggregator::new().finalize(true);
        assert!(report.passed());
        assert_eq!(report.summary, Summary::default());
    }

    #[test]
    fn json_shape() {
        let agg = ReportAggregator::new();
        agg.record(
            0,
            &entry("pdf-tools"),
            vec![Finding::error("pdf-tools", RuleId::SchemaRequired, "\"description\" is a required property")
                .at("/description")],
        );
        let report = agg.finalize(false);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e["entry"], "pdf-tools");
        assert_eq!(e["kind"], "skill");
        assert_eq!(e["path"], "repo/skills/examples/pdf-tools");
        assert_eq!(e["status"], "failed");
        let f = &e["findings"][0];
        assert_eq!(f["severity"], "error");
        assert_eq!(f["rule"], "schema-required");
        assert_eq!(f["field_path"], "/description");
        assert!(f.get("entry").is_none());

        let summary: serde_json::Value =
            serde_json::from_str(&report.to_json_summary().unwrap()).unwrap();
        assert_eq!(summary["status"], "failed");
        assert_eq!(summary["strict"], false);
        assert_eq!(summary["summary"]["errors"], 1);
        assert_eq!(summary["entries"], value);
    }

    #[test]
    fn empty_run_is_an_empty_json_list() {
        let report = ReportAggregator::new().finalize(false);
        assert_eq!(report.to_json().unwrap(), "[]\n");
    }

    #[test]
    fn text_rendering() {
        let agg = ReportAggregator::new();
        agg.record(
            0,
            &entry("pdf-tools"),
            vec![
                Finding::warning("pdf-tools", RuleId::NamingConvention, "bad name"),
                Finding::error("pdf-tools", RuleId::SchemaType, "not a string").at("/name"),
            ],
        );
        let text = agg.finalize(true).render_text();
        assert_eq!(
            text,
            "skill pdf-tools (repo/skills/examples/pdf-tools): failed\n\
             \x20 [error] naming-convention: bad name\n\
             \x20 [error] schema-type /name: not a string\n\
             failed (strict): 1 entries, 0 passed, 1 failed; 2 errors, 0 warnings, 0 infos\n"
        );
    }

    fn severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Info),
            Just(Severity::Warning),
            Just(Severity::Error)
        ]
    }

    proptest! {
        /// Strict mode never turns a failing entry or run into a passing one.
        #[test]
        fn strict_is_monotonic(entries in prop::collection::vec(prop::collection::vec(severity(), 0..6), 0..8)) {
            let agg = ReportAggregator::new();
            for (i, severities) in entries.iter().enumerate() {
                let findings = severities.iter().map(|s| finding(*s)).collect();
                agg.record(i, &entry(&format!("e{i}")), findings);
            }
            let lenient = agg.finalize(false);
            let strict = agg.finalize(true);
            prop_assert!(strict.summary.failed >= lenient.summary.failed);
            if lenient.status == RunStatus::Failed {
                prop_assert_eq!(strict.status, RunStatus::Failed);
            }
            for (l, s) in lenient.entries.iter().zip(&strict.entries) {
                if l.status == RunStatus::Failed {
                    prop_assert_eq!(s.status, RunStatus::Failed);
                }
            }
            prop_assert_eq!(strict.summary.infos, lenient.summary.infos);
        }

        /// Finalizing twice yields the same report.
        #[test]
        fn finalize_is_idempotent(severities in prop::collection::vec(severity(), 0..10), strict in any::<bool>()) {
            let agg = ReportAggregator::new();
            agg.record(0, &entry("a"), severities.iter().map(|s| finding(*s)).collect());
            prop_assert_eq!(agg.finalize(strict), agg.finalize(strict));
        }
    }
}
