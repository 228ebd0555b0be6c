//! # Lint Engine
//!
//! Runs the scan, the rules and the aggregation for one validation run.
//!
//! A fixed pool of scoped worker threads pulls `(index, pending)` pairs
//! from the shared lazy scan. Only the directory listing happens under the
//! queue lock; each worker walks its entry's files, evaluates structural
//! rules and then schema rules, and records the findings. Indices follow
//! listing order, so directories that turn out to be empty leave gaps that
//! do not affect report order. The schema registry is fully loaded before the
//! workers start and is only read while they run.
//!
//! A registry error is fatal: workers stop taking new entries, entries
//! already in progress finish, and the first error is returned instead of a
//! report.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use ctk_core::{ContributionEntry, Finding, KindTable, LintConfig};
use ctk_schema::{RegistryError, SchemaRegistry, SchemaValidator};
use parking_lot::Mutex;

use crate::error::LintError;
use crate::report::{ReportAggregator, ValidationReport};
use crate::scanner::DirectoryScanner;
use crate::structural::StructuralRuleEngine;

/// Build a registry holding every schema the kind table names.
///
/// Uses `config.schema_dir` when set, falling back to the built-in
/// documents.
pub fn prepare_registry(config: &LintConfig) -> Result<SchemaRegistry, RegistryError> {
    let mut registry = match &config.schema_dir {
        Some(dir) => SchemaRegistry::with_schema_dir(dir),
        None => SchemaRegistry::new(),
    };
    for identifier in config.kinds.schema_ids() {
        registry.load(identifier)?;
    }
    tracing::debug!(schemas = ?registry.identifiers(), "schema registry ready");
    Ok(registry)
}

/// Evaluates every entry under a set of roots.
#[derive(Debug)]
pub struct LintEngine<'r> {
    table: KindTable,
    structural: StructuralRuleEngine,
    validator: SchemaValidator,
    registry: &'r SchemaRegistry,
    workers: usize,
}

impl<'r> LintEngine<'r> {
    /// Create an engine. `registry` must already hold the table's schemas;
    /// see [`prepare_registry`].
    pub fn new(config: &LintConfig, registry: &'r SchemaRegistry) -> Self {
        Self {
            table: config.kinds.clone(),
            structural: StructuralRuleEngine::new(config),
            validator: SchemaValidator::new(&config.kinds)
                .with_max_file_size(config.max_file_size),
            registry,
            workers: config.worker_count().max(1),
        }
    }

    /// Evaluate one entry: structural findings first, then schema findings.
    pub fn evaluate(&self, entry: &ContributionEntry) -> Result<Vec<Finding>, RegistryError> {
        let mut findings = self.structural.evaluate(entry);
        findings.extend(self.validator.validate(entry, self.registry)?);
        Ok(findings)
    }

    /// Scan `roots` and evaluate every entry.
    ///
    /// # Errors
    ///
    /// - [`LintError::UnreadableRoot`] before any work starts.
    /// - [`LintError::Registry`] if schema validation hits a missing
    ///   schema; no report is produced.
    pub fn run(&self, roots: &[PathBuf], strict: bool) -> Result<ValidationReport, LintError> {
        let scanner = DirectoryScanner::new(roots.iter().cloned(), &self.table);
        scanner.check_roots()?;

        let aggregator = ReportAggregator::new();
        let queue = Mutex::new(scanner.scan().pending().enumerate());
        let stop = AtomicBool::new(false);
        let failure: Mutex<Option<RegistryError>> = Mutex::new(None);

        tracing::info!(
            roots = scanner.roots().len(),
            workers = self.workers,
            strict,
            "validation started"
        );

        std::thread::scope(|scope| {
            for worker in 0..self.workers {
                let (aggregator, queue, stop, failure) = (&aggregator, &queue, &stop, &failure);
                scope.spawn(move || loop {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    let next = queue.lock().next();
                    let Some((index, pending)) = next else {
                        break;
                    };
                    let Some(entry) = pending.collect() else {
                        continue;
                    };
                    tracing::debug!(worker, index, entry = entry.name(), kind = %entry.kind(), "evaluating");
                    match self.evaluate(&entry) {
                        Ok(findings) => aggregator.record(index, &entry, findings),
                        Err(e) => {
                            tracing::debug!(worker, entry = entry.name(), error = %e, "stopping");
                            stop.store(true, Ordering::Release);
                            failure.lock().get_or_insert(e);
                            break;
                        }
                    }
                });
            }
        });

        if let Some(e) = failure.into_inner() {
            return Err(e.into());
        }

        let report = aggregator.finalize(strict);
        tracing::info!(
            status = %report.status,
            entries = report.summary.entries,
            failed = report.summary.failed,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            "validation finished"
        );
        Ok(report)
    }
}
