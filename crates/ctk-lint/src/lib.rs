#![deny(missing_docs)]

//! # ctk-lint: Scanning, Rules & Reports
//!
//! Turns a repository checkout into a [`ValidationReport`].
//!
//! ## Pipeline
//!
//! ```text
//! DirectoryScanner ──► (index, ContributionEntry) ──► workers
//!                                                      │ StructuralRuleEngine
//!                                                      │ SchemaValidator
//!                                                      ▼
//!                                   ReportAggregator::record ──► finalize
//! ```
//!
//! - [`scanner`]: lazy, restartable discovery of contribution directories.
//! - [`structural`] and [`content`]: file-presence, naming, size and
//!   content rules. Pure functions of an entry and its files.
//! - [`report`]: thread-safe collection of findings and the final report
//!   in scan order, with text and JSON renderings.
//! - [`engine`]: the scoped worker pool tying it together.
//!
//! ## Crate Policy
//!
//! - Rules never fail a run; they produce findings.
//! - A [`LintError`] aborts the run and no report is produced.
//! - Reports are deterministic: identical trees render byte-identical
//!   output regardless of worker count.

pub mod content;
pub mod engine;
pub mod error;
pub mod report;
pub mod scanner;
pub mod structural;

pub use engine::{prepare_registry, LintEngine};
pub use error::LintError;
pub use report::{EntryReport, ReportAggregator, RunStatus, Summary, ValidationReport};
pub use scanner::{DirectoryScanner, PendingEntry, Scan};
pub use structural::StructuralRuleEngine;
