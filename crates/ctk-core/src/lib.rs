#![deny(missing_docs)]

//! # ctk-core: Foundational Types for the Contribution Validator
//!
//! Every other crate in the workspace depends on this one. It has no
//! internal dependencies and holds only data types and pure parsing:
//!
//! - [`ContributionKind`]: the single enum naming skill, subagent and
//!   MCP-server contributions.
//! - [`KindTable`]: the explicit table mapping each kind to its parent
//!   directory, required and recommended files, manifest and schema.
//! - [`ContributionEntry`]: one scanned contribution directory.
//! - [`Finding`], [`Severity`], [`RuleId`]: one reported issue.
//! - [`front_matter`]: the two-phase front-matter parser.
//! - [`LintConfig`]: run configuration, loadable from YAML.
//!
//! ## Design Principles
//!
//! 1. **One rule-id enum.** Every producer of findings uses [`RuleId`], so a
//!    report's rule identifiers cannot drift between components.
//! 2. **Findings are values.** Nothing mutates a [`Finding`] after it is
//!    created; strict mode produces promoted copies.
//! 3. **Structured errors with `thiserror`.** No `.unwrap()` outside tests.

pub mod config;
pub mod entry;
pub mod error;
pub mod finding;
pub mod front_matter;
pub mod kind;
pub mod table;

pub use config::{LintConfig, DEFAULT_MAX_FILE_SIZE};
pub use entry::ContributionEntry;
pub use error::ConfigError;
pub use finding::{Finding, RuleId, Severity};
pub use front_matter::{FrontMatter, FrontMatterError};
pub use kind::{is_conventional_name, ContributionKind, NAMING_PATTERN};
pub use table::{
    ContentCheck, Guidance, KindSpec, KindTable, ManifestFormat, ManifestSpec, RecommendedFile,
    RequiredFile,
};
