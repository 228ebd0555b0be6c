//! # ctk-cli: Contribution Toolkit Command-Line Interface
//!
//! Validates skill, subagent and MCP-server contributions before they are
//! accepted into the toolkit repository.
//!
//! ## Subcommands
//!
//! - `validate`: scan one or more repository roots and report findings
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | every entry passed |
//! | 1 | one or more entries failed |
//! | 2 | usage or configuration error (bad path, bad config, unloadable schema) |
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to `ctk-lint`; no rule logic lives here.
//! - The report goes to stdout, logs go to stderr.

pub mod validate;
