#![deny(missing_docs)]

//! # ctk-schema: Schema Registry & Manifest Validation
//!
//! Loads JSON Schema documents, compiles them once, and validates the
//! manifest of each contribution entry against the schema its kind names.
//!
//! ## Registry (`registry`)
//!
//! [`SchemaRegistry`] maps identifiers (`skill`, `subagent`, `mcp-server`)
//! to compiled [`Schema`]s. The three built-in documents ship inside the
//! crate; a schema directory can override any of them. The registry is
//! populated before evaluation starts and only read afterwards.
//!
//! ## Validation (`validator`)
//!
//! [`SchemaValidator`] parses a manifest (JSON file or markdown
//! front-matter), evaluates it, and maps each violation to a
//! [`ctk_core::Finding`] carrying a JSON pointer.
//!
//! ## Crate Policy
//!
//! - Depends only on `ctk-core` internally.
//! - No network access: every `$ref` must resolve inside its own document.
//! - Schema problems are [`RegistryError`]s and abort the run; manifest
//!   problems are findings and never do.

pub mod error;
pub mod registry;
pub mod schema;
pub mod validator;

pub use error::RegistryError;
pub use registry::{builtin_identifiers, SchemaRegistry};
pub use schema::{Dialect, Schema, Violation, ViolationKind};
pub use validator::SchemaValidator;
