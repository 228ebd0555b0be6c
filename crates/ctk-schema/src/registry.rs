//! # Schema Registry
//!
//! Maps schema identifiers to compiled [`Schema`]s.
//!
//! Documents come from two places, in order:
//!
//! 1. `<schema_dir>/<identifier>.schema.json`, when a schema directory is
//!    configured and the file exists.
//! 2. The built-in documents compiled into this crate.
//!
//! Each identifier is read and compiled at most once. After the run's
//! identifiers are loaded the registry is shared by reference and only
//! [`SchemaRegistry::get`] is called, so no locking is needed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::RegistryError;
use crate::schema::Schema;

const SKILL_SCHEMA: &str = include_str!("../schemas/skill.schema.json");
const SUBAGENT_SCHEMA: &str = include_str!("../schemas/subagent.schema.json");
const MCP_SERVER_SCHEMA: &str = include_str!("../schemas/mcp-server.schema.json");

const BUILTIN_IDENTIFIERS: &[&str] = &["mcp-server", "skill", "subagent"];

/// Identifiers of the schemas shipped with the crate, sorted.
pub fn builtin_identifiers() -> &'static [&'static str] {
    BUILTIN_IDENTIFIERS
}

fn builtin_document(identifier: &str) -> Option<&'static str> {
    match identifier {
        "skill" => Some(SKILL_SCHEMA),
        "subagent" => Some(SUBAGENT_SCHEMA),
        "mcp-server" => Some(MCP_SERVER_SCHEMA),
        _ => None,
    }
}

/// Registry of compiled schemas keyed by identifier.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schema_dir: Option<PathBuf>,
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    /// An empty registry backed by the built-in documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry that prefers documents in `dir`.
    pub fn with_schema_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: Some(dir.into()),
            schemas: HashMap::new(),
        }
    }

    /// The configured schema directory, if any.
    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Return the schema for `identifier`, loading and compiling it on the
    /// first request.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::SchemaNotFound`] if neither the schema directory
    ///   nor the built-ins have a document for the identifier.
    /// - [`RegistryError::SchemaLoad`] if the document cannot be read or
    ///   does not compile.
    pub fn load(&mut self, identifier: &str) -> Result<Arc<Schema>, RegistryError> {
        if let Some(schema) = self.schemas.get(identifier) {
            return Ok(Arc::clone(schema));
        }
        let text = self.read_document(identifier)?;
        self.insert(identifier, &text)
    }

    /// Look up a loaded schema.
    ///
    /// # Errors
    ///
    /// [`RegistryError::SchemaNotFound`] if the identifier was never loaded.
    pub fn get(&self, identifier: &str) -> Result<Arc<Schema>, RegistryError> {
        self.schemas
            .get(identifier)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::SchemaNotFound(identifier.to_string()))
    }

    /// Loaded identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of loaded schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether no schema has been loaded.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn insert(&mut self, identifier: &str, text: &str) -> Result<Arc<Schema>, RegistryError> {
        let schema = Arc::new(Schema::compile_as(identifier, text)?);
        tracing::debug!(
            identifier,
            dialect = %schema.dialect(),
            uri = schema.uri().unwrap_or(""),
            "compiled schema"
        );
        self.schemas
            .insert(identifier.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn read_document(&self, identifier: &str) -> Result<Cow<'static, str>, RegistryError> {
        check_identifier(identifier)?;
        if let Some(dir) = &self.schema_dir {
            let path = dir.join(format!("{identifier}.schema.json"));
            if path.is_file() {
                tracing::debug!(identifier, path = %path.display(), "reading schema document");
                return std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|e| RegistryError::SchemaLoad {
                        identifier: identifier.to_string(),
                        reason: format!("failed to read {}: {e}", path.display()),
                    });
            }
        }
        builtin_document(identifier)
            .map(Cow::Borrowed)
            .ok_or_else(|| RegistryError::SchemaNotFound(identifier.to_string()))
    }
}

/// Identifiers become file names, so they must be a single plain segment.
fn check_identifier(identifier: &str) -> Result<(), RegistryError> {
    let plain = !identifier.is_empty()
        && !identifier.starts_with('.')
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if plain {
        Ok(())
    } else {
        Err(RegistryError::SchemaLoad {
            identifier: identifier.to_string(),
            reason: "identifier must be a plain name (letters, digits, '-', '_', '.')"
                .to_string(),
        })
    }
}
