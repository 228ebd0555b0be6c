//! # Configuration
//!
//! [`LintConfig`] holds every tunable of a validation run. Defaults
//! reproduce the toolkit repository's conventions; a YAML file can override
//! any field, and command-line flags override the file.
//!
//! ```yaml
//! max_file_size: 1048576
//! jobs: 4
//! schema_dir: schemas
//! kinds:
//!   - kind: skill
//!     parent: skills/examples
//!     required:
//!       - any_of: [SKILL.md]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::table::KindTable;

/// Default per-file size ceiling: 1 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Settings for one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Files larger than this many bytes are `oversized-file` errors.
    pub max_file_size: u64,
    /// Worker threads; `None` uses the available parallelism.
    pub jobs: Option<usize>,
    /// Directory holding `<identifier>.schema.json` documents. Identifiers
    /// without a file there use the built-in documents.
    pub schema_dir: Option<PathBuf>,
    /// The kind table.
    pub kinds: KindTable,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            jobs: None,
            schema_dir: None,
            kinds: KindTable::builtin(),
        }
    }
}

impl LintConfig {
    /// Parse a configuration from YAML text.
    ///
    /// `origin` is only used in error messages.
    pub fn from_yaml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// A relative `schema_dir` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text, path)?;
        if let (Some(dir), Some(base)) = (config.schema_dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                config.schema_dir = Some(base.join(dir));
            }
        }
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid(
                "max_file_size must be greater than zero".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::Invalid("jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// The effective worker count.
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
