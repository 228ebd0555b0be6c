//! Errors that abort a lint run.

use std::path::PathBuf;

use ctk_core::ConfigError;
use ctk_schema::RegistryError;
use thiserror::Error;

/// A fatal lint error. Rule violations are never errors; they are findings.
#[derive(Error, Debug)]
pub enum LintError {
    /// A scan root does not exist or is not a readable directory.
    #[error("cannot scan {path}: {reason}")]
    UnreadableRoot {
        /// The root as given.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// A schema could not be loaded or is missing.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_root_display() {
        let err = LintError::UnreadableRoot {
            path: PathBuf::from("/no/such/dir"),
            reason: "not a directory".to_string(),
        };
        assert_eq!(err.to_string(), "cannot scan /no/such/dir: not a directory");
    }

    #[test]
    fn registry_error_is_transparent() {
        let err: LintError = RegistryError::SchemaNotFound("skill".to_string()).into();
        assert_eq!(err.to_string(), "schema not found: 'skill'");
    }
}
