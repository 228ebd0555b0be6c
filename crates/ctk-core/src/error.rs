//! # Error Types
//!
//! Structured errors for the configuration layer, built with `thiserror`.
//! Errors carry the file and the reason. Front-matter errors live next to
//! their parser in [`crate::front_matter`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors while loading or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`crate::LintConfig`].
    #[error("failed to parse config {path}: {reason}")]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_display() {
        let err = ConfigError::Read {
            path: PathBuf::from("ctk.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("ctk.yaml"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn parse_error_display() {
        let err = ConfigError::Parse {
            path: PathBuf::from("ctk.yaml"),
            reason: "unknown field `colour`".to_string(),
        };
        assert!(format!("{err}").contains("unknown field"));
    }

    #[test]
    fn invalid_error_display() {
        let err = ConfigError::Invalid("jobs must be at least 1".to_string());
        assert_eq!(
            format!("{err}"),
            "invalid configuration: jobs must be at least 1"
        );
    }
}
