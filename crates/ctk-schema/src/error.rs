//! Registry errors. Both variants are fatal to a validation run.

use thiserror::Error;

/// Errors while loading or looking up schemas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A schema document could not be read, parsed or compiled.
    #[error("schema load error for '{identifier}': {reason}")]
    SchemaLoad {
        /// Registry identifier or file the document was loaded from.
        identifier: String,
        /// What went wrong.
        reason: String,
    },

    /// No schema is registered under the identifier.
    #[error("schema not found: '{0}'")]
    SchemaNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = RegistryError::SchemaLoad {
            identifier: "skill".to_string(),
            reason: "malformed JSON".to_string(),
        };
        assert_eq!(err.to_string(), "schema load error for 'skill': malformed JSON");
        assert_eq!(
            RegistryError::SchemaNotFound("agent".to_string()).to_string(),
            "schema not found: 'agent'"
        );
    }
}
