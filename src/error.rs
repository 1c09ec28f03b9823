//! Error types for association generation
//!
//! A failed constraint match is never an error: evaluation reports it as a
//! boolean and associations roll their state back. The variants here cover
//! the conditions that must surface to a caller — an invalid association
//! handed to `dump`, a serialized form no registered format accepts, and
//! programming errors in a plugged-in rule set.
//!
//! Each variant carries a stable error code (e.g. `ASSOCIATION_NOT_VALID`)
//! for logging and programmatic handling.

use thiserror::Error;

/// Result type alias for association operations
pub type Result<T> = std::result::Result<T, AsnError>;

/// Errors surfaced by the association engine
#[derive(Error, Debug)]
pub enum AsnError {
    /// The association failed schema validation at an explicit `dump` or
    /// `load`. `finalize` never raises this; it drops the association.
    #[error("Association is not valid: {reason}")]
    NotValid { reason: String },

    /// A rule variant is misconfigured — duplicate registration, an empty
    /// constraint tree, or an uncompilable schema. This signals a
    /// programming error in the rule set, not a data condition.
    #[error("Rule '{rule}' is misconfigured: {reason}")]
    RuleMisconfigured { rule: String, reason: String },

    /// No registered serialization format accepted the input.
    #[error("No registered format could load the input (tried: {tried})")]
    LoadFailure { tried: String },

    /// A `dump`/`load` call named a format keyword that was never
    /// registered.
    #[error("Unknown serialization format: '{fmt}'")]
    UnknownFormat { fmt: String },

    /// A format keyword was registered twice.
    #[error("Serialization format already registered: '{fmt}'")]
    FormatAlreadyRegistered { fmt: String },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML encoding or decoding failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AsnError {
    /// Stable, uppercase error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AsnError::NotValid { .. } => "ASSOCIATION_NOT_VALID",
            AsnError::RuleMisconfigured { .. } => "RULE_MISCONFIGURED",
            AsnError::LoadFailure { .. } => "LOAD_FAILURE",
            AsnError::UnknownFormat { .. } => "UNKNOWN_FORMAT",
            AsnError::FormatAlreadyRegistered { .. } => "FORMAT_ALREADY_REGISTERED",
            AsnError::Json(_) => "JSON_ERROR",
            AsnError::Yaml(_) => "YAML_ERROR",
        }
    }

    /// True if the error indicates a bug in the plugged-in rule set rather
    /// than a runtime data condition
    pub fn is_rule_error(&self) -> bool {
        matches!(self, AsnError::RuleMisconfigured { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            AsnError::NotValid {
                reason: "missing products".to_string()
            }
            .error_code(),
            "ASSOCIATION_NOT_VALID"
        );
        assert_eq!(
            AsnError::LoadFailure {
                tried: "json, yaml".to_string()
            }
            .error_code(),
            "LOAD_FAILURE"
        );
        assert_eq!(
            AsnError::UnknownFormat {
                fmt: "toml".to_string()
            }
            .error_code(),
            "UNKNOWN_FORMAT"
        );
    }

    #[test]
    fn test_rule_errors_are_flagged() {
        let err = AsnError::RuleMisconfigured {
            rule: "image".to_string(),
            reason: "empty constraint tree".to_string(),
        };
        assert!(err.is_rule_error());
        assert!(!AsnError::NotValid {
            reason: "x".to_string()
        }
        .is_rule_error());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = AsnError::RuleMisconfigured {
            rule: "slit-nod".to_string(),
            reason: "duplicate registration".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("slit-nod"));
        assert!(msg.contains("duplicate registration"));
    }
}
