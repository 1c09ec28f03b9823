//! Document validation
//!
//! Schema-driven structural checking of finished association documents,
//! plus one cross-cutting invariant: member file references should not
//! carry directory components. Path violations are reported as warnings,
//! never as validation failures — slightly malformed pools still produce
//! usable associations.

use jsonschema::JSONSchema;
use serde_json::Value;

use super::document::AsnDocument;
use crate::error::AsnError;

/// Validation outcome with detailed findings
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Whether validation passed
    pub is_valid: bool,
    /// Structural problems; any of these makes the document invalid
    pub errors: Vec<ValidationIssue>,
    /// Advisory findings that do not affect validity
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
        }
    }

    pub fn add_error(&mut self, issue: ValidationIssue) {
        self.is_valid = false;
        self.errors.push(issue);
    }

    pub fn add_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} errors, {} warnings",
            if self.is_valid { "VALID" } else { "INVALID" },
            self.errors.len(),
            self.warnings.len()
        )
    }
}

/// A single validation finding
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Issue code (`E...` error, `W...` warning)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Path to the offending element (e.g. `products[0].members[1].expname`)
    pub path: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Validates association documents against a rule's schema
pub struct DocumentValidator {
    compiled: JSONSchema,
}

impl std::fmt::Debug for DocumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentValidator").finish_non_exhaustive()
    }
}

impl DocumentValidator {
    /// Compile the given schema. A schema that does not compile is a
    /// defect in the rule definition, not a data condition.
    pub fn new(rule: &str, schema: &Value) -> Result<Self, AsnError> {
        let compiled = JSONSchema::compile(schema).map_err(|err| AsnError::RuleMisconfigured {
            rule: rule.to_string(),
            reason: format!("schema does not compile: {err}"),
        })?;
        Ok(Self { compiled })
    }

    /// Validate a document, collecting schema errors and path warnings
    pub fn validate(&self, doc: &AsnDocument) -> ValidationResult {
        let mut result = ValidationResult::valid();

        let instance = match serde_json::to_value(doc) {
            Ok(value) => value,
            Err(err) => {
                result.add_error(ValidationIssue::new(
                    "E000",
                    format!("document failed to serialize: {err}"),
                ));
                return result;
            }
        };

        if let Err(errors) = self.compiled.validate(&instance) {
            for err in errors {
                result.add_error(
                    ValidationIssue::new("E001", err.to_string())
                        .with_path(err.instance_path.to_string()),
                );
            }
        }

        self.check_member_paths(doc, &mut result);
        result
    }

    fn check_member_paths(&self, doc: &AsnDocument, result: &mut ValidationResult) {
        for (pi, product) in doc.products.iter().enumerate() {
            for (mi, member) in product.members.iter().enumerate() {
                let has_dir = std::path::Path::new(&member.expname)
                    .parent()
                    .is_some_and(|p| !p.as_os_str().is_empty());
                if has_dir {
                    tracing::warn!(
                        expname = %member.expname,
                        "association member carries path information; this can \
                         complicate usage and sharing of the association file"
                    );
                    result.add_warning(
                        ValidationIssue::new(
                            "W001",
                            format!("expname '{}' carries path information", member.expname),
                        )
                        .with_path(format!("products[{pi}].members[{mi}].expname")),
                    );
                }
            }
        }
    }
}
