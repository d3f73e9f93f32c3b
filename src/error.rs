//! Errors raised while validating, compiling and analyzing registrations.
//!
//! Every fatal condition is a variant of [`RegistryError`]. Variants are
//! grouped into three [`ErrorKind`]s; the host decides per kind whether to
//! abort a single file transform or the whole build. Each variant also
//! carries a stable code so build output can be grepped.

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_DUPLICATE_IDENTIFIER: &str = "TDC-ERR-CONFIG-001";
pub const ERR_UNKNOWN_PROP: &str = "TDC-ERR-CONFIG-002";
pub const ERR_UNKNOWN_DEPENDENCY: &str = "TDC-ERR-CONFIG-003";
pub const ERR_MALFORMED_EXPRESSION: &str = "TDC-ERR-CONFIG-004";
pub const ERR_MALFORMED_PARAMETERS: &str = "TDC-ERR-CONFIG-005";
pub const ERR_UNMAPPED_VALUE: &str = "TDC-ERR-CONFIG-006";
pub const ERR_UNBOUND_IDENTIFIER: &str = "TDC-ERR-CONFIG-007";
pub const ERR_UNSUPPORTED_EXPRESSION: &str = "TDC-ERR-CONFIG-008";
pub const ERR_INVALID_CONFIG: &str = "TDC-ERR-CONFIG-009";
pub const ERR_DOMAIN_VIOLATION: &str = "TDC-ERR-DOMAIN-001";
pub const ERR_MISSING_REQUIRED_PROP: &str = "TDC-ERR-PROP-001";

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The registrations, a mapping, or an analyzed expression are inconsistent.
    Configuration,
    /// A literal value lies outside its prop's declared domain.
    DomainViolation,
    /// A template selected a prop that was never assigned and has no fallback.
    MissingRequiredProp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("found duplicate registration '{identifier}'")]
    DuplicateIdentifier { identifier: String },

    #[error("registered props of '{identifier}' do not contain key '{prop}'")]
    UnknownProp { identifier: String, prop: String },

    #[error("registration '{identifier}' has no dependency '{dependency}'")]
    UnknownDependency {
        identifier: String,
        dependency: String,
    },

    #[error("malformed prop expression `{source_text}`: {reason}")]
    MalformedExpression { source_text: String, reason: String },

    #[error(
        "malformed parameter for prop '{prop}': expected a string or a map of modifier keys to strings"
    )]
    MalformedParameters { prop: String },

    #[error("registration '{identifier}' has no case for {prop}='{value}' and no fallback")]
    UnmappedValue {
        identifier: String,
        prop: String,
        value: String,
    },

    #[error("identifier '{name}' is not bound in the evaluation scope")]
    UnboundIdentifier { name: String },

    #[error("expression `{source_text}` is outside the object-literal grammar")]
    UnsupportedExpression { source_text: String },

    #[error("invalid library configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(
        "value '{value}' of prop '{prop}' in '{identifier}' is not amongst the registered values [{}]",
        .allowed.join(", ")
    )]
    DomainViolation {
        identifier: String,
        prop: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("registration '{identifier}' requires prop '{prop}' (modifier '{modifier}') but it was not provided")]
    MissingRequiredProp {
        identifier: String,
        prop: String,
        modifier: String,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::DomainViolation { .. } => ErrorKind::DomainViolation,
            RegistryError::MissingRequiredProp { .. } => ErrorKind::MissingRequiredProp,
            _ => ErrorKind::Configuration,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::DuplicateIdentifier { .. } => ERR_DUPLICATE_IDENTIFIER,
            RegistryError::UnknownProp { .. } => ERR_UNKNOWN_PROP,
            RegistryError::UnknownDependency { .. } => ERR_UNKNOWN_DEPENDENCY,
            RegistryError::MalformedExpression { .. } => ERR_MALFORMED_EXPRESSION,
            RegistryError::MalformedParameters { .. } => ERR_MALFORMED_PARAMETERS,
            RegistryError::UnmappedValue { .. } => ERR_UNMAPPED_VALUE,
            RegistryError::UnboundIdentifier { .. } => ERR_UNBOUND_IDENTIFIER,
            RegistryError::UnsupportedExpression { .. } => ERR_UNSUPPORTED_EXPRESSION,
            RegistryError::InvalidConfig { .. } => ERR_INVALID_CONFIG,
            RegistryError::DomainViolation { .. } => ERR_DOMAIN_VIOLATION,
            RegistryError::MissingRequiredProp { .. } => ERR_MISSING_REQUIRED_PROP,
        }
    }

    pub(crate) fn malformed(source_text: &str, reason: impl Into<String>) -> Self {
        RegistryError::MalformedExpression {
            source_text: source_text.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_identifier_names_the_identifier() {
        let err = RegistryError::DuplicateIdentifier {
            identifier: "button".to_string(),
        };
        assert!(err.to_string().contains("button"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.code(), ERR_DUPLICATE_IDENTIFIER);
    }

    #[test]
    fn test_domain_violation_lists_allowed_values() {
        let err = RegistryError::DomainViolation {
            identifier: "button".to_string(),
            prop: "size".to_string(),
            value: "lg".to_string(),
            allowed: vec!["sm".to_string(), "md".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'lg'"));
        assert!(msg.contains("[sm, md]"));
        assert_eq!(err.kind(), ErrorKind::DomainViolation);
    }

    #[test]
    fn test_missing_required_prop_kind() {
        let err = RegistryError::MissingRequiredProp {
            identifier: "icon".to_string(),
            prop: "destructive".to_string(),
            modifier: "default".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredProp);
        assert_eq!(err.code(), ERR_MISSING_REQUIRED_PROP);
        assert!(err.to_string().contains("destructive"));
    }
}
