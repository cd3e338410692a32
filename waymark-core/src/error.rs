// Error types for Waymark link building

use thiserror::Error;

/// Errors raised while recording invocations, discovering mappings, building
/// links or expanding templates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("No mapping found for {handler}::{method}")]
    NoMapping { handler: String, method: String },

    #[error("No mapping found for handler {0}")]
    NoTypeMapping(String),

    #[error("Method {method} is not declared on handler {handler} or its parents")]
    UndeclaredMethod { handler: String, method: String },

    #[error(
        "Could not determine the variable name for parameter #{index} of {handler}::{method}: \
         declare an explicit name or a binding name"
    )]
    UnnamedParameter {
        handler: String,
        method: String,
        index: usize,
    },

    #[error("{handler}::{method} declares {expected} parameters but was invoked with {actual} arguments")]
    ArgumentCountMismatch {
        handler: String,
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Query parameter name '{0}' cannot be left as a template variable")]
    InvalidParameterName(String),

    #[error("No invocation recorded on stand-in for {0}")]
    NoInvocation(String),

    #[error("No handler registered for entity type {0}")]
    UnexposedEntity(String),

    #[error("Template variable {0} is required but no value was given")]
    MissingTemplateVariable(String),

    #[error("Invalid URI template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid base URI: {0}")]
    InvalidBaseUri(String),
}

impl Error {
    /// Whether this error indicates broken handler metadata or wiring.
    ///
    /// Configuration errors surface while the link is built, never later.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::NoMapping { .. }
                | Error::NoTypeMapping(_)
                | Error::UndeclaredMethod { .. }
                | Error::UnnamedParameter { .. }
                | Error::ArgumentCountMismatch { .. }
                | Error::InvalidParameterName(_)
                | Error::NoInvocation(_)
                | Error::UnexposedEntity(_)
                | Error::InvalidBaseUri(_)
        )
    }

    /// Whether this error was raised while expanding a templated link.
    pub fn is_binding_error(&self) -> bool {
        matches!(self, Error::MissingTemplateVariable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = Error::NoMapping {
            handler: "PersonController".to_string(),
            method: "show".to_string(),
        };
        assert!(err.is_configuration_error());
        assert!(!err.is_binding_error());

        let err = Error::MissingTemplateVariable("id".to_string());
        assert!(err.is_binding_error());
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = Error::NoMapping {
            handler: "PersonController".to_string(),
            method: "show".to_string(),
        };
        assert_eq!(err.to_string(), "No mapping found for PersonController::show");

        let err = Error::MissingTemplateVariable("limit".to_string());
        assert!(err.to_string().contains("limit"));
    }
}
