/// Domain-specific error types for veritext
///
/// The taxonomy is intentionally narrow: bad input and broken ontology
/// documents surface at the HTTP boundary; everything inside the
/// extraction/derivation/constraint pipeline fails soft and never
/// propagates an error to the caller.

#[derive(Debug, thiserror::Error)]
pub enum VeritextError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid ontology '{name}': {reason}")]
    OntologyInvalid { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VeritextError {
    /// Helper to create validation errors with field names
    pub fn validation(field: &str, message: &str) -> Self {
        VeritextError::Validation {
            message: message.to_string(),
            field: Some(field.to_string()),
        }
    }
}
