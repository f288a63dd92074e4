//! Error taxonomy for the audit pipeline.
//!
//! Three terminal kinds: a resource that could not be located through any
//! source (`NotFound`), an unexpected fault in a step that should not fail
//! (`Internal`), and an external analysis that produced no usable output
//! (`Analysis`). Soft failures inside the rule-fetch fallback chain are not
//! errors; they are logged at debug level and the next source is tried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// A requested resource does not exist or could not be located.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Unexpected failure (transport, auth, filesystem write).
    #[error("Internal Error: {0}")]
    Internal(String),

    /// The external analysis capability produced no valid output.
    #[error("Failed to audit rules: {0}")]
    Analysis(String),
}

impl AuditError {
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        AuditError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_resource_and_id() {
        let err = AuditError::not_found("Firestore security rules", "my-project");
        assert_eq!(
            err.to_string(),
            "Firestore security rules not found: my-project"
        );
    }

    #[test]
    fn internal_message_is_prefixed() {
        let err = AuditError::Internal("disk full".into());
        assert_eq!(err.to_string(), "Internal Error: disk full");
    }
}
