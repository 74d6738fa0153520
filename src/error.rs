//! Errors reported to the host.

use thiserror::Error;

/// Configuration errors raised while populating a director.
///
/// These leave the pool untouched; the host decides whether they are fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectorError {
    /// The referenced backend does not exist (any more).
    #[error("{director}: NULL backend cannot be added")]
    NullBackend { director: String },

    /// A director or other composite target was passed where a backend is required.
    #[error("{director}: Directors are not supported as backends, only vanilla backends (got {target})")]
    NotABackend { director: String, target: String },
}

impl DirectorError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DirectorError::NullBackend { .. } => "null_backend",
            DirectorError::NotABackend { .. } => "composite_target",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DirectorError::NullBackend {
            director: "web".into(),
        };
        assert_eq!(err.to_string(), "web: NULL backend cannot be added");

        let err = DirectorError::NotABackend {
            director: "web".into(),
            target: "api".into(),
        };
        assert!(err.to_string().contains("only vanilla backends"));
        assert_eq!(err.reason(), "composite_target");
    }
}
