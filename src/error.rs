use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ConversionError
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Fatal errors that stop a conversion
///
/// Recoverable problems go to [`crate::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Malformed document or missing required field
    #[error("Malformed document: {0}")]
    Structural(String),

    /// Container parent references loop back on themselves
    #[error("Container hierarchy contains a cycle through '{0}'")]
    HierarchyCycle(String),

    /// Reading or writing a document failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    /// Create a structural error with a message
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Structural(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConversionError::structural("missing field `groups`");
        assert_eq!(err.to_string(), "Malformed document: missing field `groups`");

        let err = ConversionError::HierarchyCycle("walls".to_string());
        assert!(err.to_string().contains("'walls'"));

        let err = ConversionError::io(
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().starts_with("I/O error on /tmp/missing.json"));
    }

    #[test]
    fn test_from_json_error_is_structural() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ invalid").unwrap_err();
        let err: ConversionError = json_err.into();
        assert!(matches!(err, ConversionError::Structural(_)));
    }
}
