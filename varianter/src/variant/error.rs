//! Error types for variant generation.

use thiserror::Error;

/// Errors that can occur while generating variants.
///
/// Generation is all-or-nothing: any of these means no variant set was
/// produced for the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    /// The request itself is unusable (no widths, zero or repeated width).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The source could not be fetched or read.
    #[error("Source unavailable: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    /// Decoding, encoding, or writing an output failed.
    #[error("Encoding failed: {0}")]
    EncodingFailure(String),
}

/// Tag identifying the kind of a [`VariantError`] without its details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariantErrorKind {
    InvalidConfiguration,
    SourceUnavailable,
    EncodingFailure,
}

impl VariantError {
    /// Builds a `SourceUnavailable` error for `locator`.
    pub fn source_unavailable(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Returns the kind tag of this error.
    pub fn kind(&self) -> VariantErrorKind {
        match self {
            Self::InvalidConfiguration(_) => VariantErrorKind::InvalidConfiguration,
            Self::SourceUnavailable { .. } => VariantErrorKind::SourceUnavailable,
            Self::EncodingFailure(_) => VariantErrorKind::EncodingFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_configuration() {
        let err = VariantError::InvalidConfiguration("no widths requested".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: no widths requested");
        assert_eq!(err.kind(), VariantErrorKind::InvalidConfiguration);
    }

    #[test]
    fn test_display_source_unavailable() {
        let err = VariantError::source_unavailable("/tmp/x.jpg", "file not found");
        assert_eq!(err.to_string(), "Source unavailable: file not found");
        assert_eq!(err.kind(), VariantErrorKind::SourceUnavailable);
    }

    #[test]
    fn test_display_encoding_failure() {
        let err = VariantError::EncodingFailure("bad huffman table".to_string());
        assert_eq!(err.to_string(), "Encoding failed: bad huffman table");
        assert_eq!(err.kind(), VariantErrorKind::EncodingFailure);
    }
}
