//! Privacy Engine Error Types

use thiserror::Error;
use veilchat_extract::ExtractError;

/// Fatal errors surfaced to the caller.
///
/// Per-pattern and per-chunk failures are recovered locally (rejected
/// patterns are reported alongside the registry, failed chunks degrade the
/// outcome); only resource-level failures end up here.
#[derive(Debug, Error)]
pub enum PrivacyError {
    /// The content kind has no available extractor. The caller chooses the
    /// fallback: reinterpret as plain text, or skip scanning with a warning.
    #[error("unsupported content format: {0}")]
    UnsupportedFormat(String),

    /// The content could not be linearized into text.
    #[error("content extraction failed: {0}")]
    Extraction(String),
}

impl PrivacyError {
    /// True when the caller can recover by falling back to plain text.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, PrivacyError::UnsupportedFormat(_))
    }
}

impl From<ExtractError> for PrivacyError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::UnsupportedFormat(msg) => PrivacyError::UnsupportedFormat(msg),
            other => PrivacyError::Extraction(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_maps_to_recoverable_variant() {
        let err: PrivacyError = ExtractError::UnsupportedFormat("no pdf support".into()).into();
        assert!(err.is_unsupported_format());

        let err: PrivacyError = ExtractError::Pdf("broken xref table".into()).into();
        assert!(!err.is_unsupported_format());
    }
}
