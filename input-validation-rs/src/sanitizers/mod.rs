//! Output sanitization utilities
//!
//! This module provides sanitization functions applied to data on its way
//! out of the service.

pub mod html;

// Re-export all sanitizers for convenience
pub use html::*;

/// Sanitization result containing the sanitized content and information
/// about whether changes were made during sanitization
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeResult<T> {
    /// Sanitized content
    pub sanitized: T,
    /// Whether any changes were made during sanitization
    pub was_modified: bool,
    /// Optional details about what was modified
    pub details: Option<String>,
}

impl<T> SanitizeResult<T> {
    /// Create a result with unmodified content
    pub fn unmodified(content: T) -> Self {
        Self {
            sanitized: content,
            was_modified: false,
            details: None,
        }
    }

    /// Create a result with modified content
    pub fn modified(content: T, details: Option<String>) -> Self {
        Self {
            sanitized: content,
            was_modified: true,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_result() {
        let unmodified = SanitizeResult::unmodified("test");
        assert!(!unmodified.was_modified);
        assert_eq!(unmodified.sanitized, "test");
        assert_eq!(unmodified.details, None);

        let modified = SanitizeResult::modified("test_sanitized", Some("removed unsafe chars".to_string()));
        assert!(modified.was_modified);
        assert_eq!(modified.sanitized, "test_sanitized");
        assert_eq!(modified.details, Some("removed unsafe chars".to_string()));
    }
}
