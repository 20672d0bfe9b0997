//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while parsing or translating names and filters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Malformed distinguished name or filter text.
    #[error("parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset of the offending input.
        offset: usize,
        /// Description of the problem.
        message: String,
    },

    /// A filter term referenced an attribute outside the supplied field set.
    #[error("unknown attribute: {name}")]
    UnknownAttribute {
        /// The attribute (field) name as written in the filter.
        name: String,
    },

    /// A relative name was expected to hold exactly one component.
    #[error("expected a single relative name component, found {count}")]
    NotASingleRdn {
        /// Number of components actually parsed.
        count: usize,
    },
}

impl CodecError {
    /// Create a parse error at the given byte offset.
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Create an unknown attribute error.
    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        Self::UnknownAttribute { name: name.into() }
    }

    /// Returns the offset of a parse error, if this is one.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Parse { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display_names_offset() {
        let err = CodecError::parse(7, "unterminated quoted value");
        assert_eq!(
            err.to_string(),
            "parse error at offset 7: unterminated quoted value"
        );
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn unknown_attribute_has_no_offset() {
        let err = CodecError::unknown_attribute("mail");
        assert_eq!(err.offset(), None);
        assert!(err.to_string().contains("mail"));
    }
}
