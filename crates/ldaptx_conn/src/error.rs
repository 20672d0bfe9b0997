//! Error types for directory sessions.

use ldaptx_codec::CodecError;
use thiserror::Error;

/// Result type for connection operations.
pub type ConnResult<T> = Result<T, ConnError>;

/// Protocol result codes this crate maps to dedicated variants.
pub mod result_code {
    /// Size limit exceeded; results up to the limit are still valid.
    pub const SIZE_LIMIT_EXCEEDED: u32 = 4;
    /// Constraint violation.
    pub const CONSTRAINT_VIOLATION: u32 = 19;
    /// Attribute or value exists.
    pub const ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
    /// No such attribute.
    pub const NO_SUCH_ATTRIBUTE: u32 = 16;
    /// No such object.
    pub const NO_SUCH_OBJECT: u32 = 32;
    /// Invalid credentials.
    pub const INVALID_CREDENTIALS: u32 = 49;
    /// Unwilling to perform.
    pub const UNWILLING_TO_PERFORM: u32 = 53;
    /// Naming violation.
    pub const NAMING_VIOLATION: u32 = 64;
    /// Object class violation.
    pub const OBJECT_CLASS_VIOLATION: u32 = 65;
    /// Not allowed on non-leaf.
    pub const NOT_ALLOWED_ON_NON_LEAF: u32 = 66;
    /// Not allowed on RDN.
    pub const NOT_ALLOWED_ON_RDN: u32 = 67;
    /// Entry already exists.
    pub const ALREADY_EXISTS: u32 = 68;
    /// Client-side: server down / session lost.
    pub const SERVER_DOWN: u32 = 81;
}

/// Errors surfaced by a directory session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnError {
    /// The named entry does not exist.
    #[error("no such object: {dn}")]
    NoSuchObject {
        /// Target of the failed request.
        dn: String,
    },

    /// An entry with this name already exists.
    #[error("entry already exists: {dn}")]
    AlreadyExists {
        /// Target of the failed request.
        dn: String,
    },

    /// A value being added is already present.
    #[error("attribute or value exists on {dn}: {message}")]
    AttributeOrValueExists {
        /// Target of the failed request.
        dn: String,
        /// Server diagnostic.
        message: String,
    },

    /// A value or attribute being removed is absent.
    #[error("no such attribute on {dn}: {message}")]
    NoSuchAttribute {
        /// Target of the failed request.
        dn: String,
        /// Server diagnostic.
        message: String,
    },

    /// Bind rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Delete or rename of an entry that still has children.
    #[error("operation not allowed on non-leaf entry: {dn}")]
    NotAllowedOnNonLeaf {
        /// Target of the failed request.
        dn: String,
    },

    /// The server closed the session.
    #[error("session terminated: {message}")]
    SessionTerminated {
        /// What was observed.
        message: String,
    },

    /// Any other non-success result code.
    #[error("protocol error {code} on {dn}: {message}")]
    Protocol {
        /// Result code.
        code: u32,
        /// Target of the failed request.
        dn: String,
        /// Server diagnostic.
        message: String,
    },

    /// Failure below the protocol layer (connect, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// Settings could not be read or are invalid.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// The server could not evaluate a filter.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Malformed name or filter text.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl ConnError {
    /// Maps a non-success result code to an error.
    pub fn from_result_code(code: u32, dn: impl Into<String>, message: impl Into<String>) -> Self {
        let dn = dn.into();
        let message = message.into();
        match code {
            result_code::NO_SUCH_OBJECT => Self::NoSuchObject { dn },
            result_code::ALREADY_EXISTS => Self::AlreadyExists { dn },
            result_code::ATTRIBUTE_OR_VALUE_EXISTS => Self::AttributeOrValueExists { dn, message },
            result_code::NO_SUCH_ATTRIBUTE => Self::NoSuchAttribute { dn, message },
            result_code::INVALID_CREDENTIALS => Self::InvalidCredentials,
            result_code::NOT_ALLOWED_ON_NON_LEAF => Self::NotAllowedOnNonLeaf { dn },
            result_code::SERVER_DOWN => Self::SessionTerminated { message },
            code => Self::Protocol { code, dn, message },
        }
    }

    /// Creates a session-terminated error.
    pub fn terminated(message: impl Into<String>) -> Self {
        Self::SessionTerminated {
            message: message.into(),
        }
    }

    /// Whether the session is gone and a reconnect may help.
    #[must_use]
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::SessionTerminated { .. })
    }

    /// The protocol result code this error corresponds to, if any.
    #[must_use]
    pub fn result_code(&self) -> Option<u32> {
        match self {
            Self::NoSuchObject { .. } => Some(result_code::NO_SUCH_OBJECT),
            Self::AlreadyExists { .. } => Some(result_code::ALREADY_EXISTS),
            Self::AttributeOrValueExists { .. } => Some(result_code::ATTRIBUTE_OR_VALUE_EXISTS),
            Self::NoSuchAttribute { .. } => Some(result_code::NO_SUCH_ATTRIBUTE),
            Self::InvalidCredentials => Some(result_code::INVALID_CREDENTIALS),
            Self::NotAllowedOnNonLeaf { .. } => Some(result_code::NOT_ALLOWED_ON_NON_LEAF),
            Self::SessionTerminated { .. } => Some(result_code::SERVER_DOWN),
            Self::Protocol { code, .. } => Some(*code),
            Self::Transport(_) | Self::Settings(_) | Self::InvalidFilter(_) | Self::Codec(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_codes() {
        assert_eq!(
            ConnError::from_result_code(32, "uid=x", ""),
            ConnError::NoSuchObject { dn: "uid=x".into() }
        );
        assert_eq!(
            ConnError::from_result_code(49, "uid=x", "bad"),
            ConnError::InvalidCredentials
        );
        assert!(ConnError::from_result_code(81, "", "gone").is_session_loss());
    }

    #[test]
    fn unknown_codes_keep_their_number() {
        let err = ConnError::from_result_code(53, "uid=x", "unwilling");
        assert_eq!(err.result_code(), Some(53));
        assert!(!err.is_session_loss());
        assert!(err.to_string().contains("unwilling"));
    }

    #[test]
    fn codes_round_trip() {
        for code in [16, 20, 32, 49, 66, 68, 81] {
            assert_eq!(
                ConnError::from_result_code(code, "", "").result_code(),
                Some(code)
            );
        }
    }
}
