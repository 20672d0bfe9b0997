//! Error types for ldaptx core.

use ldaptx_codec::{CodecError, Dn};
use ldaptx_conn::ConnError;
use std::fmt;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Which attribute-level conflict a modify ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A value being added is already present.
    TypeOrValueExists,
    /// A value or attribute being removed is absent.
    NoSuchAttribute,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TypeOrValueExists => "type or value exists",
            Self::NoSuchAttribute => "no such attribute",
        })
    }
}

/// Which transaction call was made in the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStateKind {
    /// `begin` while a transaction is open.
    AlreadyInTransaction,
    /// `commit`, `rollback` or `leave` with no open transaction.
    NotInTransaction,
    /// `leave` while undo entries are pending.
    DirtyTransaction,
}

impl fmt::Display for TxnStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyInTransaction => "already in a transaction",
            Self::NotInTransaction => "not in a transaction",
            Self::DirtyTransaction => "transaction has uncommitted changes; commit or roll back",
        })
    }
}

/// Errors that can occur in core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed name or filter, or a filter naming an unknown attribute.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The entry does not exist, locally or remotely.
    #[error("entry not found: {dn}")]
    NotFound {
        /// Requested name.
        dn: String,
    },

    /// The entry already has live state.
    #[error("entry already exists: {dn}")]
    AlreadyExists {
        /// Requested name.
        dn: String,
    },

    /// A modify conflicts with the entry's current values.
    #[error("{kind} on {dn}: {detail}")]
    AttributeConflict {
        /// Target entry.
        dn: String,
        /// Kind of conflict.
        kind: ConflictKind,
        /// Attribute name, or the server's diagnostic.
        detail: String,
    },

    /// A transaction call was made in the wrong state.
    #[error("transaction state error: {kind}")]
    TransactionState {
        /// What went wrong.
        kind: TxnStateKind,
    },

    /// An undo statement failed during rollback. The cache has been flushed
    /// but the remote store may hold partially reverted state.
    #[error("rollback failed at `{statement}`: {reason}; manual intervention may be required")]
    UnrecoverableRollback {
        /// The undo statement that failed.
        statement: String,
        /// Why it failed.
        reason: String,
    },

    /// The remote store returned data that breaks an invariant.
    #[error("consistency error: {message}")]
    Consistency {
        /// Description of the inconsistency.
        message: String,
    },

    /// Operation not permitted for this input.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Any other failure of the connection, after its own retry.
    #[error("transport error: {0}")]
    Transport(ConnError),
}

impl CoreError {
    /// Creates a not-found error.
    pub fn not_found(dn: &Dn) -> Self {
        Self::NotFound { dn: dn.to_string() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(dn: &Dn) -> Self {
        Self::AlreadyExists { dn: dn.to_string() }
    }

    /// Creates an attribute conflict error.
    pub fn conflict(dn: &Dn, kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::AttributeConflict {
            dn: dn.to_string(),
            kind,
            detail: detail.into(),
        }
    }

    /// Creates a transaction state error.
    pub fn state(kind: TxnStateKind) -> Self {
        Self::TransactionState { kind }
    }

    /// Creates a consistency error.
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Whether this is [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The conflict kind, if this is an attribute conflict.
    #[must_use]
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            Self::AttributeConflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The transaction state kind, if this is a state error.
    #[must_use]
    pub fn state_kind(&self) -> Option<TxnStateKind> {
        match self {
            Self::TransactionState { kind } => Some(*kind),
            _ => None,
        }
    }
}

impl From<ConnError> for CoreError {
    fn from(err: ConnError) -> Self {
        match err {
            ConnError::NoSuchObject { dn } => Self::NotFound { dn },
            ConnError::AlreadyExists { dn } => Self::AlreadyExists { dn },
            ConnError::AttributeOrValueExists { dn, message } => Self::AttributeConflict {
                dn,
                kind: ConflictKind::TypeOrValueExists,
                detail: message,
            },
            ConnError::NoSuchAttribute { dn, message } => Self::AttributeConflict {
                dn,
                kind: ConflictKind::NoSuchAttribute,
                detail: message,
            },
            ConnError::Codec(err) => Self::Codec(err),
            other => Self::Transport(other),
        }
    }
}
