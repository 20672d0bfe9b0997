//! Session trait definitions.

use crate::error::ConnResult;
use ldaptx_codec::{AttributeSet, Dn, Entry, Modification, Rdn, Scope};

/// One search request as sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base.
    pub base: Dn,
    /// How far below the base to look.
    pub scope: Scope,
    /// RFC 4515 filter string.
    pub filter: String,
    /// Attributes to return. Empty means all user attributes; `*` and `+`
    /// select all user and all operational attributes.
    pub attributes: Vec<String>,
    /// Maximum number of entries the server should return.
    pub size_limit: Option<usize>,
}

impl SearchRequest {
    /// Creates a request returning all user attributes with no size limit.
    pub fn new(base: Dn, scope: Scope, filter: impl Into<String>) -> Self {
        Self {
            base,
            scope,
            filter: filter.into(),
            attributes: Vec::new(),
            size_limit: None,
        }
    }

    /// Sets the requested attributes.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the size limit.
    #[must_use]
    pub fn with_size_limit(mut self, limit: Option<usize>) -> Self {
        self.size_limit = limit;
        self
    }
}

/// An open protocol session with a directory server.
///
/// Each method is a direct pass-through to one protocol request. Sessions
/// hold no client-side state besides the bind identity.
///
/// # Implementors
///
/// - [`crate::LdapSession`] - a network session over `ldap3`
/// - sessions handed out by [`crate::InMemoryDirectory`] - for testing
pub trait DirectorySession: Send {
    /// Authenticates the session with a simple bind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConnError::InvalidCredentials`] if the server rejects
    /// the credentials.
    fn bind(&mut self, dn: &Dn, secret: &[u8]) -> ConnResult<()>;

    /// Creates an entry.
    fn add(&mut self, dn: &Dn, attributes: &AttributeSet) -> ConnResult<()>;

    /// Applies a list of modifications to an entry, atomically on the server.
    fn modify(&mut self, dn: &Dn, changes: &[Modification]) -> ConnResult<()>;

    /// Removes a leaf entry.
    fn delete(&mut self, dn: &Dn) -> ConnResult<()>;

    /// Renames or moves an entry. The old naming values are removed.
    fn rename(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> ConnResult<()>;

    /// Runs a search and collects every returned entry.
    ///
    /// Reaching the size limit is not an error; the entries up to the limit
    /// are returned.
    fn search(&mut self, request: &SearchRequest) -> ConnResult<Vec<Entry>>;

    /// Ends the session.
    fn unbind(&mut self) -> ConnResult<()>;
}

/// Opens new sessions, for the initial connect and for reconnects.
pub trait SessionFactory: Send + Sync {
    /// Opens a new, unauthenticated session.
    fn connect(&self) -> ConnResult<Box<dyn DirectorySession>>;
}

impl<F: SessionFactory + ?Sized> SessionFactory for std::sync::Arc<F> {
    fn connect(&self) -> ConnResult<Box<dyn DirectorySession>> {
        (**self).connect()
    }
}
