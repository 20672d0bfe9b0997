//! A reconnecting wrapper around one directory session.

use crate::error::{ConnError, ConnResult};
use crate::session::{DirectorySession, SearchRequest, SessionFactory};
use crate::settings::Secret;
use ldaptx_codec::{AttributeSet, Dn, Entry, Modification, Rdn};
use tracing::{debug, warn};

/// Owns one session at a time and the credentials to re-establish it.
///
/// The session is opened and bound lazily on first use. When a request fails
/// because the server dropped the session, the connection reconnects, binds
/// again and retries that request exactly once.
pub struct Connection {
    factory: Box<dyn SessionFactory>,
    credentials: Option<(Dn, Secret)>,
    session: Option<Box<dyn DirectorySession>>,
    reconnects: u64,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("bind_dn", &self.credentials.as_ref().map(|(dn, _)| dn.to_string()))
            .field("connected", &self.session.is_some())
            .field("reconnects", &self.reconnects)
            .finish()
    }
}

impl Connection {
    /// Creates an anonymous connection. No session is opened yet.
    pub fn new(factory: impl SessionFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            credentials: None,
            session: None,
            reconnects: 0,
        }
    }

    /// Sets the identity every new session binds as.
    #[must_use]
    pub fn with_credentials(mut self, dn: Dn, secret: impl Into<Secret>) -> Self {
        self.credentials = Some((dn, secret.into()));
        self
    }

    /// Binds the current session and remembers the identity for reconnects.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::InvalidCredentials`] if the server rejects the
    /// credentials; the previous identity is kept in that case.
    pub fn bind(&mut self, dn: &Dn, secret: &[u8]) -> ConnResult<()> {
        self.call("bind", |session| session.bind(dn, secret))?;
        self.credentials = Some((dn.clone(), Secret::from(secret)));
        Ok(())
    }

    /// Creates an entry.
    ///
    /// # Errors
    ///
    /// Propagates the server's refusal.
    pub fn add_raw(&mut self, dn: &Dn, attributes: &AttributeSet) -> ConnResult<()> {
        debug!(dn = %dn, "add");
        self.call("add", |session| session.add(dn, attributes))
    }

    /// Modifies an entry.
    ///
    /// # Errors
    ///
    /// Propagates the server's refusal.
    pub fn modify_raw(&mut self, dn: &Dn, changes: &[Modification]) -> ConnResult<()> {
        debug!(dn = %dn, changes = changes.len(), "modify");
        self.call("modify", |session| session.modify(dn, changes))
    }

    /// Deletes a leaf entry.
    ///
    /// # Errors
    ///
    /// Propagates the server's refusal.
    pub fn delete_raw(&mut self, dn: &Dn) -> ConnResult<()> {
        debug!(dn = %dn, "delete");
        self.call("delete", |session| session.delete(dn))
    }

    /// Renames or moves an entry.
    ///
    /// # Errors
    ///
    /// Propagates the server's refusal.
    pub fn rename_raw(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> ConnResult<()> {
        debug!(dn = %dn, new_rdn = %new_rdn, "rename");
        self.call("rename", |session| session.rename(dn, new_rdn, new_parent))
    }

    /// Runs a search.
    ///
    /// # Errors
    ///
    /// Propagates the server's refusal, including
    /// [`ConnError::NoSuchObject`] for a missing base.
    pub fn search_raw(&mut self, request: &SearchRequest) -> ConnResult<Vec<Entry>> {
        debug!(base = %request.base, scope = %request.scope, filter = %request.filter, "search");
        self.call("search", |session| session.search(request))
    }

    /// Verifies a password by binding a separate, short-lived session.
    ///
    /// Returns `false` for rejected credentials and for an empty secret,
    /// which servers would otherwise accept as an anonymous bind. The
    /// connection's own session and cache-facing state are not touched.
    ///
    /// # Errors
    ///
    /// Returns any failure other than rejected credentials.
    pub fn check_password(&self, dn: &Dn, secret: &[u8]) -> ConnResult<bool> {
        if secret.is_empty() {
            return Ok(false);
        }
        let mut session = self.factory.connect()?;
        let verdict = match session.bind(dn, secret) {
            Ok(()) => true,
            Err(ConnError::InvalidCredentials) => false,
            Err(err) => return Err(err),
        };
        if let Err(err) = session.unbind() {
            debug!(error = %err, "unbind after password check failed");
        }
        Ok(verdict)
    }

    /// Unbinds and drops the current session, if any.
    ///
    /// # Errors
    ///
    /// Propagates a failed unbind; the session is dropped regardless.
    pub fn close(&mut self) -> ConnResult<()> {
        match self.session.take() {
            Some(mut session) => session.unbind(),
            None => Ok(()),
        }
    }

    /// Whether a session is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// How many times the session was re-established after a loss.
    #[must_use]
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    fn open(&self) -> ConnResult<Box<dyn DirectorySession>> {
        let mut session = self.factory.connect()?;
        if let Some((dn, secret)) = &self.credentials {
            session.bind(dn, secret.expose())?;
        }
        Ok(session)
    }

    fn session(&mut self) -> ConnResult<&mut dyn DirectorySession> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.open()?,
        };
        Ok(&mut **self.session.insert(session))
    }

    fn call<T>(
        &mut self,
        operation: &'static str,
        mut request: impl FnMut(&mut dyn DirectorySession) -> ConnResult<T>,
    ) -> ConnResult<T> {
        match request(self.session()?) {
            Err(err) if err.is_session_loss() => {
                warn!(operation, error = %err, "session lost, reconnecting");
                self.session = None;
                self.reconnects += 1;
                request(self.session()?)
            }
            result => result,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "unbind on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryDirectory, OperationKind};
    use ldaptx_codec::Scope;

    fn directory() -> InMemoryDirectory {
        let dir = InMemoryDirectory::new()
            .with_naming_context(Dn::parse("dc=example,dc=org").unwrap())
            .with_admin(Dn::parse("cn=admin,dc=example,dc=org").unwrap(), "admin");
        dir.seed(
            Dn::parse("dc=example,dc=org").unwrap(),
            AttributeSet::new()
                .with("objectClass", ["dcObject", "organization"])
                .with("o", ["Example"]),
        )
        .unwrap();
        dir.seed(
            Dn::parse("uid=tux,dc=example,dc=org").unwrap(),
            AttributeSet::new()
                .with("objectClass", ["inetOrgPerson"])
                .with("sn", ["Torvalds"])
                .with("userPassword", ["penguin"]),
        )
        .unwrap();
        dir
    }

    fn admin_connection(dir: &InMemoryDirectory) -> Connection {
        Connection::new(dir.clone())
            .with_credentials(Dn::parse("cn=admin,dc=example,dc=org").unwrap(), "admin")
    }

    #[test]
    fn binds_lazily() {
        let dir = directory();
        let mut conn = admin_connection(&dir);
        assert!(!conn.is_connected());
        assert_eq!(dir.stats().binds, 0);

        let request =
            SearchRequest::new(Dn::parse("dc=example,dc=org").unwrap(), Scope::Subtree, "(sn=*)");
        let entries = conn.search_raw(&request).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(conn.is_connected());
        assert_eq!(dir.stats().binds, 1);
    }

    #[test]
    fn reconnects_once_after_session_loss() {
        let dir = directory();
        let mut conn = admin_connection(&dir);
        let dn = Dn::parse("uid=tux,dc=example,dc=org").unwrap();
        conn.modify_raw(&dn, &[Modification::add("mail", ["tux@example.org"])])
            .unwrap();

        dir.terminate_sessions();
        conn.modify_raw(&dn, &[Modification::add("mail", ["t@example.org"])])
            .unwrap();

        assert_eq!(conn.reconnects(), 1);
        assert_eq!(dir.stats().binds, 2);
        assert_eq!(dir.entry(&dn).unwrap().get("mail").unwrap().len(), 2);
    }

    #[test]
    fn second_session_loss_surfaces() {
        let dir = directory();
        let mut conn = admin_connection(&dir);
        let dn = Dn::parse("uid=tux,dc=example,dc=org").unwrap();
        dir.fail_next(OperationKind::Delete, ConnError::terminated("gone"));
        dir.fail_next(OperationKind::Delete, ConnError::terminated("gone again"));

        let err = conn.delete_raw(&dn).unwrap_err();
        assert!(err.is_session_loss());
        assert_eq!(conn.reconnects(), 1);
        assert!(dir.entry(&dn).is_some());
    }

    #[test]
    fn other_errors_are_not_retried() {
        let dir = directory();
        let mut conn = admin_connection(&dir);
        let missing = Dn::parse("uid=nobody,dc=example,dc=org").unwrap();
        let err = conn.delete_raw(&missing).unwrap_err();
        assert!(matches!(err, ConnError::NoSuchObject { .. }));
        assert_eq!(conn.reconnects(), 0);
        assert_eq!(dir.stats().deletes, 1);
    }

    #[test]
    fn check_password_uses_its_own_session() {
        let dir = directory();
        let conn = admin_connection(&dir);
        let dn = Dn::parse("uid=tux,dc=example,dc=org").unwrap();
        assert!(conn.check_password(&dn, b"penguin").unwrap());
        assert!(!conn.check_password(&dn, b"walrus").unwrap());
        assert!(!conn.check_password(&dn, b"").unwrap());
        assert!(!conn.is_connected());
    }

    #[test]
    fn failed_bind_keeps_identity() {
        let dir = directory();
        let mut conn = admin_connection(&dir);
        let dn = Dn::parse("uid=tux,dc=example,dc=org").unwrap();
        assert_eq!(conn.bind(&dn, b"wrong"), Err(ConnError::InvalidCredentials));
        conn.bind(&dn, b"penguin").unwrap();
    }
}
