//! Directory handle.

use crate::cache::{add_naming_values, CacheState, ShadowCache};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::reversal::{apply_modifications, reverse_add, reverse_delete, reverse_rename};
use crate::search::{self, SearchQuery, SearchResults};
use crate::statement::Statement;
use crate::transaction::{PendingAction, TransactionManager};
use ldaptx_codec::{AttributeSet, Dn, Entry, Filter, Modification, Rdn, Scope};
use ldaptx_conn::{ConnError, Connection, SearchRequest};
use tracing::{debug, error};

/// The main directory handle.
///
/// `Directory` owns one [`Connection`], the shadow cache and the
/// transaction manager. Every mutation is checked against the cached state
/// of its target, sent to the server immediately, and recorded for undo
/// while a transaction is open.
///
/// Outside a transaction each operation is its own auto-committed unit.
///
/// # Example
///
/// ```rust
/// use ldaptx_codec::{AttributeSet, Dn, Modification};
/// use ldaptx_conn::{Connection, InMemoryDirectory};
/// use ldaptx_core::Directory;
///
/// let server = InMemoryDirectory::new().with_naming_context(Dn::parse("dc=example,dc=org")?);
/// server.seed(Dn::parse("dc=example,dc=org")?, AttributeSet::new())?;
///
/// let mut dir = Directory::new(Connection::new(server.clone()));
/// let tux = Dn::parse("uid=tux,dc=example,dc=org")?;
///
/// dir.transaction(|dir| {
///     dir.add(&tux, AttributeSet::new().with("sn", ["Torvalds"]))?;
///     dir.modify(&tux, &[Modification::add("mail", ["tux@example.org"])])
/// })?;
/// assert!(server.contains(&tux));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Directory {
    conn: Connection,
    txn: TransactionManager,
    config: Config,
}

impl Directory {
    /// Creates a handle with the default configuration.
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self::with_config(conn, Config::default())
    }

    /// Creates a handle with a custom configuration.
    #[must_use]
    pub fn with_config(conn: Connection, config: Config) -> Self {
        let cache = ShadowCache::new(config.autoflush);
        Self {
            conn,
            txn: TransactionManager::new(cache),
            config,
        }
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The underlying connection, mutably.
    ///
    /// Requests sent through it bypass the cache and the undo log.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shadow cache.
    #[must_use]
    pub fn cache(&self) -> &ShadowCache {
        self.txn.cache()
    }

    /// Creates an entry. Naming values missing from `attributes` are added.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if the entry is cached as present
    /// or the server already holds it.
    pub fn add(&mut self, dn: &Dn, attributes: AttributeSet) -> CoreResult<()> {
        let result = self.add_entry(dn, attributes);
        self.finish(result)
    }

    /// Applies `changes` to an entry, in order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for a missing entry and
    /// [`CoreError::AttributeConflict`] when a change conflicts with the
    /// entry's current values. Conflicts are detected before anything is
    /// sent.
    pub fn modify(&mut self, dn: &Dn, changes: &[Modification]) -> CoreResult<()> {
        let result = self.modify_entry(dn, changes);
        self.finish(result)
    }

    /// Deletes a leaf entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for a missing entry.
    pub fn delete(&mut self, dn: &Dn) -> CoreResult<()> {
        let result = self.delete_entry(dn);
        self.finish(result)
    }

    /// Renames an entry to `new_rdn`, moving it under `new_parent` if given.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for a missing entry and
    /// [`CoreError::AlreadyExists`] if the new name is taken.
    pub fn rename(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> CoreResult<()> {
        let result = self.rename_entry(dn, new_rdn, new_parent);
        self.finish(result)
    }

    /// Searches below `base`, seeing this handle's own uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if `base` does not exist.
    pub fn search(
        &mut self,
        base: &Dn,
        scope: Scope,
        filter: &Filter,
        attributes: &[&str],
        limit: Option<usize>,
    ) -> CoreResult<SearchResults> {
        let query = SearchQuery::new(base.clone(), scope, filter.clone())
            .with_attributes(attributes.iter().copied())
            .with_limit(limit);
        self.query(&query)
    }

    /// Runs a prepared [`SearchQuery`].
    ///
    /// # Errors
    ///
    /// Same as [`Directory::search`].
    pub fn query(&mut self, query: &SearchQuery) -> CoreResult<SearchResults> {
        let result = search::search(
            &mut self.conn,
            self.txn.cache(),
            query,
            &self.config.strip_attributes,
        );
        self.finish(result)
    }

    /// The believed attributes of one entry, loading them if needed.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn get(&mut self, dn: &Dn) -> CoreResult<Option<AttributeSet>> {
        let result = self.load(dn).map(|attrs| attrs.cloned());
        self.finish(result)
    }

    /// Verifies a password by binding on a separate session. The cache is
    /// not consulted.
    ///
    /// # Errors
    ///
    /// Propagates transport failures other than rejected credentials.
    pub fn check_password(&self, dn: &Dn, secret: &[u8]) -> CoreResult<bool> {
        Ok(self.conn.check_password(dn, secret)?)
    }

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Fails if a transaction is already open.
    pub fn begin_transaction(&mut self) -> CoreResult<()> {
        self.txn.begin()
    }

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Fails if no transaction is open.
    pub fn commit(&mut self) -> CoreResult<()> {
        self.txn.commit()
    }

    /// Rolls back the open transaction.
    ///
    /// # Errors
    ///
    /// Fails if no transaction is open, or with
    /// [`CoreError::UnrecoverableRollback`] if an undo statement failed.
    pub fn rollback(&mut self) -> CoreResult<()> {
        self.txn.rollback(&mut self.conn)
    }

    /// Closes a transaction without committing or rolling back.
    ///
    /// # Errors
    ///
    /// Fails with a dirty-transaction error if statements are pending; the
    /// transaction then stays open.
    pub fn leave_transaction(&mut self) -> CoreResult<()> {
        self.txn.leave()
    }

    /// Executes `f` within a transaction.
    ///
    /// If `f` returns `Ok`, the transaction is committed. If it returns
    /// `Err`, the transaction is rolled back and the error is returned,
    /// unless the rollback itself fails, in which case the rollback error
    /// wins.
    ///
    /// # Errors
    ///
    /// Fails if a transaction is already open, or with the error of `f` or
    /// of the rollback.
    pub fn transaction<F, T>(&mut self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Self) -> CoreResult<T>,
    {
        self.begin_transaction()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "transaction body failed; rolling back");
                match self.rollback() {
                    Ok(()) => Err(err),
                    Err(rollback_err) => {
                        error!(error = %err, "original error lost to failed rollback");
                        Err(rollback_err)
                    }
                }
            }
        }
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn is_transaction_open(&self) -> bool {
        self.txn.is_open()
    }

    /// Drops everything cached.
    pub fn flush_cache(&mut self) {
        self.txn.cache_mut().flush(true);
    }

    fn add_entry(&mut self, dn: &Dn, mut attributes: AttributeSet) -> CoreResult<()> {
        if let CacheState::Present(_) = self.txn.cache().state(dn) {
            return Err(CoreError::already_exists(dn));
        }
        if let Some(rdn) = dn.rdn() {
            add_naming_values(&mut attributes, rdn);
        }
        let forward = Statement::Add {
            dn: dn.clone(),
            attributes: attributes.clone(),
        };
        self.txn
            .statement(&mut self.conn, PendingAction::new(forward, reverse_add(dn)))?;
        *self.txn.cache_mut().create(dn)? = attributes;
        Ok(())
    }

    fn modify_entry(&mut self, dn: &Dn, changes: &[Modification]) -> CoreResult<()> {
        let pre = self.load_present(dn)?;
        let (post, reverse) = apply_modifications(dn, &pre, changes)?;
        let action = PendingAction::new(
            Statement::Modify {
                dn: dn.clone(),
                changes: changes.to_vec(),
            },
            Statement::Modify {
                dn: dn.clone(),
                changes: reverse,
            },
        );
        self.txn.statement(&mut self.conn, action)?;
        self.txn.cache_mut().update(dn, post);
        Ok(())
    }

    fn delete_entry(&mut self, dn: &Dn) -> CoreResult<()> {
        let pre = self.load_present(dn)?;
        let reverse = reverse_delete(dn, &pre, &self.config.strip_attributes);
        let action = PendingAction::new(Statement::Delete { dn: dn.clone() }, reverse);
        self.txn.statement(&mut self.conn, action)?;
        self.txn.cache_mut().delete(dn);
        Ok(())
    }

    fn rename_entry(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> CoreResult<()> {
        self.load_present(dn)?;
        let (new_dn, reverse) = reverse_rename(dn, new_rdn, new_parent)?;
        if new_dn != *dn {
            if let CacheState::Present(_) = self.txn.cache().state(&new_dn) {
                return Err(CoreError::already_exists(&new_dn));
            }
        }
        let forward = Statement::Rename {
            dn: dn.clone(),
            new_rdn: new_rdn.clone(),
            new_parent: new_parent.cloned(),
        };
        self.txn
            .statement(&mut self.conn, PendingAction::new(forward, reverse))?;
        self.txn.cache_mut().rename(dn, &new_dn)
    }

    fn load(&mut self, dn: &Dn) -> CoreResult<Option<&mut AttributeSet>> {
        let conn = &mut self.conn;
        self.txn
            .cache_mut()
            .get_or_load(dn, |dn| load_entry(conn, dn))
    }

    fn load_present(&mut self, dn: &Dn) -> CoreResult<AttributeSet> {
        match self.load(dn)? {
            Some(attrs) => Ok(attrs.clone()),
            None => Err(CoreError::not_found(dn)),
        }
    }

    fn finish<T>(&mut self, result: CoreResult<T>) -> CoreResult<T> {
        self.txn.autoflush();
        result
    }
}

/// One base-scope search for every attribute of `dn`. A missing entry is
/// an empty result.
fn load_entry(conn: &mut Connection, dn: &Dn) -> CoreResult<Vec<Entry>> {
    let request = SearchRequest::new(dn.clone(), Scope::Base, Filter::everything().to_wire())
        .with_attributes(["*", "+"]);
    match conn.search_raw(&request) {
        Ok(entries) => Ok(entries),
        Err(ConnError::NoSuchObject { .. }) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("connected", &self.conn.is_connected())
            .field("transaction", &self.txn.status())
            .field("undo_len", &self.txn.undo_len())
            .field("cached", &self.txn.cache().len())
            .finish_non_exhaustive()
    }
}
