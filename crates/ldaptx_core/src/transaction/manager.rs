//! Transaction manager.

use crate::cache::ShadowCache;
use crate::error::{CoreError, CoreResult, TxnStateKind};
use crate::transaction::state::{PendingAction, TransactionStatus, UndoEntry};
use ldaptx_conn::Connection;
use std::collections::VecDeque;
use tracing::{debug, error};

/// Undo-log transaction manager.
///
/// Statements are sent to the server as soon as they are issued, so later
/// statements observe earlier ones. While a transaction is open, the
/// inverse of every successful statement is pushed to the front of the
/// undo log:
///
/// - `commit` discards the log without touching the server
/// - `rollback` replays the log front to back and is the only step that
///   can fail unrecoverably
///
/// A failed statement leaves the transaction open; the caller decides
/// whether to retry or roll back.
#[derive(Debug)]
pub struct TransactionManager {
    cache: ShadowCache,
    undo: Option<VecDeque<UndoEntry>>,
}

impl TransactionManager {
    /// Creates an idle manager owning `cache`.
    #[must_use]
    pub fn new(cache: ShadowCache) -> Self {
        Self { cache, undo: None }
    }

    /// The shadow cache.
    #[must_use]
    pub fn cache(&self) -> &ShadowCache {
        &self.cache
    }

    /// The shadow cache, mutably.
    pub fn cache_mut(&mut self) -> &mut ShadowCache {
        &mut self.cache
    }

    /// Current state.
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        if self.undo.is_some() {
            TransactionStatus::Open
        } else {
            TransactionStatus::Idle
        }
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.undo.is_some()
    }

    /// Number of statements that a rollback would undo.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.as_ref().map_or(0, VecDeque::len)
    }

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TxnStateKind::AlreadyInTransaction`] if one is open.
    pub fn begin(&mut self) -> CoreResult<()> {
        if self.is_open() {
            return Err(CoreError::state(TxnStateKind::AlreadyInTransaction));
        }
        self.undo = Some(VecDeque::new());
        self.cache.pin();
        debug!("transaction begin");
        Ok(())
    }

    /// Executes `action.forward` and, inside a transaction, records its
    /// inverse.
    ///
    /// # Errors
    ///
    /// Propagates the forward statement's failure. The transaction, if
    /// any, stays open.
    pub fn statement(&mut self, conn: &mut Connection, action: PendingAction) -> CoreResult<()> {
        action.forward.execute(conn)?;
        if let Some(undo) = self.undo.as_mut() {
            debug!(statement = %action.forward, depth = undo.len() + 1, "statement recorded");
            undo.push_front(UndoEntry::from(action));
        }
        Ok(())
    }

    /// Discards the undo log and closes the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TxnStateKind::NotInTransaction`] if none is open.
    pub fn commit(&mut self) -> CoreResult<()> {
        let undo = self.take_undo()?;
        debug!(statements = undo.len(), "transaction commit");
        self.cache.flush(false);
        Ok(())
    }

    /// Undoes every statement of the open transaction, newest first.
    ///
    /// The cache is force-flushed and the manager returns to idle whether or
    /// not the rollback succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TxnStateKind::NotInTransaction`] if none is open, or
    /// [`CoreError::UnrecoverableRollback`] at the first undo statement the
    /// server refuses. Later undo entries are not attempted.
    pub fn rollback(&mut self, conn: &mut Connection) -> CoreResult<()> {
        let undo = self.take_undo()?;
        debug!(statements = undo.len(), "transaction rollback");
        let result = Self::replay(conn, undo);
        self.cache.flush(true);
        result
    }

    /// Closes a transaction that has nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns [`TxnStateKind::NotInTransaction`] if none is open and
    /// [`TxnStateKind::DirtyTransaction`] if statements are pending. In the
    /// dirty case the cache is force-flushed but the transaction stays open
    /// for an explicit commit or rollback.
    pub fn leave(&mut self) -> CoreResult<()> {
        match self.undo.as_ref() {
            None => Err(CoreError::state(TxnStateKind::NotInTransaction)),
            Some(undo) if !undo.is_empty() => {
                debug!(statements = undo.len(), "leave with pending statements");
                self.cache.flush(true);
                Err(CoreError::state(TxnStateKind::DirtyTransaction))
            }
            Some(_) => {
                self.take_undo()?;
                debug!("transaction leave");
                self.cache.flush(false);
                Ok(())
            }
        }
    }

    /// Applies the autoflush policy after an operation outside a
    /// transaction.
    pub fn autoflush(&mut self) {
        if !self.is_open() {
            self.cache.flush(false);
        }
    }

    fn take_undo(&mut self) -> CoreResult<VecDeque<UndoEntry>> {
        let undo = self
            .undo
            .take()
            .ok_or_else(|| CoreError::state(TxnStateKind::NotInTransaction))?;
        self.cache.unpin();
        Ok(undo)
    }

    fn replay(conn: &mut Connection, undo: VecDeque<UndoEntry>) -> CoreResult<()> {
        for entry in undo {
            if let Err(err) = entry.reverse.execute(conn) {
                error!(
                    statement = %entry.reverse,
                    error = %err,
                    "rollback failed; directory may hold partial changes"
                );
                return Err(CoreError::UnrecoverableRollback {
                    statement: entry.reverse.to_string(),
                    reason: err.to_string(),
                });
            }
            if let Some(hook) = entry.on_rollback {
                hook();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Statement;
    use ldaptx_codec::{AttributeSet, Dn, Modification};
    use ldaptx_conn::{ConnError, InMemoryDirectory, OperationKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn setup() -> (InMemoryDirectory, Connection, TransactionManager) {
        let dir = InMemoryDirectory::new().with_naming_context(base());
        dir.seed(base(), AttributeSet::new().with("objectClass", ["domain"]))
            .unwrap();
        let conn = Connection::new(dir.clone());
        (dir, conn, TransactionManager::new(ShadowCache::new(true)))
    }

    fn base() -> Dn {
        Dn::parse("dc=example,dc=org").unwrap()
    }

    fn child(name: &str) -> Dn {
        Dn::parse(&format!("ou={name},dc=example,dc=org")).unwrap()
    }

    fn add(dn: Dn) -> PendingAction {
        PendingAction::new(
            Statement::Add {
                dn: dn.clone(),
                attributes: AttributeSet::new().with("objectClass", ["organizationalUnit"]),
            },
            Statement::Delete { dn },
        )
    }

    #[test]
    fn state_transitions() {
        let (_, _, mut txn) = setup();
        assert_eq!(txn.status(), TransactionStatus::Idle);
        assert_eq!(
            txn.commit().unwrap_err().state_kind(),
            Some(TxnStateKind::NotInTransaction)
        );
        assert_eq!(
            txn.leave().unwrap_err().state_kind(),
            Some(TxnStateKind::NotInTransaction)
        );

        txn.begin().unwrap();
        assert!(txn.cache().is_pinned());
        assert_eq!(
            txn.begin().unwrap_err().state_kind(),
            Some(TxnStateKind::AlreadyInTransaction)
        );
        txn.leave().unwrap();
        assert_eq!(txn.status(), TransactionStatus::Idle);
        assert!(!txn.cache().is_pinned());
    }

    #[test]
    fn autocommit_records_nothing() {
        let (dir, mut conn, mut txn) = setup();
        txn.statement(&mut conn, add(child("People"))).unwrap();
        assert!(dir.contains(&child("People")));
        assert_eq!(txn.undo_len(), 0);
    }

    #[test]
    fn commit_keeps_changes() {
        let (dir, mut conn, mut txn) = setup();
        txn.begin().unwrap();
        txn.statement(&mut conn, add(child("People"))).unwrap();
        txn.statement(&mut conn, add(child("Groups"))).unwrap();
        assert_eq!(txn.undo_len(), 2);
        txn.commit().unwrap();
        assert!(!txn.is_open());
        assert!(dir.contains(&child("People")));
        assert!(dir.contains(&child("Groups")));
    }

    #[test]
    fn rollback_undoes_newest_first() {
        let (dir, mut conn, mut txn) = setup();
        let before = dir.snapshot();
        let undone = Arc::new(AtomicUsize::new(0));

        txn.begin().unwrap();
        for name in ["People", "Groups"] {
            let counter = Arc::clone(&undone);
            let action = add(child(name)).on_rollback(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            txn.statement(&mut conn, action).unwrap();
        }
        txn.statement(
            &mut conn,
            PendingAction::new(
                Statement::Modify {
                    dn: child("People"),
                    changes: vec![Modification::add("description", ["staff"])],
                },
                Statement::Modify {
                    dn: child("People"),
                    changes: vec![Modification::delete("description", ["staff"])],
                },
            ),
        )
        .unwrap();

        txn.rollback(&mut conn).unwrap();
        assert_eq!(dir.snapshot(), before);
        assert_eq!(undone.load(Ordering::SeqCst), 2);
        assert!(!txn.is_open());
        assert!(txn.cache().is_empty());
    }

    #[test]
    fn failed_statement_leaves_transaction_open() {
        let (_, mut conn, mut txn) = setup();
        txn.begin().unwrap();
        txn.statement(&mut conn, add(child("People"))).unwrap();
        let err = txn.statement(&mut conn, add(child("People"))).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
        assert!(txn.is_open());
        assert_eq!(txn.undo_len(), 1);
    }

    #[test]
    fn rollback_failure_is_unrecoverable() {
        let (dir, mut conn, mut txn) = setup();
        txn.begin().unwrap();
        txn.statement(&mut conn, add(child("People"))).unwrap();
        txn.statement(&mut conn, add(child("Groups"))).unwrap();

        dir.fail_next(OperationKind::Delete, ConnError::Transport("boom".into()));
        let err = txn.rollback(&mut conn).unwrap_err();
        let CoreError::UnrecoverableRollback { statement, .. } = err else {
            panic!("expected unrecoverable rollback, got {err:?}");
        };
        assert!(statement.contains("ou=Groups"));
        // the older entry was never attempted
        assert!(dir.contains(&child("People")));
        assert!(!txn.is_open());
        assert!(txn.cache().is_empty());
    }

    #[test]
    fn leave_while_dirty_stays_open() {
        let (_, mut conn, mut txn) = setup();
        txn.begin().unwrap();
        txn.statement(&mut conn, add(child("People"))).unwrap();
        assert_eq!(
            txn.leave().unwrap_err().state_kind(),
            Some(TxnStateKind::DirtyTransaction)
        );
        assert!(txn.is_open());
        txn.rollback(&mut conn).unwrap();
    }
}
