//! Transaction state.

use crate::statement::Statement;
use std::fmt;

/// Callback run after an undo statement has been applied successfully.
pub type RollbackHook = Box<dyn FnOnce() + Send>;

/// State of the transaction manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// No transaction; statements auto-commit.
    Idle,
    /// A transaction is open and collecting undo entries.
    Open,
}

/// A mutation about to be executed, with its precomputed inverse.
pub struct PendingAction {
    /// Sent immediately.
    pub forward: Statement,
    /// Sent on rollback, if the forward statement succeeded.
    pub reverse: Statement,
    pub(crate) on_rollback: Option<RollbackHook>,
}

impl PendingAction {
    /// Pairs a statement with its inverse.
    #[must_use]
    pub fn new(forward: Statement, reverse: Statement) -> Self {
        Self {
            forward,
            reverse,
            on_rollback: None,
        }
    }

    /// Runs `hook` once the reverse statement has been applied during a
    /// rollback.
    #[must_use]
    pub fn on_rollback(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_rollback = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAction")
            .field("forward", &self.forward)
            .field("reverse", &self.reverse)
            .field("on_rollback", &self.on_rollback.is_some())
            .finish()
    }
}

/// One entry of the undo log.
pub(crate) struct UndoEntry {
    pub(crate) reverse: Statement,
    pub(crate) on_rollback: Option<RollbackHook>,
}

impl From<PendingAction> for UndoEntry {
    fn from(action: PendingAction) -> Self {
        Self {
            reverse: action.reverse,
            on_rollback: action.on_rollback,
        }
    }
}

impl fmt::Debug for UndoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UndoEntry").field(&self.reverse).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldaptx_codec::Dn;

    #[test]
    fn hook_travels_into_undo_entry() {
        let dn = Dn::parse("uid=tux,dc=example,dc=org").unwrap();
        let action = PendingAction::new(
            Statement::Delete { dn: dn.clone() },
            Statement::Delete { dn },
        )
        .on_rollback(|| {});
        assert!(format!("{action:?}").contains("on_rollback: true"));

        let entry = UndoEntry::from(action);
        assert!(entry.on_rollback.is_some());
    }
}
