//! Undo-log transactions.
//!
//! Statements run against the server immediately. A transaction only keeps
//! the inverse of each one, so committing is free and rolling back replays
//! the inverses newest first.

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::{PendingAction, RollbackHook, TransactionStatus};
