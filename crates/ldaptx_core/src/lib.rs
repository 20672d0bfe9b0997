//! # ldaptx Core
//!
//! Transactions for directory servers that have none.
//!
//! This crate provides:
//! - A shadow cache of what this connection believes each entry holds
//! - Inverse statements for add, modify, delete and rename
//! - An undo-log transaction manager
//! - Searches that see this connection's uncommitted changes
//!
//! [`Directory`] ties them together over one [`ldaptx_conn::Connection`].
//!
//! ```rust
//! use ldaptx_codec::{AttributeSet, Dn, Filter, Scope};
//! use ldaptx_conn::{Connection, InMemoryDirectory};
//! use ldaptx_core::Directory;
//!
//! let server = InMemoryDirectory::new().with_naming_context(Dn::parse("dc=example,dc=org")?);
//! server.seed(Dn::parse("dc=example,dc=org")?, AttributeSet::new())?;
//! let mut dir = Directory::new(Connection::new(server.clone()));
//!
//! let tux = Dn::parse("uid=tux,dc=example,dc=org")?;
//! dir.begin_transaction()?;
//! dir.add(&tux, AttributeSet::new().with("sn", ["Torvalds"]))?;
//! dir.rollback()?;
//!
//! assert!(!server.contains(&tux));
//! let err = dir.search(&tux, Scope::Base, &Filter::everything(), &[], None).unwrap_err();
//! assert!(err.is_not_found());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod directory;
mod error;
mod reversal;
mod search;
mod statement;
mod transaction;

pub use cache::{CacheEntry, CacheState, ShadowCache};
pub use config::{Config, DEFAULT_STRIP_ATTRIBUTES};
pub use directory::Directory;
pub use error::{ConflictKind, CoreError, CoreResult, TxnStateKind};
pub use reversal::{apply_modifications, replay, reverse_add, reverse_delete, reverse_rename};
pub use search::{search, SearchQuery, SearchResults};
pub use statement::Statement;
pub use transaction::{PendingAction, RollbackHook, TransactionManager, TransactionStatus};
