//! # ldaptx Connection
//!
//! The session boundary between ldaptx and a directory server.
//!
//! Sessions are opaque protocol pipes: they forward add, modify, delete,
//! rename and search requests and report the server's verdict. They keep no
//! view of the tree; the transactional core in `ldaptx_core` owns that.
//!
//! ## Available sessions
//!
//! - [`LdapSessionFactory`] - network sessions over `ldap3`
//! - [`InMemoryDirectory`] - an in-process server for tests
//!
//! [`Connection`] wraps either one with lazy binding and a single
//! reconnect-and-retry when the server drops the session.
//!
//! ## Example
//!
//! ```rust
//! use ldaptx_codec::{AttributeSet, Dn};
//! use ldaptx_conn::{Connection, InMemoryDirectory};
//!
//! let dir = InMemoryDirectory::new();
//! let mut conn = Connection::new(dir.clone());
//! conn.add_raw(&Dn::parse("o=example").unwrap(), &AttributeSet::new()).unwrap();
//! assert!(dir.contains(&Dn::parse("o=example").unwrap()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod ldap;
mod memory;
mod session;
mod settings;

pub use connection::Connection;
pub use error::{result_code, ConnError, ConnResult};
pub use ldap::{LdapSession, LdapSessionFactory};
pub use memory::{DirectoryStats, InMemoryDirectory, OperationKind, SERVER_ATTRIBUTES};
pub use session::{DirectorySession, SearchRequest, SessionFactory};
pub use settings::{LdapSettings, Secret};
