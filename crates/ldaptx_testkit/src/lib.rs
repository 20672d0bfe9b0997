//! # ldaptx Testkit
//!
//! Test utilities for ldaptx.
//!
//! This crate provides:
//! - A seeded in-memory directory with a [`ldaptx_core::Directory`] handle
//! - Property-based test generators using proptest
//! - Snapshot helpers for comparing server state
//!
//! Cross-crate tests live in this crate's `tests/` directory.
//!
//! ## Usage
//!
//! ```rust
//! use ldaptx_testkit::prelude::*;
//!
//! let mut dir = TestDirectory::new();
//! let before = Snapshot::capture(dir.server());
//! dir.begin_transaction().unwrap();
//! dir.delete(&dn(TUX)).unwrap();
//! dir.rollback().unwrap();
//! before.assert_matches(dir.server());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod snapshot;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::snapshot::*;
}

pub use fixtures::*;
pub use generators::*;
pub use snapshot::*;
