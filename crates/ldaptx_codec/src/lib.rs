//! # ldaptx Codec
//!
//! Text formats of the directory protocol: distinguished names, search
//! filters and the attribute data model they operate on.
//!
//! ## Distinguished names
//!
//! [`Dn::parse`] accepts the RFC 4514 string form, including quoted values,
//! `\XX` hex escapes, `#hex` binary values and multi-valued RDNs joined with
//! `+`. Parsing preserves the spelling of every component; comparison is
//! case-insensitive on attribute types.
//!
//! ## Filters
//!
//! [`Filter`] trees are built with the `&`, `|` and `!` operators and
//! rendered to RFC 4515 with [`translate`], which refuses attributes outside
//! the given [`FieldSet`].
//!
//! ## Usage
//!
//! ```
//! use ldaptx_codec::{translate, Dn, FieldSet, Filter};
//!
//! let dn = Dn::parse("uid=tux,ou=People,dc=example,dc=org").unwrap();
//! assert_eq!(dn.len(), 4);
//! assert_eq!(dn.parent().unwrap().to_string(), "ou=People,dc=example,dc=org");
//!
//! let fields: FieldSet = ["uid"].into_iter().collect();
//! let filter = Filter::eq("uid", "tux") | Filter::eq("uid", "tuz");
//! assert_eq!(translate(&filter, &fields).unwrap(), "(|(uid=tux)(uid=tuz))");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attrs;
mod dn;
mod error;
mod escape;
mod filter;
mod scope;

pub use attrs::{values, AttrName, AttributeSet, Entry, Modification, ModifyOp};
pub use dn::{Ava, AvaValue, Dn, Rdn};
pub use error::{CodecError, CodecResult};
pub use escape::{escape_filter_bytes, escape_filter_value, escape_value};
pub use filter::{translate, Assertion, Connector, FieldSet, Filter, MatchKind, Term};
pub use scope::Scope;
