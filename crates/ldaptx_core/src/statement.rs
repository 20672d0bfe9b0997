//! Remote mutations.

use crate::error::CoreResult;
use ldaptx_codec::{AttributeSet, Dn, Modification, Rdn};
use ldaptx_conn::Connection;
use std::fmt;

/// One mutation of the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Create an entry.
    Add {
        /// New entry name.
        dn: Dn,
        /// Its attributes.
        attributes: AttributeSet,
    },
    /// Change attribute values.
    Modify {
        /// Target entry.
        dn: Dn,
        /// Changes, applied in order.
        changes: Vec<Modification>,
    },
    /// Remove a leaf entry.
    Delete {
        /// Target entry.
        dn: Dn,
    },
    /// Rename and optionally move an entry.
    Rename {
        /// Current name.
        dn: Dn,
        /// New leaf component.
        new_rdn: Rdn,
        /// New parent, if the entry moves.
        new_parent: Option<Dn>,
    },
}

impl Statement {
    /// The entry this statement targets.
    #[must_use]
    pub fn dn(&self) -> &Dn {
        match self {
            Self::Add { dn, .. }
            | Self::Modify { dn, .. }
            | Self::Delete { dn }
            | Self::Rename { dn, .. } => dn,
        }
    }

    /// Sends the statement over `conn`. A modify without changes is not
    /// sent.
    ///
    /// # Errors
    ///
    /// Returns the server's refusal mapped into [`crate::CoreError`].
    pub fn execute(&self, conn: &mut Connection) -> CoreResult<()> {
        match self {
            Self::Add { dn, attributes } => conn.add_raw(dn, attributes)?,
            Self::Modify { changes, .. } if changes.is_empty() => {}
            Self::Modify { dn, changes } => conn.modify_raw(dn, changes)?,
            Self::Delete { dn } => conn.delete_raw(dn)?,
            Self::Rename {
                dn,
                new_rdn,
                new_parent,
            } => conn.rename_raw(dn, new_rdn, new_parent.as_ref())?,
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { dn, .. } => write!(f, "add {dn}"),
            Self::Modify { dn, changes } => {
                write!(f, "modify {dn} [")?;
                for (i, change) in changes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", change.op, change.attribute)?;
                }
                f.write_str("]")
            }
            Self::Delete { dn } => write!(f, "delete {dn}"),
            Self::Rename {
                dn,
                new_rdn,
                new_parent: Some(parent),
            } => write!(f, "rename {dn} to {new_rdn} under {parent}"),
            Self::Rename { dn, new_rdn, .. } => write!(f, "rename {dn} to {new_rdn}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldaptx_conn::InMemoryDirectory;

    #[test]
    fn display() {
        let dn = Dn::parse("uid=tux,dc=example,dc=org").unwrap();
        let modify = Statement::Modify {
            dn: dn.clone(),
            changes: vec![
                Modification::add("mail", ["a"]),
                Modification::delete_all("description"),
            ],
        };
        assert_eq!(
            modify.to_string(),
            "modify uid=tux,dc=example,dc=org [add mail, delete description]"
        );
        let rename = Statement::Rename {
            dn,
            new_rdn: Rdn::new("uid", "tuz"),
            new_parent: Some(Dn::parse("dc=example,dc=org").unwrap()),
        };
        assert_eq!(
            rename.to_string(),
            "rename uid=tux,dc=example,dc=org to uid=tuz under dc=example,dc=org"
        );
    }

    #[test]
    fn empty_modify_is_not_sent() {
        let dir = InMemoryDirectory::new();
        let mut conn = Connection::new(dir.clone());
        Statement::Modify {
            dn: Dn::parse("o=missing").unwrap(),
            changes: Vec::new(),
        }
        .execute(&mut conn)
        .unwrap();
        assert_eq!(dir.stats().modifies, 0);
    }
}
