//! Apply command implementation.
//!
//! Reads a JSON list of changes and runs them in one transaction:
//!
//! ```json
//! [
//!   {"op": "add", "dn": "uid=tuz,ou=People,dc=example,dc=org",
//!    "attributes": {"objectClass": ["person"], "sn": ["Tuz"]}},
//!   {"op": "modify", "dn": "uid=tux,ou=People,dc=example,dc=org",
//!    "changes": [{"type": "replace", "attribute": "sn", "values": ["T"]}]},
//!   {"op": "rename", "dn": "uid=tuz,ou=People,dc=example,dc=org", "new_rdn": "uid=meow"},
//!   {"op": "delete", "dn": "uid=meow,ou=People,dc=example,dc=org"}
//! ]
//! ```
//!
//! Any failure rolls back everything applied before it.

use ldaptx_codec::{values, AttributeSet, Dn, Modification, ModifyOp, Rdn};
use ldaptx_core::{CoreResult, Directory};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One change from the input file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Change {
    /// Create an entry.
    Add {
        /// Entry name.
        dn: String,
        /// Initial attributes.
        attributes: BTreeMap<String, Vec<String>>,
    },
    /// Modify an entry.
    Modify {
        /// Entry name.
        dn: String,
        /// Attribute changes in order.
        changes: Vec<ChangeItem>,
    },
    /// Delete a leaf entry.
    Delete {
        /// Entry name.
        dn: String,
    },
    /// Rename or move an entry.
    Rename {
        /// Entry name.
        dn: String,
        /// New relative name.
        new_rdn: String,
        /// New parent, if moving.
        #[serde(default)]
        new_parent: Option<String>,
    },
}

/// One attribute change of a modify.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeItem {
    /// `add`, `delete` or `replace`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Attribute name.
    pub attribute: String,
    /// Values; empty means all values for delete.
    #[serde(default)]
    pub values: Vec<String>,
}

/// A change with its names parsed.
enum Parsed {
    Add(Dn, AttributeSet),
    Modify(Dn, Vec<Modification>),
    Delete(Dn),
    Rename(Dn, Rdn, Option<Dn>),
}

fn parse_change(change: &Change) -> Result<Parsed, Box<dyn std::error::Error>> {
    Ok(match change {
        Change::Add { dn, attributes } => {
            let attrs = attributes
                .iter()
                .fold(AttributeSet::new(), |set, (name, vals)| {
                    set.with(name.as_str(), vals.iter().map(String::as_str))
                });
            Parsed::Add(Dn::parse(dn)?, attrs)
        }
        Change::Modify { dn, changes } => {
            let mods = changes
                .iter()
                .map(|item| {
                    let op = match item.kind.to_ascii_lowercase().as_str() {
                        "add" => ModifyOp::Add,
                        "delete" => ModifyOp::Delete,
                        "replace" => ModifyOp::Replace,
                        other => return Err(format!("unknown change type: {other}")),
                    };
                    Ok(Modification::new(
                        op,
                        item.attribute.as_str(),
                        values(item.values.iter().map(String::as_str)),
                    ))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Parsed::Modify(Dn::parse(dn)?, mods)
        }
        Change::Delete { dn } => Parsed::Delete(Dn::parse(dn)?),
        Change::Rename {
            dn,
            new_rdn,
            new_parent,
        } => Parsed::Rename(
            Dn::parse(dn)?,
            Rdn::parse(new_rdn)?,
            new_parent.as_deref().map(Dn::parse).transpose()?,
        ),
    })
}

fn apply_one(dir: &mut Directory, change: &Parsed) -> CoreResult<()> {
    match change {
        Parsed::Add(dn, attrs) => dir.add(dn, attrs.clone()),
        Parsed::Modify(dn, mods) => dir.modify(dn, mods),
        Parsed::Delete(dn) => dir.delete(dn),
        Parsed::Rename(dn, rdn, parent) => dir.rename(dn, rdn, parent.as_ref()),
    }
}

/// Applies `changes` to `dir` in one transaction. With `dry_run` the
/// transaction is rolled back after every change succeeded.
///
/// Returns the number of changes applied.
pub fn execute(
    dir: &mut Directory,
    changes: &[Change],
    dry_run: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    // reject malformed input before touching the server
    let parsed = changes
        .iter()
        .map(parse_change)
        .collect::<Result<Vec<_>, _>>()?;

    dir.begin_transaction()?;
    for (index, change) in parsed.iter().enumerate() {
        if let Err(err) = apply_one(dir, change) {
            dir.rollback()?;
            return Err(format!("change {} failed, nothing applied: {err}", index + 1).into());
        }
    }
    if dry_run {
        dir.rollback()?;
    } else {
        dir.commit()?;
    }
    Ok(parsed.len())
}

/// Runs the apply command.
pub fn run(config: &Path, file: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(file)?;
    let changes: Vec<Change> = serde_json::from_str(&text)?;
    let (conn, _) = super::connect(config)?;
    let mut dir = Directory::new(conn);
    let count = execute(&mut dir, &changes, dry_run)?;
    info!(count, dry_run, "changes applied");
    if dry_run {
        println!("{count} changes validated and rolled back");
    } else {
        println!("{count} changes committed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldaptx_testkit::{dn, Snapshot, TestDirectory, TUX};

    fn changes(json: &str) -> Vec<Change> {
        serde_json::from_str(json).unwrap()
    }

    const BATCH: &str = r#"[
        {"op": "add", "dn": "uid=tuz,ou=People,dc=example,dc=org",
         "attributes": {"objectClass": ["person"], "sn": ["Tuz"]}},
        {"op": "modify", "dn": "uid=tux,ou=People,dc=example,dc=org",
         "changes": [{"type": "add", "attribute": "telephoneNumber", "values": ["1"]}]},
        {"op": "rename", "dn": "uid=tuz,ou=People,dc=example,dc=org", "new_rdn": "uid=meow"}
    ]"#;

    #[test]
    fn batch_commits() {
        let mut test_dir = TestDirectory::new();
        assert_eq!(execute(&mut test_dir, &changes(BATCH), false).unwrap(), 3);
        assert!(test_dir.server().contains(&dn("uid=meow,ou=People,dc=example,dc=org")));
        let tux = test_dir.get(&dn(TUX)).unwrap().unwrap();
        assert_eq!(tux.get_strs("telephoneNumber"), vec!["1"]);
    }

    #[test]
    fn dry_run_leaves_server_untouched() {
        let mut test_dir = TestDirectory::new();
        let before = Snapshot::capture(test_dir.server());
        execute(&mut test_dir, &changes(BATCH), true).unwrap();
        before.assert_matches(test_dir.server());
    }

    #[test]
    fn failure_rolls_back_earlier_changes() {
        let mut test_dir = TestDirectory::new();
        let before = Snapshot::capture(test_dir.server());
        let batch = changes(
            r#"[
            {"op": "delete", "dn": "cn=admins,ou=Groups,dc=example,dc=org"},
            {"op": "delete", "dn": "uid=nobody,ou=People,dc=example,dc=org"}
        ]"#,
        );
        let err = execute(&mut test_dir, &batch, false).unwrap_err();
        assert!(err.to_string().contains("change 2"));
        before.assert_matches(test_dir.server());
        assert!(!test_dir.is_transaction_open());
    }

    #[test]
    fn malformed_change_touches_nothing() {
        let mut test_dir = TestDirectory::new();
        let batch = changes(r#"[{"op": "delete", "dn": "not a dn"}]"#);
        assert!(execute(&mut test_dir, &batch, false).is_err());
        assert!(!test_dir.is_transaction_open());
    }
}
