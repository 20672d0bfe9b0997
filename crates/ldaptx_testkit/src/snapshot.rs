//! Snapshots of server state.
//!
//! A [`Snapshot`] holds every entry of an in-memory server with its user
//! attributes. Server-generated attributes are excluded, so a tree that was
//! changed and then restored compares equal to its earlier snapshot.

use ldaptx_codec::Entry;
use ldaptx_conn::InMemoryDirectory;
use serde_json::{json, Map, Value};

/// Every entry of a server at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<Entry>,
}

impl Snapshot {
    /// Captures the current state of `server`.
    pub fn capture(server: &InMemoryDirectory) -> Self {
        Self {
            entries: server.snapshot(),
        }
    }

    /// The captured entries, parents before children.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Names whose state differs between the two snapshots, including
    /// entries present in only one of them.
    pub fn diff(&self, other: &Snapshot) -> Vec<String> {
        let mut changed = Vec::new();
        for entry in &self.entries {
            match other.entries.iter().find(|e| e.dn == entry.dn) {
                Some(theirs) if theirs.attributes == entry.attributes => {}
                _ => changed.push(entry.dn.to_string()),
            }
        }
        for entry in &other.entries {
            if !self.entries.iter().any(|e| e.dn == entry.dn) {
                changed.push(entry.dn.to_string());
            }
        }
        changed
    }

    /// Renders the snapshot as JSON, one object per entry keyed by name.
    /// Values that are not UTF-8 are rendered lossily.
    pub fn to_json(&self) -> Value {
        let mut tree = Map::new();
        for entry in &self.entries {
            let mut attrs = Map::new();
            for (name, vals) in entry.attributes.iter() {
                let rendered: Vec<Value> = vals
                    .iter()
                    .map(|v| json!(String::from_utf8_lossy(v)))
                    .collect();
                attrs.insert(name.to_string(), Value::Array(rendered));
            }
            tree.insert(entry.dn.to_string(), Value::Object(attrs));
        }
        Value::Object(tree)
    }

    /// Asserts that `server` still holds exactly this state.
    ///
    /// # Panics
    ///
    /// Panics with both states rendered as JSON if they differ.
    pub fn assert_matches(&self, server: &InMemoryDirectory) {
        let now = Self::capture(server);
        if *self != now {
            panic!(
                "Directory state changed for {:?}\nexpected: {:#}\nactual: {:#}",
                self.diff(&now),
                self.to_json(),
                now.to_json()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{dn, TestDirectory, TUX};
    use ldaptx_codec::Modification;

    #[test]
    fn json_rendering() {
        let test_dir = TestDirectory::new();
        let json = Snapshot::capture(test_dir.server()).to_json();
        assert_eq!(json[TUX]["sn"], json!(["Torvalds"]));
        assert!(json[TUX].get("entryUUID").is_none());
    }

    #[test]
    fn diff_names_changed_entries() {
        let mut test_dir = TestDirectory::new();
        let before = Snapshot::capture(test_dir.server());
        test_dir
            .modify(&dn(TUX), &[Modification::replace("sn", ["Benedict"])])
            .unwrap();
        let after = Snapshot::capture(test_dir.server());
        assert_eq!(before.diff(&after), vec![TUX.to_string()]);
    }

    #[test]
    #[should_panic(expected = "Directory state changed")]
    fn assert_matches_panics_on_change() {
        let mut test_dir = TestDirectory::new();
        let before = Snapshot::capture(test_dir.server());
        test_dir.delete(&dn(TUX)).unwrap();
        before.assert_matches(test_dir.server());
    }
}
