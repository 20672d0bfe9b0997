//! Attribute sets, modifications and search entries.

use crate::dn::Dn;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An attribute type name. Compares case-insensitively, keeps its spelling.
#[derive(Debug, Clone)]
pub struct AttrName(String);

impl AttrName {
    /// Creates a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the given name, ignoring case.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for AttrName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for AttrName {}

impl Hash for AttrName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl PartialOrd for AttrName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttrName {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.0.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
    }
}

impl fmt::Display for AttrName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttrName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AttrName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Collects anything byte-like into a list of attribute values.
pub fn values<I, V>(items: I) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    items.into_iter().map(Into::into).collect()
}

/// The attributes of one entry, or a partial changeset.
///
/// Maps attribute type (case-insensitive) to an ordered list of byte-string
/// values. An attribute is never stored with an empty value list. Equality
/// treats each value list as a multiset.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attrs: BTreeMap<AttrName, Vec<Vec<u8>>>,
}

impl AttributeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with<I, V>(mut self, name: impl Into<AttrName>, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        self.insert(name, values(items));
        self
    }

    /// Values of an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.attrs.get(&AttrName::new(name)).map(Vec::as_slice)
    }

    /// Values of an attribute that are valid UTF-8.
    #[must_use]
    pub fn get_strs(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .unwrap_or_default()
            .iter()
            .filter_map(|v| std::str::from_utf8(v).ok())
            .collect()
    }

    /// First value of an attribute as UTF-8.
    #[must_use]
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.get_strs(name).into_iter().next()
    }

    /// Whether the attribute is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(&AttrName::new(name))
    }

    /// Whether the attribute holds `value`.
    #[must_use]
    pub fn contains_value(&self, name: &str, value: &[u8]) -> bool {
        self.get(name)
            .is_some_and(|vals| vals.iter().any(|v| v.as_slice() == value))
    }

    /// Replaces all values of an attribute, returning the previous ones.
    /// An empty list removes the attribute.
    pub fn insert(
        &mut self,
        name: impl Into<AttrName>,
        values: Vec<Vec<u8>>,
    ) -> Option<Vec<Vec<u8>>> {
        let name = name.into();
        if values.is_empty() {
            self.attrs.remove(&name)
        } else {
            self.attrs.insert(name, values)
        }
    }

    /// Removes an attribute, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<Vec<u8>>> {
        self.attrs.remove(&AttrName::new(name))
    }

    /// Appends values to an attribute, creating it if needed.
    pub fn add_values(&mut self, name: impl Into<AttrName>, values: &[Vec<u8>]) {
        if values.is_empty() {
            return;
        }
        self.attrs
            .entry(name.into())
            .or_default()
            .extend(values.iter().cloned());
    }

    /// Removes the given values from an attribute, dropping it when empty.
    pub fn remove_values(&mut self, name: &str, values: &[Vec<u8>]) {
        let key = AttrName::new(name);
        if let Some(current) = self.attrs.get_mut(&key) {
            current.retain(|v| !values.contains(v));
            if current.is_empty() {
                self.attrs.remove(&key);
            }
        }
    }

    /// Only the requested attributes. An empty request or `*` keeps all.
    #[must_use]
    pub fn project(&self, names: &[String]) -> AttributeSet {
        if names.is_empty() || names.iter().any(|n| n == "*") {
            return self.clone();
        }
        let attrs = self
            .attrs
            .iter()
            .filter(|(name, _)| names.iter().any(|n| name.is(n)))
            .map(|(name, vals)| (name.clone(), vals.clone()))
            .collect();
        Self { attrs }
    }

    /// All attributes except the named ones.
    #[must_use]
    pub fn without(&self, names: &[String]) -> AttributeSet {
        let attrs = self
            .attrs
            .iter()
            .filter(|(name, _)| !names.iter().any(|n| name.is(n)))
            .map(|(name, vals)| (name.clone(), vals.clone()))
            .collect();
        Self { attrs }
    }

    /// Iterates attributes in case-insensitive name order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttrName, &[Vec<u8>])> {
        self.attrs.iter().map(|(name, vals)| (name, vals.as_slice()))
    }

    /// Attribute names.
    pub fn names(&self) -> impl Iterator<Item = &AttrName> {
        self.attrs.keys()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether the set holds no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.attrs.len() == other.attrs.len()
            && self.attrs.iter().all(|(name, vals)| {
                other.attrs.get(name).is_some_and(|theirs| {
                    let mut a = vals.clone();
                    let mut b = theirs.clone();
                    a.sort();
                    b.sort();
                    a == b
                })
            })
    }
}

impl Eq for AttributeSet {}

impl<N, I, V> FromIterator<(N, I)> for AttributeSet
where
    N: Into<AttrName>,
    I: IntoIterator<Item = V>,
    V: Into<Vec<u8>>,
{
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, items) in iter {
            set.add_values(name, &values(items));
        }
        set
    }
}

/// Kind of change applied to one attribute by a modify request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyOp {
    /// Append values.
    Add,
    /// Remove the given values, or the whole attribute if none are given.
    Delete,
    /// Overwrite all values.
    Replace,
}

impl fmt::Display for ModifyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Replace => "replace",
        })
    }
}

/// One change of a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// The kind of change.
    pub op: ModifyOp,
    /// Target attribute.
    pub attribute: AttrName,
    /// Values; empty for "delete all" or "replace with nothing".
    pub values: Vec<Vec<u8>>,
}

impl Modification {
    /// Creates a modification.
    pub fn new(op: ModifyOp, attribute: impl Into<AttrName>, values: Vec<Vec<u8>>) -> Self {
        Self {
            op,
            attribute: attribute.into(),
            values,
        }
    }

    /// Adds values.
    pub fn add<I, V>(attribute: impl Into<AttrName>, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Self::new(ModifyOp::Add, attribute, values(items))
    }

    /// Deletes specific values.
    pub fn delete<I, V>(attribute: impl Into<AttrName>, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Self::new(ModifyOp::Delete, attribute, values(items))
    }

    /// Deletes the whole attribute.
    pub fn delete_all(attribute: impl Into<AttrName>) -> Self {
        Self::new(ModifyOp::Delete, attribute, Vec::new())
    }

    /// Replaces all values.
    pub fn replace<I, V>(attribute: impl Into<AttrName>, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Self::new(ModifyOp::Replace, attribute, values(items))
    }
}

/// A named entry, as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Name of the entry.
    pub dn: Dn,
    /// Its attributes.
    pub attributes: AttributeSet,
}

impl Entry {
    /// Creates an entry.
    #[must_use]
    pub fn new(dn: Dn, attributes: AttributeSet) -> Self {
        Self { dn, attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let set = AttributeSet::new().with("telephoneNumber", ["111"]);
        assert!(set.contains("TELEPHONENUMBER"));
        assert_eq!(set.get("telephonenumber").unwrap().len(), 1);
        assert_eq!(set.names().next().unwrap().as_str(), "telephoneNumber");
    }

    #[test]
    fn empty_values_remove_attribute() {
        let mut set = AttributeSet::new().with("sn", ["Torvalds"]);
        set.insert("sn", Vec::new());
        assert!(set.is_empty());

        let mut set = AttributeSet::new().with("mail", ["a", "b"]);
        set.remove_values("MAIL", &values(["a", "b"]));
        assert!(!set.contains("mail"));
    }

    #[test]
    fn equality_ignores_value_order() {
        let a = AttributeSet::new().with("mail", ["a", "b"]);
        let b = AttributeSet::new().with("Mail", ["b", "a"]);
        assert_eq!(a, b);
        assert_ne!(a, AttributeSet::new().with("mail", ["a"]));
    }

    #[test]
    fn projection_and_exclusion() {
        let set = AttributeSet::new()
            .with("uid", ["tux"])
            .with("sn", ["Torvalds"])
            .with("entryUUID", ["1234"]);

        let projected = set.project(&["SN".to_string()]);
        assert_eq!(projected.len(), 1);
        assert!(projected.contains("sn"));
        assert_eq!(set.project(&[]), set);
        assert_eq!(set.project(&["*".to_string()]), set);

        let user = set.without(&["entryuuid".to_string()]);
        assert_eq!(user.len(), 2);
    }

    #[test]
    fn add_and_query_values() {
        let mut set = AttributeSet::new();
        set.add_values("mail", &values(["a@example.org"]));
        set.add_values("mail", &values(["b@example.org"]));
        assert!(set.contains_value("mail", b"b@example.org"));
        assert_eq!(set.get_strs("mail"), vec!["a@example.org", "b@example.org"]);
        assert_eq!(set.first_str("mail"), Some("a@example.org"));
    }

    #[test]
    fn collect_from_pairs() {
        let set: AttributeSet = vec![("cn", vec!["a"]), ("CN", vec!["b"])].into_iter().collect();
        assert_eq!(set.get("cn").unwrap().len(), 2);
    }

    #[test]
    fn modification_constructors() {
        let m = Modification::delete_all("telephoneNumber");
        assert_eq!(m.op, ModifyOp::Delete);
        assert!(m.values.is_empty());
        let m = Modification::replace("sn", ["x"]);
        assert_eq!(m.values, vec![b"x".to_vec()]);
    }
}
