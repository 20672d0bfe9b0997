//! Property-based test generators using proptest.
//!
//! Provides strategies for names, attribute sets, modifications and
//! sequences of directory operations.

use ldaptx_codec::{values, AttributeSet, Ava, Dn, Modification, ModifyOp, Rdn};
use proptest::prelude::*;

/// Strategy for attribute type names.
pub fn attr_type_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec!["cn", "ou", "uid", "dc", "o", "sn", "mail", "c"])
            .prop_map(String::from),
        prop::string::string_regex("[a-zA-Z][a-zA-Z0-9-]{0,11}").expect("Invalid regex"),
        prop::string::string_regex("[1-9][0-9]{0,2}(\\.[0-9]{1,3}){1,4}").expect("Invalid regex"),
    ]
}

/// Strategy for string values, biased towards characters that need
/// escaping in names and filters.
pub fn attr_value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => prop::string::string_regex("[a-zA-Z0-9 .@_-]{1,16}").expect("Invalid regex"),
        2 => prop::string::string_regex("[a-z,+=\"\\\\<>;#*() ]{1,12}").expect("Invalid regex"),
        1 => prop::string::string_regex("[\u{e0}-\u{ff}\u{4e00}-\u{4e10}]{1,6}").expect("Invalid regex"),
    ]
}

/// Strategy for one type/value pair, occasionally with a binary value.
pub fn ava_strategy() -> impl Strategy<Value = Ava> {
    prop_oneof![
        5 => (attr_type_strategy(), attr_value_strategy())
            .prop_map(|(attr_type, value)| Ava::new(attr_type, value)),
        1 => (attr_type_strategy(), prop::collection::vec(any::<u8>(), 1..8))
            .prop_map(|(attr_type, bytes)| Ava::binary(attr_type, bytes)),
    ]
}

/// Strategy for relative names with one to three pairs of distinct types.
pub fn rdn_strategy() -> impl Strategy<Value = Rdn> {
    prop::collection::vec(ava_strategy(), 1..4).prop_filter_map("duplicate types", |avas| {
        let mut types: Vec<String> = avas.iter().map(|a| a.attr_type().to_ascii_lowercase()).collect();
        types.sort();
        types.dedup();
        if types.len() == avas.len() {
            Rdn::from_avas(avas)
        } else {
            None
        }
    })
}

/// Strategy for names of up to `max_depth` components.
pub fn dn_strategy(max_depth: usize) -> impl Strategy<Value = Dn> {
    prop::collection::vec(rdn_strategy(), 0..=max_depth).prop_map(Dn::from_rdns)
}

/// Strategy for user attribute sets over a small vocabulary, so that
/// generated modifications hit existing values often.
pub fn attribute_set_strategy() -> impl Strategy<Value = AttributeSet> {
    prop::collection::btree_map(
        small_attr_strategy(),
        small_values_strategy(1),
        0..4,
    )
    .prop_map(|attrs| attrs.into_iter().collect())
}

/// Strategy for one modification over the same vocabulary as
/// [`attribute_set_strategy`].
pub fn modification_strategy() -> impl Strategy<Value = Modification> {
    (
        prop::sample::select(vec![ModifyOp::Add, ModifyOp::Delete, ModifyOp::Replace]),
        small_attr_strategy(),
        small_values_strategy(0),
    )
        .prop_map(|(op, attr, vals)| Modification::new(op, attr, values(vals)))
}

fn small_attr_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["description", "mail", "telephoneNumber", "title"])
}

fn small_values_strategy(min: usize) -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(vec!["a", "b", "c", "d"], min..=3)
}

/// One operation against the people container of the test tree.
#[derive(Debug, Clone)]
pub enum DirectoryOperation {
    /// Add `uid=<uid>`.
    Add {
        /// Leaf uid.
        uid: String,
        /// Extra attributes.
        attributes: AttributeSet,
    },
    /// Modify `uid=<uid>`.
    Modify {
        /// Leaf uid.
        uid: String,
        /// Changes to apply.
        changes: Vec<Modification>,
    },
    /// Delete `uid=<uid>`.
    Delete {
        /// Leaf uid.
        uid: String,
    },
    /// Rename `uid=<uid>` to `uid=<new_uid>`.
    Rename {
        /// Leaf uid.
        uid: String,
        /// New leaf uid.
        new_uid: String,
    },
}

fn uid_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["tux", "tuz", "meow", "penny"]).prop_map(String::from)
}

/// Strategy for directory operations over a handful of uids. Many of them
/// are expected to fail, which is part of what they exercise.
pub fn directory_operation_strategy() -> impl Strategy<Value = DirectoryOperation> {
    prop_oneof![
        2 => (uid_strategy(), attribute_set_strategy())
            .prop_map(|(uid, attributes)| DirectoryOperation::Add { uid, attributes }),
        3 => (uid_strategy(), prop::collection::vec(modification_strategy(), 1..4))
            .prop_map(|(uid, changes)| DirectoryOperation::Modify { uid, changes }),
        1 => uid_strategy().prop_map(|uid| DirectoryOperation::Delete { uid }),
        1 => (uid_strategy(), uid_strategy())
            .prop_map(|(uid, new_uid)| DirectoryOperation::Rename { uid, new_uid }),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<DirectoryOperation>> {
    prop::collection::vec(directory_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn rdn_types_are_distinct(rdn in rdn_strategy()) {
            let mut types: Vec<String> =
                rdn.avas().iter().map(|a| a.attr_type().to_ascii_lowercase()).collect();
            let count = types.len();
            types.sort();
            types.dedup();
            prop_assert_eq!(types.len(), count);
        }

        #[test]
        fn dn_depth_is_bounded(dn in dn_strategy(4)) {
            prop_assert!(dn.len() <= 4);
        }

        #[test]
        fn attribute_sets_have_no_empty_attributes(attrs in attribute_set_strategy()) {
            for (_, vals) in attrs.iter() {
                prop_assert!(!vals.is_empty());
            }
        }
    }
}
