//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use ldaptx_codec::{AttributeSet, CodecResult, Dn, Filter, Rdn};
use ldaptx_conn::{ConnResult, Connection, InMemoryDirectory};
use ldaptx_core::Directory;

/// Container the benchmark people live in.
pub const PEOPLE: &str = "ou=People,dc=example,dc=org";

/// A name `depth` components deep, with escapes and a multi-valued
/// component at every level.
pub fn deep_name(depth: usize) -> String {
    (0..depth)
        .map(|i| format!("cn=Node\\, {i}+ou=Unit {i}"))
        .chain(["dc=example".to_string(), "dc=org".to_string()])
        .collect::<Vec<_>>()
        .join(",")
}

/// An OR of `width` equality terms on `uid`.
pub fn wide_filter(width: usize) -> Filter {
    (0..width)
        .map(|i| Filter::eq("uid", format!("user{i}")))
        .reduce(|acc, term| acc | term)
        .unwrap_or_else(Filter::everything)
}

/// A server holding `count` people under [`PEOPLE`], and a handle on it.
pub fn populated(count: usize) -> ConnResult<(InMemoryDirectory, Directory)> {
    let people = people()?;
    let suffix = people.parent().unwrap_or_default();
    let server = InMemoryDirectory::new().with_naming_context(suffix.clone());
    server.seed(suffix, AttributeSet::new().with("objectClass", ["domain"]))?;
    server.seed(
        people.clone(),
        AttributeSet::new().with("objectClass", ["organizationalUnit"]),
    )?;
    for i in 0..count {
        server.seed(person_dn(&people, i), person(i))?;
    }
    let dir = Directory::new(Connection::new(server.clone()));
    Ok((server, dir))
}

/// The people container.
pub fn people() -> CodecResult<Dn> {
    Dn::parse(PEOPLE)
}

/// Name of person `i` under `people`.
pub fn person_dn(people: &Dn, i: usize) -> Dn {
    people.child(Rdn::new("uid", format!("user{i}")))
}

/// Attributes of person `i`.
pub fn person(i: usize) -> AttributeSet {
    AttributeSet::new()
        .with("objectClass", ["person"])
        .with("uid", [format!("user{i}")])
        .with("sn", [format!("User{i}")])
}
