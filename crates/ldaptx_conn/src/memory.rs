//! In-process directory server for testing.

use crate::error::{result_code, ConnError, ConnResult};
use crate::session::{DirectorySession, SearchRequest, SessionFactory};
use crate::settings::Secret;
use ldaptx_codec::{values, AttributeSet, Dn, Entry, Filter, Modification, ModifyOp, Rdn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Attributes the server maintains itself. Clients may read but not write
/// them.
pub const SERVER_ATTRIBUTES: &[&str] = &["entryUUID", "createTimestamp", "modifyTimestamp"];

fn is_server_attribute(name: &str) -> bool {
    SERVER_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

/// Request kinds, for statistics and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Simple bind.
    Bind,
    /// Add request.
    Add,
    /// Modify request.
    Modify,
    /// Delete request.
    Delete,
    /// Modify-DN request.
    Rename,
    /// Search request.
    Search,
}

/// Number of requests received, per kind, including failed ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    /// Bind requests.
    pub binds: u64,
    /// Add requests.
    pub adds: u64,
    /// Modify requests.
    pub modifies: u64,
    /// Delete requests.
    pub deletes: u64,
    /// Modify-DN requests.
    pub renames: u64,
    /// Search requests.
    pub searches: u64,
}

impl DirectoryStats {
    fn record(&mut self, kind: OperationKind) {
        let counter = match kind {
            OperationKind::Bind => &mut self.binds,
            OperationKind::Add => &mut self.adds,
            OperationKind::Modify => &mut self.modifies,
            OperationKind::Delete => &mut self.deletes,
            OperationKind::Rename => &mut self.renames,
            OperationKind::Search => &mut self.searches,
        };
        *counter += 1;
    }

    /// Requests that change the tree.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.adds + self.modifies + self.deletes + self.renames
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    dn: Dn,
    attributes: AttributeSet,
}

#[derive(Debug, Default)]
struct Tree {
    entries: BTreeMap<String, StoredEntry>,
    contexts: Vec<Dn>,
    admin: Option<(Dn, Secret)>,
    faults: Vec<(OperationKind, ConnError)>,
    stats: DirectoryStats,
    generation: u64,
    sequence: u64,
}

fn no_such_object(dn: &Dn) -> ConnError {
    ConnError::NoSuchObject { dn: dn.to_string() }
}

fn protocol(code: u32, dn: &Dn, message: impl Into<String>) -> ConnError {
    ConnError::Protocol {
        code,
        dn: dn.to_string(),
        message: message.into(),
    }
}

impl Tree {
    fn next_timestamp(&mut self) -> String {
        self.sequence += 1;
        format!("{:014}Z", 20_000_101_000_000 + self.sequence)
    }

    fn exists(&self, dn: &Dn) -> bool {
        self.entries.contains_key(&dn.normalized())
    }

    fn take_fault(&mut self, kind: OperationKind) -> Option<ConnError> {
        let index = self.faults.iter().position(|(k, _)| *k == kind)?;
        Some(self.faults.remove(index).1)
    }

    fn bind(&self, dn: &Dn, secret: &[u8]) -> ConnResult<()> {
        if dn.is_empty() && secret.is_empty() {
            return Ok(());
        }
        if secret.is_empty() {
            return Err(protocol(
                result_code::UNWILLING_TO_PERFORM,
                dn,
                "unauthenticated bind",
            ));
        }
        if let Some((admin, password)) = &self.admin {
            if admin == dn {
                return if password.expose() == secret {
                    Ok(())
                } else {
                    Err(ConnError::InvalidCredentials)
                };
            }
        }
        match self.entries.get(&dn.normalized()) {
            Some(entry) if entry.attributes.contains_value("userPassword", secret) => Ok(()),
            _ => Err(ConnError::InvalidCredentials),
        }
    }

    fn add(&mut self, dn: &Dn, attributes: &AttributeSet) -> ConnResult<()> {
        let Some(parent) = dn.parent() else {
            return Err(protocol(
                result_code::NAMING_VIOLATION,
                dn,
                "cannot add the root entry",
            ));
        };
        if self.exists(dn) {
            return Err(ConnError::AlreadyExists { dn: dn.to_string() });
        }
        if let Some(name) = attributes.names().find(|n| is_server_attribute(n.as_str())) {
            return Err(protocol(
                result_code::CONSTRAINT_VIOLATION,
                dn,
                format!("{name}: no user modification allowed"),
            ));
        }
        let is_context = self.contexts.iter().any(|c| c == dn);
        if !parent.is_empty() && !is_context && !self.exists(&parent) {
            return Err(no_such_object(&parent));
        }

        let mut stored = attributes.clone();
        if let Some(rdn) = dn.rdn() {
            add_naming_values(&mut stored, rdn);
        }
        if !stored.contains("objectClass") {
            stored.insert("objectClass", values(["top"]));
        }
        let stamp = self.next_timestamp();
        stored.insert("entryUUID", values([Uuid::new_v4().to_string()]));
        stored.insert("createTimestamp", values([stamp.clone()]));
        stored.insert("modifyTimestamp", values([stamp]));

        self.entries.insert(
            dn.normalized(),
            StoredEntry {
                dn: dn.clone(),
                attributes: stored,
            },
        );
        Ok(())
    }

    fn modify(&mut self, dn: &Dn, changes: &[Modification]) -> ConnResult<()> {
        let stamp = self.next_timestamp();
        let entry = self
            .entries
            .get_mut(&dn.normalized())
            .ok_or_else(|| no_such_object(dn))?;

        let mut updated = entry.attributes.clone();
        for change in changes {
            let name = change.attribute.as_str();
            if is_server_attribute(name) {
                return Err(protocol(
                    result_code::CONSTRAINT_VIOLATION,
                    dn,
                    format!("{name}: no user modification allowed"),
                ));
            }
            match change.op {
                ModifyOp::Add => {
                    if let Some(value) = change.values.iter().find(|v| updated.contains_value(name, v)) {
                        return Err(ConnError::AttributeOrValueExists {
                            dn: dn.to_string(),
                            message: format!("{name}: value {} already exists", String::from_utf8_lossy(value)),
                        });
                    }
                    updated.add_values(change.attribute.clone(), &change.values);
                }
                ModifyOp::Delete if change.values.is_empty() => {
                    if updated.remove(name).is_none() {
                        return Err(ConnError::NoSuchAttribute {
                            dn: dn.to_string(),
                            message: format!("{name}: no such attribute"),
                        });
                    }
                }
                ModifyOp::Delete => {
                    if change.values.iter().any(|v| !updated.contains_value(name, v)) {
                        return Err(ConnError::NoSuchAttribute {
                            dn: dn.to_string(),
                            message: format!("{name}: no such value"),
                        });
                    }
                    updated.remove_values(name, &change.values);
                }
                ModifyOp::Replace => {
                    updated.insert(change.attribute.clone(), change.values.clone());
                }
            }
        }

        if let Some(rdn) = dn.rdn() {
            if let Some(ava) = rdn
                .avas()
                .iter()
                .find(|ava| !updated.contains_value(ava.attr_type(), ava.value().as_bytes()))
            {
                return Err(protocol(
                    result_code::NOT_ALLOWED_ON_RDN,
                    dn,
                    format!("{}: cannot remove naming value", ava.attr_type()),
                ));
            }
        }
        updated.insert("modifyTimestamp", values([stamp]));
        entry.attributes = updated;
        Ok(())
    }

    fn delete(&mut self, dn: &Dn) -> ConnResult<()> {
        if !self.exists(dn) {
            return Err(no_such_object(dn));
        }
        if self.entries.values().any(|e| e.dn.depth_below(dn) == Some(1)) {
            return Err(ConnError::NotAllowedOnNonLeaf { dn: dn.to_string() });
        }
        self.entries.remove(&dn.normalized());
        Ok(())
    }

    fn rename(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> ConnResult<()> {
        if !self.exists(dn) {
            return Err(no_such_object(dn));
        }
        let parent = match new_parent {
            Some(parent) => {
                if !parent.is_empty() && !self.exists(parent) {
                    return Err(no_such_object(parent));
                }
                if parent.is_descendant_of(dn) {
                    return Err(protocol(
                        result_code::UNWILLING_TO_PERFORM,
                        dn,
                        "cannot move an entry below itself",
                    ));
                }
                parent.clone()
            }
            None => dn.parent().unwrap_or_default(),
        };
        let new_dn = parent.child(new_rdn.clone());
        if new_dn != *dn && self.exists(&new_dn) {
            return Err(ConnError::AlreadyExists {
                dn: new_dn.to_string(),
            });
        }

        let stamp = self.next_timestamp();
        let moved: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.dn.is_descendant_of(dn))
            .map(|(key, _)| key.clone())
            .collect();
        for key in moved {
            let Some(mut entry) = self.entries.remove(&key) else {
                continue;
            };
            if entry.dn == *dn {
                if let Some(old_rdn) = dn.rdn() {
                    for ava in old_rdn.avas() {
                        if !new_rdn.avas().contains(ava) {
                            entry
                                .attributes
                                .remove_values(ava.attr_type(), &[ava.value().as_bytes().to_vec()]);
                        }
                    }
                }
                add_naming_values(&mut entry.attributes, new_rdn);
                entry
                    .attributes
                    .insert("modifyTimestamp", values([stamp.clone()]));
            }
            if let Some(rebased) = entry.dn.rebase(dn, &new_dn) {
                entry.dn = rebased;
            }
            self.entries.insert(entry.dn.normalized(), entry);
        }
        Ok(())
    }

    fn search(&self, request: &SearchRequest) -> ConnResult<Vec<Entry>> {
        let filter =
            Filter::parse(&request.filter).map_err(|e| ConnError::InvalidFilter(e.to_string()))?;
        if !request.base.is_empty() && !self.exists(&request.base) {
            return Err(no_such_object(&request.base));
        }
        let mut found: Vec<&StoredEntry> = self
            .entries
            .values()
            .filter(|e| request.scope.contains(&request.base, &e.dn) && filter.matches(&e.attributes))
            .collect();
        found.sort_by_key(|e| (e.dn.len(), e.dn.normalized()));
        if let Some(limit) = request.size_limit {
            found.truncate(limit);
        }
        Ok(found
            .into_iter()
            .map(|e| Entry::new(e.dn.clone(), project(&e.attributes, &request.attributes)))
            .collect())
    }
}

fn add_naming_values(attributes: &mut AttributeSet, rdn: &Rdn) {
    for ava in rdn.avas() {
        let value = ava.value().as_bytes();
        if !attributes.contains_value(ava.attr_type(), value) {
            attributes.add_values(ava.attr_type(), &[value.to_vec()]);
        }
    }
}

/// Applies an attribute request list: empty or `*` selects user attributes,
/// `+` selects server attributes, anything else names one attribute.
fn project(attributes: &AttributeSet, requested: &[String]) -> AttributeSet {
    let all_user = requested.is_empty() || requested.iter().any(|r| r == "*");
    let all_server = requested.iter().any(|r| r == "+");
    attributes
        .iter()
        .filter(|(name, _)| {
            let named = requested.iter().any(|r| name.is(r));
            if is_server_attribute(name.as_str()) {
                all_server || named
            } else {
                all_user || named
            }
        })
        .map(|(name, vals)| (name.clone(), vals.to_vec()))
        .collect()
}

/// A directory server living in process memory.
///
/// Cloning yields another handle to the same tree. Each handle is a
/// [`SessionFactory`], so a [`crate::Connection`] can be pointed at it.
///
/// # Example
///
/// ```rust
/// use ldaptx_codec::{AttributeSet, Dn, Scope};
/// use ldaptx_conn::{Connection, InMemoryDirectory, SearchRequest};
///
/// let dir = InMemoryDirectory::new().with_naming_context(Dn::parse("dc=example,dc=org").unwrap());
/// dir.seed(
///     Dn::parse("dc=example,dc=org").unwrap(),
///     AttributeSet::new().with("objectClass", ["domain"]),
/// )
/// .unwrap();
///
/// let mut conn = Connection::new(dir.clone());
/// let request = SearchRequest::new(Dn::parse("dc=example,dc=org").unwrap(), Scope::Base, "(dc=example)");
/// assert_eq!(conn.search_raw(&request).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    tree: Arc<RwLock<Tree>>,
}

impl InMemoryDirectory {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a suffix that may be added without a parent entry.
    #[must_use]
    pub fn with_naming_context(self, suffix: Dn) -> Self {
        self.tree.write().contexts.push(suffix);
        self
    }

    /// Declares an administrator identity that exists outside the tree.
    #[must_use]
    pub fn with_admin(self, dn: Dn, password: impl Into<Secret>) -> Self {
        self.tree.write().admin = Some((dn, password.into()));
        self
    }

    /// Adds an entry directly, with the same rules as a client add but
    /// without counting a request.
    ///
    /// # Errors
    ///
    /// Fails like an add request would.
    pub fn seed(&self, dn: Dn, attributes: AttributeSet) -> ConnResult<()> {
        self.tree.write().add(&dn, &attributes)
    }

    /// The stored entry, including server attributes.
    #[must_use]
    pub fn entry(&self, dn: &Dn) -> Option<AttributeSet> {
        self.tree
            .read()
            .entries
            .get(&dn.normalized())
            .map(|e| e.attributes.clone())
    }

    /// Whether an entry exists.
    #[must_use]
    pub fn contains(&self, dn: &Dn) -> bool {
        self.tree.read().exists(dn)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.read().entries.len()
    }

    /// Whether the tree is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.read().entries.is_empty()
    }

    /// Every entry with user attributes only, in tree order.
    ///
    /// Server attributes are left out so snapshots taken before and after a
    /// reverted change compare equal.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Entry> {
        let tree = self.tree.read();
        let mut entries: Vec<Entry> = tree
            .entries
            .values()
            .map(|e| Entry::new(e.dn.clone(), project(&e.attributes, &[])))
            .collect();
        entries.sort_by_key(|e| (e.dn.len(), e.dn.normalized()));
        entries
    }

    /// Request counters.
    #[must_use]
    pub fn stats(&self) -> DirectoryStats {
        self.tree.read().stats
    }

    /// Makes the next request of `kind` fail with `error`. Faults queue up
    /// and are consumed in order.
    pub fn fail_next(&self, kind: OperationKind, error: ConnError) {
        self.tree.write().faults.push((kind, error));
    }

    /// Drops every open session; their next request reports the session
    /// as terminated.
    pub fn terminate_sessions(&self) {
        self.tree.write().generation += 1;
    }
}

impl SessionFactory for InMemoryDirectory {
    fn connect(&self) -> ConnResult<Box<dyn DirectorySession>> {
        let generation = self.tree.read().generation;
        Ok(Box::new(MemorySession {
            tree: Arc::clone(&self.tree),
            generation,
            closed: false,
        }))
    }
}

struct MemorySession {
    tree: Arc<RwLock<Tree>>,
    generation: u64,
    closed: bool,
}

impl MemorySession {
    fn run<T>(
        &self,
        kind: OperationKind,
        request: impl FnOnce(&mut Tree) -> ConnResult<T>,
    ) -> ConnResult<T> {
        let mut tree = self.tree.write();
        if self.closed || tree.generation != self.generation {
            return Err(ConnError::terminated("connection closed by server"));
        }
        tree.stats.record(kind);
        if let Some(fault) = tree.take_fault(kind) {
            return Err(fault);
        }
        request(&mut tree)
    }
}

impl DirectorySession for MemorySession {
    fn bind(&mut self, dn: &Dn, secret: &[u8]) -> ConnResult<()> {
        self.run(OperationKind::Bind, |tree| tree.bind(dn, secret))
    }

    fn add(&mut self, dn: &Dn, attributes: &AttributeSet) -> ConnResult<()> {
        self.run(OperationKind::Add, |tree| tree.add(dn, attributes))
    }

    fn modify(&mut self, dn: &Dn, changes: &[Modification]) -> ConnResult<()> {
        self.run(OperationKind::Modify, |tree| tree.modify(dn, changes))
    }

    fn delete(&mut self, dn: &Dn) -> ConnResult<()> {
        self.run(OperationKind::Delete, |tree| tree.delete(dn))
    }

    fn rename(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> ConnResult<()> {
        self.run(OperationKind::Rename, |tree| tree.rename(dn, new_rdn, new_parent))
    }

    fn search(&mut self, request: &SearchRequest) -> ConnResult<Vec<Entry>> {
        self.run(OperationKind::Search, |tree| tree.search(request))
    }

    fn unbind(&mut self) -> ConnResult<()> {
        self.closed = true;
        Ok(())
    }
}
