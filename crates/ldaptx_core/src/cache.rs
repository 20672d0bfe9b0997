//! Shadow cache of entry state.
//!
//! Maps normalized names to what this connection believes the remote entry
//! currently holds. Entries are loaded lazily with one base-scope search and
//! updated by every mutation the core performs.

use crate::error::{CoreError, CoreResult};
use ldaptx_codec::{AttributeSet, Dn, Entry, Rdn, Scope};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// What the cache holds for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// The entry exists with these attributes.
    Present(AttributeSet),
    /// The entry was deleted (or renamed away) by this connection.
    Deleted,
}

/// View of one name's cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState<'a> {
    /// Nothing is known; the remote store decides.
    Unloaded,
    /// Believed to exist with these attributes.
    Present(&'a AttributeSet),
    /// Believed not to exist.
    Deleted,
}

/// Per-connection map from normalized name to believed entry state.
#[derive(Debug, Default)]
pub struct ShadowCache {
    entries: BTreeMap<String, (Dn, CacheEntry)>,
    autoflush: bool,
    pins: usize,
}

impl ShadowCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(autoflush: bool) -> Self {
        Self {
            entries: BTreeMap::new(),
            autoflush,
            pins: 0,
        }
    }

    /// The slot for `dn`.
    #[must_use]
    pub fn state(&self, dn: &Dn) -> CacheState<'_> {
        match self.entries.get(&dn.normalized()) {
            None => CacheState::Unloaded,
            Some((_, CacheEntry::Present(attrs))) => CacheState::Present(attrs),
            Some((_, CacheEntry::Deleted)) => CacheState::Deleted,
        }
    }

    /// Returns the cached entry, loading it first if nothing is known.
    ///
    /// `loader` runs at most once and only for an unloaded name; it must
    /// return the result of a base-scope search for `dn`. A deleted or
    /// missing entry yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Propagates loader failures, and returns [`CoreError::Consistency`] if
    /// the search returned more than one entry.
    pub fn get_or_load<F>(&mut self, dn: &Dn, loader: F) -> CoreResult<Option<&mut AttributeSet>>
    where
        F: FnOnce(&Dn) -> CoreResult<Vec<Entry>>,
    {
        let key = dn.normalized();
        if !self.entries.contains_key(&key) {
            let mut found = loader(dn)?;
            match found.len() {
                0 => {
                    trace!(dn = %dn, "cache load: not found");
                    return Ok(None);
                }
                1 => {
                    let entry = found.remove(0);
                    trace!(dn = %dn, attributes = entry.attributes.len(), "cache load");
                    self.entries
                        .insert(key.clone(), (dn.clone(), CacheEntry::Present(entry.attributes)));
                }
                n => {
                    return Err(CoreError::consistency(format!(
                        "base search for {dn} returned {n} entries"
                    )));
                }
            }
        }
        Ok(self.present_mut(&key))
    }

    /// Starts tracking a new entry with an empty attribute set.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if a present entry is cached
    /// under this name.
    pub fn create(&mut self, dn: &Dn) -> CoreResult<&mut AttributeSet> {
        let key = dn.normalized();
        if let CacheState::Present(_) = self.state(dn) {
            return Err(CoreError::already_exists(dn));
        }
        self.entries
            .insert(key.clone(), (dn.clone(), CacheEntry::Present(AttributeSet::new())));
        self.present_mut(&key)
            .ok_or_else(|| CoreError::consistency(format!("cache slot for {dn} vanished")))
    }

    /// Overwrites the attributes of a present entry. Returns `false` if the
    /// entry is not cached as present.
    pub fn update(&mut self, dn: &Dn, attributes: AttributeSet) -> bool {
        match self.present_mut(&dn.normalized()) {
            Some(slot) => {
                *slot = attributes;
                true
            }
            None => false,
        }
    }

    /// Marks `dn` as deleted.
    pub fn delete(&mut self, dn: &Dn) {
        self.entries
            .insert(dn.normalized(), (dn.clone(), CacheEntry::Deleted));
    }

    /// Moves a cached entry and its cached descendants from `old` to `new`.
    ///
    /// The entry's naming values are patched: values of the old leaf
    /// component are removed unless the new one repeats them, and values of
    /// the new component are added. Every vacated slot becomes deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExists`] if a present entry occupies `new`.
    pub fn rename(&mut self, old: &Dn, new: &Dn) -> CoreResult<()> {
        if new != old {
            if let CacheState::Present(_) = self.state(new) {
                return Err(CoreError::already_exists(new));
            }
        }
        let old_rdn = old.rdn().cloned();
        let new_rdn = new.rdn().cloned();

        let moved: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, (dn, entry))| {
                matches!(entry, CacheEntry::Present(_)) && dn.is_descendant_of(old)
            })
            .map(|(key, _)| key.clone())
            .collect();

        let mut relocated = Vec::with_capacity(moved.len());
        for key in moved {
            let Some((dn, entry)) = self.entries.remove(&key) else {
                continue;
            };
            let Some(target) = dn.rebase(old, new) else {
                continue;
            };
            let entry = match entry {
                CacheEntry::Present(mut attrs) if dn == *old => {
                    patch_naming_values(&mut attrs, old_rdn.as_ref(), new_rdn.as_ref());
                    CacheEntry::Present(attrs)
                }
                other => other,
            };
            self.entries.insert(key, (dn, CacheEntry::Deleted));
            relocated.push((target, entry));
        }
        for (dn, entry) in relocated {
            self.entries.insert(dn.normalized(), (dn, entry));
        }
        debug!(from = %old, to = %new, "cache rename");
        Ok(())
    }

    /// Discards every entry if `force` is set, or if autoflush is on and no
    /// transaction has the cache pinned. Returns whether it flushed.
    pub fn flush(&mut self, force: bool) -> bool {
        if force || (self.autoflush && self.pins == 0) {
            if !self.entries.is_empty() {
                debug!(entries = self.entries.len(), force, "cache flush");
            }
            self.entries.clear();
            true
        } else {
            false
        }
    }

    /// Holds the cache across operations; see [`ShadowCache::flush`].
    pub fn pin(&mut self) {
        self.pins += 1;
    }

    /// Releases one [`ShadowCache::pin`].
    pub fn unpin(&mut self) {
        self.pins = self.pins.saturating_sub(1);
    }

    /// Whether any pin is held.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.pins > 0
    }

    /// The autoflush policy.
    #[must_use]
    pub fn autoflush(&self) -> bool {
        self.autoflush
    }

    /// Cached slots whose names fall within `scope` of `base`.
    pub fn iter_in_scope<'a>(
        &'a self,
        base: &'a Dn,
        scope: Scope,
    ) -> impl Iterator<Item = (&'a Dn, &'a CacheEntry)> + 'a {
        self.entries
            .values()
            .filter(move |(dn, _)| scope.contains(base, dn))
            .map(|(dn, entry)| (dn, entry))
    }

    /// Number of cached slots, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn present_mut(&mut self, key: &str) -> Option<&mut AttributeSet> {
        match self.entries.get_mut(key) {
            Some((_, CacheEntry::Present(attrs))) => Some(attrs),
            _ => None,
        }
    }
}

/// Removes the old leaf component's values and adds the new one's.
pub(crate) fn patch_naming_values(attrs: &mut AttributeSet, old: Option<&Rdn>, new: Option<&Rdn>) {
    if let Some(old) = old {
        for ava in old.avas() {
            if !new.is_some_and(|new| new.avas().contains(ava)) {
                attrs.remove_values(ava.attr_type(), &[ava.value().as_bytes().to_vec()]);
            }
        }
    }
    if let Some(new) = new {
        add_naming_values(attrs, new);
    }
}

/// Adds any of the component's values the attribute set lacks.
pub(crate) fn add_naming_values(attrs: &mut AttributeSet, rdn: &Rdn) {
    for ava in rdn.avas() {
        let value = ava.value().as_bytes();
        if !attrs.contains_value(ava.attr_type(), value) {
            attrs.add_values(ava.attr_type(), &[value.to_vec()]);
        }
    }
}
