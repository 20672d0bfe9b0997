//! Scoped search over the shadow cache and the server.
//!
//! Cached entries win: a present cached entry in scope is answered from the
//! cache, and a deleted one hides whatever the server still reports under
//! that name. Everything else comes from one live search.

use crate::cache::{CacheEntry, CacheState, ShadowCache};
use crate::error::{CoreError, CoreResult};
use ldaptx_codec::{AttributeSet, Dn, Entry, Filter, Scope};
use ldaptx_conn::{ConnError, Connection, SearchRequest};
use std::collections::HashSet;
use std::vec;
use tracing::debug;

/// A search over one scope of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Search base.
    pub base: Dn,
    /// How far below the base to look.
    pub scope: Scope,
    /// Entries must match this filter.
    pub filter: Filter,
    /// Attributes to return; empty or `*` means all user attributes and
    /// `+` adds server-generated ones.
    pub attributes: Vec<String>,
    /// Cap on the number of entries returned.
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Creates a query returning all user attributes without a limit.
    #[must_use]
    pub fn new(base: Dn, scope: Scope, filter: Filter) -> Self {
        Self {
            base,
            scope,
            filter,
            attributes: Vec::new(),
            limit: None,
        }
    }

    /// Sets the requested attributes.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Entries produced by a search, cached ones first.
#[derive(Debug)]
pub struct SearchResults {
    entries: vec::IntoIter<Entry>,
}

impl SearchResults {
    fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for SearchResults {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for SearchResults {}

/// Runs `query` against `cache` and then the server.
///
/// `server_attributes` lists the types treated as server-generated when
/// projecting cached entries.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the base exists neither on the server
/// nor as a present cached entry, and propagates other transport failures.
pub fn search(
    conn: &mut Connection,
    cache: &ShadowCache,
    query: &SearchQuery,
    server_attributes: &[String],
) -> CoreResult<SearchResults> {
    let mut seen = HashSet::new();
    let mut results = Vec::new();
    let cap = query.limit.unwrap_or(usize::MAX);

    for (dn, entry) in cache.iter_in_scope(&query.base, query.scope) {
        match entry {
            CacheEntry::Present(attrs) if results.len() < cap && query.filter.matches(attrs) => {
                seen.insert(dn.normalized());
                results.push(Entry::new(
                    dn.clone(),
                    project(attrs, &query.attributes, server_attributes),
                ));
            }
            CacheEntry::Present(_) => {}
            CacheEntry::Deleted => {
                seen.insert(dn.normalized());
            }
        }
    }
    let cached = results.len();
    if results.len() >= cap {
        return Ok(SearchResults::new(results));
    }

    let size_limit = query
        .limit
        .map(|limit| limit.saturating_sub(results.len()).saturating_add(seen.len()));
    let request = SearchRequest::new(query.base.clone(), query.scope, query.filter.to_wire())
        .with_attributes(query.attributes.iter().cloned())
        .with_size_limit(size_limit);
    let live = match conn.search_raw(&request) {
        Ok(live) => live,
        Err(ConnError::NoSuchObject { .. }) if cache_has_base(cache, &query.base) => Vec::new(),
        Err(err) => return Err(CoreError::from(err)),
    };

    results.extend(
        live.into_iter()
            .filter(|entry| !seen.contains(&entry.dn.normalized()))
            .take(cap - cached),
    );
    debug!(
        base = %query.base,
        scope = %query.scope,
        cached,
        total = results.len(),
        "search"
    );
    Ok(SearchResults::new(results))
}

fn cache_has_base(cache: &ShadowCache, base: &Dn) -> bool {
    matches!(cache.state(base), CacheState::Present(_))
}

/// Projects a cached entry the way a server would.
fn project(attrs: &AttributeSet, requested: &[String], server: &[String]) -> AttributeSet {
    let all_user = requested.is_empty() || requested.iter().any(|r| r == "*");
    let all_server = requested.iter().any(|r| r == "+");
    let is_server = |name: &str| server.iter().any(|s| s.eq_ignore_ascii_case(name));
    attrs
        .iter()
        .filter(|(name, _)| {
            let named = requested.iter().any(|r| name.is(r));
            if is_server(name.as_str()) {
                all_server || named
            } else {
                all_user || named
            }
        })
        .map(|(name, vals)| (name.clone(), vals.to_vec()))
        .collect()
}
