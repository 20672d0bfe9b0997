//! Network sessions over the `ldap3` synchronous client.

use crate::error::{result_code, ConnError, ConnResult};
use crate::session::{DirectorySession, SearchRequest, SessionFactory};
use crate::settings::LdapSettings;
use ldap3::{LdapConn, LdapConnSettings, LdapError, LdapResult, Mod, SearchEntry, SearchOptions};
use ldaptx_codec::{AttributeSet, Dn, Entry, Modification, ModifyOp, Rdn, Scope};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Opens [`LdapSession`]s according to [`LdapSettings`].
#[derive(Debug, Clone)]
pub struct LdapSessionFactory {
    settings: LdapSettings,
}

impl LdapSessionFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(settings: LdapSettings) -> Self {
        Self { settings }
    }

    /// The settings sessions are opened with.
    #[must_use]
    pub fn settings(&self) -> &LdapSettings {
        &self.settings
    }
}

impl SessionFactory for LdapSessionFactory {
    fn connect(&self) -> ConnResult<Box<dyn DirectorySession>> {
        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.connect_timeout())
            .set_starttls(self.settings.starttls)
            .set_no_tls_verify(!self.settings.tls_verify);
        debug!(url = %self.settings.url, starttls = self.settings.starttls, "connecting");
        let conn = LdapConn::with_settings(conn_settings, &self.settings.url)
            .map_err(|e| map_error(e, ""))?;
        Ok(Box::new(LdapSession { conn }))
    }
}

/// One session with a remote server.
pub struct LdapSession {
    conn: LdapConn,
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession").finish_non_exhaustive()
    }
}

/// Maps a client error onto [`ConnError`]. Lost connections become
/// [`ConnError::SessionTerminated`] so the caller can reconnect.
fn map_error(err: LdapError, dn: &str) -> ConnError {
    match err {
        LdapError::LdapResult { result } => {
            ConnError::from_result_code(result.rc, dn, result.text)
        }
        LdapError::EndOfStream => ConnError::terminated("end of stream"),
        LdapError::Io { source } => ConnError::terminated(source.to_string()),
        LdapError::FilterParsing => ConnError::InvalidFilter(dn.to_string()),
        other => ConnError::Transport(other.to_string()),
    }
}

fn check(result: Result<LdapResult, LdapError>, dn: &Dn) -> ConnResult<()> {
    let dn = dn.to_string();
    let result = result.map_err(|e| map_error(e, &dn))?;
    if result.rc == 0 {
        Ok(())
    } else {
        Err(ConnError::from_result_code(result.rc, dn, result.text))
    }
}

fn value_set(values: &[Vec<u8>]) -> HashSet<Vec<u8>> {
    values.iter().cloned().collect()
}

fn wire_scope(scope: Scope) -> ldap3::Scope {
    match scope {
        Scope::Base => ldap3::Scope::Base,
        Scope::OneLevel => ldap3::Scope::OneLevel,
        Scope::Subtree => ldap3::Scope::Subtree,
    }
}

fn entry_from_wire(entry: SearchEntry) -> ConnResult<Entry> {
    let dn = Dn::parse(&entry.dn)?;
    let mut attributes = AttributeSet::new();
    for (name, vals) in entry.attrs {
        attributes.add_values(name, &ldaptx_codec::values(vals));
    }
    for (name, vals) in entry.bin_attrs {
        attributes.add_values(name, &vals);
    }
    Ok(Entry::new(dn, attributes))
}

impl DirectorySession for LdapSession {
    fn bind(&mut self, dn: &Dn, secret: &[u8]) -> ConnResult<()> {
        let password = std::str::from_utf8(secret)
            .map_err(|_| ConnError::Transport("bind password is not valid UTF-8".into()))?;
        check(self.conn.simple_bind(&dn.to_string(), password), dn)
    }

    fn add(&mut self, dn: &Dn, attributes: &AttributeSet) -> ConnResult<()> {
        let attrs: Vec<(Vec<u8>, HashSet<Vec<u8>>)> = attributes
            .iter()
            .map(|(name, vals)| (name.as_str().as_bytes().to_vec(), value_set(vals)))
            .collect();
        check(self.conn.add(&dn.to_string(), attrs), dn)
    }

    fn modify(&mut self, dn: &Dn, changes: &[Modification]) -> ConnResult<()> {
        let mods: Vec<Mod<Vec<u8>>> = changes
            .iter()
            .map(|change| {
                let attr = change.attribute.as_str().as_bytes().to_vec();
                let vals = value_set(&change.values);
                match change.op {
                    ModifyOp::Add => Mod::Add(attr, vals),
                    ModifyOp::Delete => Mod::Delete(attr, vals),
                    ModifyOp::Replace => Mod::Replace(attr, vals),
                }
            })
            .collect();
        check(self.conn.modify(&dn.to_string(), mods), dn)
    }

    fn delete(&mut self, dn: &Dn) -> ConnResult<()> {
        check(self.conn.delete(&dn.to_string()), dn)
    }

    fn rename(&mut self, dn: &Dn, new_rdn: &Rdn, new_parent: Option<&Dn>) -> ConnResult<()> {
        let new_superior = new_parent.map(ToString::to_string);
        check(
            self.conn.modifydn(
                &dn.to_string(),
                &new_rdn.to_string(),
                true,
                new_superior.as_deref(),
            ),
            dn,
        )
    }

    fn search(&mut self, request: &SearchRequest) -> ConnResult<Vec<Entry>> {
        let base = request.base.to_string();
        let sizelimit = match request.size_limit {
            Some(0) => return Ok(Vec::new()),
            Some(limit) => i32::try_from(limit).unwrap_or(i32::MAX),
            None => 0,
        };
        let attrs: Vec<&str> = request.attributes.iter().map(String::as_str).collect();
        let ldap3::SearchResult(raw, result) = self
            .conn
            .with_search_options(SearchOptions::new().sizelimit(sizelimit))
            .search(&base, wire_scope(request.scope), &request.filter, attrs)
            .map_err(|e| map_error(e, &base))?;
        if result.rc != 0 && result.rc != result_code::SIZE_LIMIT_EXCEEDED {
            return Err(ConnError::from_result_code(result.rc, base, result.text));
        }
        trace!(base = %base, count = raw.len(), "search returned");
        raw.into_iter()
            .map(|entry| entry_from_wire(SearchEntry::construct(entry)))
            .collect()
    }

    fn unbind(&mut self) -> ConnResult<()> {
        self.conn
            .unbind()
            .map_err(|e| ConnError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn result_errors_map_to_codes() {
        let result = LdapResult {
            rc: 68,
            matched: String::new(),
            text: "exists".into(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        };
        assert_eq!(
            map_error(LdapError::LdapResult { result }, "uid=tux"),
            ConnError::AlreadyExists {
                dn: "uid=tux".into()
            }
        );
    }

    #[test]
    fn lost_streams_are_session_loss() {
        assert!(map_error(LdapError::EndOfStream, "").is_session_loss());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(map_error(LdapError::Io { source: io }, "").is_session_loss());
    }

    #[test]
    fn wire_entries_merge_text_and_binary() {
        let entry = SearchEntry {
            dn: "uid=tux,dc=example,dc=org".into(),
            attrs: HashMap::from([("sn".to_string(), vec!["Torvalds".to_string()])]),
            bin_attrs: HashMap::from([("jpegPhoto".to_string(), vec![vec![0xff, 0xd8]])]),
        };
        let entry = entry_from_wire(entry).unwrap();
        assert_eq!(entry.dn.len(), 3);
        assert_eq!(entry.attributes.first_str("sn"), Some("Torvalds"));
        assert_eq!(entry.attributes.get("jpegphoto").unwrap(), &[vec![0xff, 0xd8]]);
    }

    #[test]
    fn factory_reports_unreachable_server() {
        let settings = LdapSettings::new("ldap://127.0.0.1:1")
            .with_connect_timeout(std::time::Duration::from_secs(1));
        let result = LdapSessionFactory::new(settings).connect();
        assert!(result.is_err());
    }
}
