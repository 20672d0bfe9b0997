//! Connection settings.

use crate::error::{ConnError, ConnResult};
use ldaptx_codec::Dn;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A bind password. Wiped from memory on drop and never printed.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(from = "String")]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wraps raw secret bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Secret {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Where and how to reach a directory server.
///
/// Loaded from JSON; every field is optional.
///
/// ```json
/// {
///   "url": "ldap://ldap.example.org",
///   "bind_dn": "cn=admin,dc=example,dc=org",
///   "bind_password": "secret",
///   "starttls": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LdapSettings {
    /// Server URL (`ldap://`, `ldaps://` or `ldapi://`).
    pub url: String,
    /// Identity to bind as after connecting. Anonymous if unset.
    pub bind_dn: Option<String>,
    /// Password for `bind_dn`.
    pub bind_password: Secret,
    /// Upgrade plain connections with StartTLS.
    pub starttls: bool,
    /// Verify the server certificate.
    pub tls_verify: bool,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Default search base for tools.
    pub base_dn: Option<String>,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            url: "ldap://localhost:389".to_string(),
            bind_dn: None,
            bind_password: Secret::default(),
            starttls: false,
            tls_verify: true,
            connect_timeout_secs: 10,
            base_dn: None,
        }
    }
}

impl LdapSettings {
    /// Settings for the given server URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::Settings`] if the document is malformed.
    pub fn from_json_str(text: &str) -> ConnResult<Self> {
        serde_json::from_str(text).map_err(|e| ConnError::Settings(e.to_string()))
    }

    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::Settings`] if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConnResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConnError::Settings(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Sets the bind identity.
    #[must_use]
    pub fn with_bind(mut self, dn: impl Into<String>, password: impl Into<Secret>) -> Self {
        self.bind_dn = Some(dn.into());
        self.bind_password = password.into();
        self
    }

    /// Enables or disables StartTLS.
    #[must_use]
    pub fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    /// Enables or disables certificate verification.
    #[must_use]
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs();
        self
    }

    /// The connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The parsed bind identity, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConnError::Codec`] if `bind_dn` is not a valid name.
    pub fn bind_identity(&self) -> ConnResult<Option<Dn>> {
        self.bind_dn
            .as_deref()
            .map(Dn::parse)
            .transpose()
            .map_err(ConnError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let settings = LdapSettings::default();
        assert_eq!(settings.url, "ldap://localhost:389");
        assert!(settings.tls_verify);
        assert!(!settings.starttls);
        assert_eq!(settings.connect_timeout(), Duration::from_secs(10));
        assert_eq!(settings.bind_identity().unwrap(), None);
    }

    #[test]
    fn parse_partial_json() {
        let settings = LdapSettings::from_json_str(
            r#"{"url": "ldaps://ldap.example.org", "bind_dn": "cn=admin,dc=example,dc=org", "bind_password": "s3cret"}"#,
        )
        .unwrap();
        assert_eq!(settings.url, "ldaps://ldap.example.org");
        assert_eq!(settings.bind_password.expose(), b"s3cret");
        assert_eq!(
            settings.bind_identity().unwrap().unwrap().to_string(),
            "cn=admin,dc=example,dc=org"
        );
        assert_eq!(settings.connect_timeout_secs, 10);
    }

    #[test]
    fn malformed_json_is_a_settings_error() {
        let err = LdapSettings::from_json_str("{url:").unwrap_err();
        assert!(matches!(err, ConnError::Settings(_)));
    }

    #[test]
    fn invalid_bind_dn_is_reported() {
        let settings = LdapSettings::new("ldap://x").with_bind("not a dn", "pw");
        assert!(matches!(
            settings.bind_identity(),
            Err(ConnError::Codec(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"url": "ldap://files.example.org", "starttls": true}}"#).unwrap();
        let settings = LdapSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.url, "ldap://files.example.org");
        assert!(settings.starttls);
    }

    #[test]
    fn missing_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LdapSettings::from_json_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConnError::Settings(_)));
    }

    #[test]
    fn secret_is_not_printed() {
        let settings = LdapSettings::new("ldap://x").with_bind("cn=a", "hunter2");
        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
