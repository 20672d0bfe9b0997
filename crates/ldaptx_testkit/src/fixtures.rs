//! Test fixtures and directory helpers.
//!
//! Provides a seeded in-memory server, a [`Directory`] handle wired to it,
//! and temporary settings files.

use ldaptx_codec::{AttributeSet, Dn};
use ldaptx_conn::{Connection, InMemoryDirectory};
use ldaptx_core::{Config, Directory};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Naming context of the seeded tree.
pub const BASE: &str = "dc=example,dc=org";
/// Container for people.
pub const PEOPLE: &str = "ou=People,dc=example,dc=org";
/// Container for groups.
pub const GROUPS: &str = "ou=Groups,dc=example,dc=org";
/// The one seeded person.
pub const TUX: &str = "uid=tux,ou=People,dc=example,dc=org";
/// The one seeded group, with [`TUX`] as member.
pub const ADMINS: &str = "cn=admins,ou=Groups,dc=example,dc=org";
/// Administrator identity; exists outside the tree.
pub const ADMIN: &str = "cn=admin,dc=example,dc=org";
/// Administrator password.
pub const ADMIN_PASSWORD: &str = "secret";
/// Password of [`TUX`].
pub const TUX_PASSWORD: &str = "penguin";

/// Parses a name, panicking on malformed test input.
pub fn dn(text: &str) -> Dn {
    Dn::parse(text).expect("Invalid test DN")
}

/// Attributes of a person entry with the given uid.
pub fn person(uid: &str, surname: &str) -> AttributeSet {
    AttributeSet::new()
        .with("objectClass", ["top", "person", "inetOrgPerson"])
        .with("uid", [uid])
        .with("cn", [format!("{uid} {surname}")])
        .with("sn", [surname])
}

/// A seeded in-memory server plus a directory handle bound as
/// administrator.
pub struct TestDirectory {
    /// The directory handle.
    pub dir: Directory,
    server: InMemoryDirectory,
}

impl TestDirectory {
    /// Creates the seeded tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates the seeded tree with a custom configuration.
    pub fn with_config(config: Config) -> Self {
        let server = seeded_server();
        let dir = Directory::with_config(connect(&server), config);
        Self { dir, server }
    }

    /// Creates a server holding only the naming context entry.
    pub fn empty() -> Self {
        let server = base_server();
        let dir = Directory::new(connect(&server));
        Self { dir, server }
    }

    /// The server, for inspection and fault injection.
    pub fn server(&self) -> &InMemoryDirectory {
        &self.server
    }

    /// A second, independent handle on the same server.
    pub fn other_handle(&self) -> Directory {
        Directory::new(connect(&self.server))
    }
}

impl Default for TestDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDirectory {
    type Target = Directory;

    fn deref(&self) -> &Self::Target {
        &self.dir
    }
}

impl std::ops::DerefMut for TestDirectory {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dir
    }
}

/// Runs a test against a freshly seeded directory.
///
/// # Example
///
/// ```rust
/// use ldaptx_testkit::{dn, with_test_directory, TUX};
///
/// with_test_directory(|dir| {
///     assert!(dir.get(&dn(TUX)).unwrap().is_some());
/// });
/// ```
pub fn with_test_directory<F, R>(f: F) -> R
where
    F: FnOnce(&mut Directory) -> R,
{
    let mut test_dir = TestDirectory::new();
    f(&mut test_dir.dir)
}

/// A settings file in a temporary directory, removed on drop.
pub struct SettingsFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl SettingsFile {
    /// Writes `json` to a fresh temporary file.
    pub fn new(json: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("ldaptx.json");
        std::fs::write(&path, json).expect("Failed to write settings file");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn connect(server: &InMemoryDirectory) -> Connection {
    Connection::new(server.clone()).with_credentials(dn(ADMIN), ADMIN_PASSWORD)
}

fn base_server() -> InMemoryDirectory {
    let server = InMemoryDirectory::new()
        .with_naming_context(dn(BASE))
        .with_admin(dn(ADMIN), ADMIN_PASSWORD);
    server
        .seed(
            dn(BASE),
            AttributeSet::new()
                .with("objectClass", ["top", "domain"])
                .with("dc", ["example"]),
        )
        .expect("Failed to seed naming context");
    server
}

fn seeded_server() -> InMemoryDirectory {
    let server = base_server();
    for ou in [PEOPLE, GROUPS] {
        server
            .seed(
                dn(ou),
                AttributeSet::new().with("objectClass", ["top", "organizationalUnit"]),
            )
            .expect("Failed to seed container");
    }
    server
        .seed(
            dn(TUX),
            person("tux", "Torvalds")
                .with("mail", ["tux@example.org"])
                .with("userPassword", [TUX_PASSWORD]),
        )
        .expect("Failed to seed person");
    server
        .seed(
            dn(ADMINS),
            AttributeSet::new()
                .with("objectClass", ["top", "groupOfNames"])
                .with("member", [TUX]),
        )
        .expect("Failed to seed group");
    server
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A seeded directory with `count` extra people under [`PEOPLE`],
    /// named `uid=user0` onwards.
    pub fn populated_directory(count: usize) -> TestDirectory {
        let test_dir = TestDirectory::new();
        for i in 0..count {
            let uid = format!("user{i}");
            test_dir
                .server()
                .seed(
                    dn(&format!("uid={uid},{PEOPLE}")),
                    person(&uid, &format!("User{i}")),
                )
                .expect("Failed to seed person");
        }
        test_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldaptx_conn::LdapSettings;

    #[test]
    fn seeded_tree() {
        let test_dir = TestDirectory::new();
        assert_eq!(test_dir.server().len(), 5);
        assert!(test_dir.server().contains(&dn(ADMINS)));
    }

    #[test]
    fn test_with_test_directory() {
        with_test_directory(|dir| {
            let tux = dir.get(&dn(TUX)).unwrap().unwrap();
            assert_eq!(tux.first_str("sn"), Some("Torvalds"));
        });
    }

    #[test]
    fn handle_binds_as_admin() {
        let mut test_dir = TestDirectory::new();
        test_dir.get(&dn(TUX)).unwrap();
        assert_eq!(test_dir.server().stats().binds, 1);
    }

    #[test]
    fn populated_scenario() {
        let test_dir = scenarios::populated_directory(10);
        assert_eq!(test_dir.server().len(), 15);
    }

    #[test]
    fn settings_file_loads() {
        let file = SettingsFile::new(r#"{"url": "ldap://localhost:389", "starttls": true}"#);
        let settings = LdapSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.url, "ldap://localhost:389");
        assert!(settings.starttls);
    }
}
