//! Directory handle configuration.

/// Attribute types servers commonly generate themselves. They are stripped
/// from an entry before it is re-added to undo a delete.
pub const DEFAULT_STRIP_ATTRIBUTES: &[&str] = &[
    "entryUUID",
    "entryCSN",
    "entryDN",
    "createTimestamp",
    "modifyTimestamp",
    "creatorsName",
    "modifiersName",
    "structuralObjectClass",
    "subschemaSubentry",
    "hasSubordinates",
    "nsUniqueId",
    "objectGUID",
    "whenCreated",
    "whenChanged",
    "uSNCreated",
    "uSNChanged",
    "pwdChangedTime",
    "pwdFailureTime",
    "pwdAccountLockedTime",
    "pwdHistory",
];

/// Configuration for a [`crate::Directory`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Drop the shadow cache after every operation outside a transaction
    /// and when a transaction closes.
    pub autoflush: bool,

    /// Server-generated attribute types, stripped before re-adding a deleted
    /// entry and treated as operational attributes by searches.
    pub strip_attributes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autoflush: true,
            strip_attributes: DEFAULT_STRIP_ATTRIBUTES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the autoflush policy.
    #[must_use]
    pub const fn autoflush(mut self, value: bool) -> Self {
        self.autoflush = value;
        self
    }

    /// Replaces the list of server-generated attributes.
    #[must_use]
    pub fn strip_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strip_attributes = names.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one server-generated attribute.
    #[must_use]
    pub fn also_strip(mut self, name: impl Into<String>) -> Self {
        self.strip_attributes.push(name.into());
        self
    }

    /// Whether `name` is a server-generated attribute.
    #[must_use]
    pub fn is_stripped(&self, name: &str) -> bool {
        self.strip_attributes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.autoflush);
        assert!(config.is_stripped("entryuuid"));
        assert!(config.is_stripped("modifyTimestamp"));
        assert!(!config.is_stripped("sn"));
    }

    #[test]
    fn password_policy_state_is_stripped() {
        let config = Config::default();
        for name in ["pwdChangedTime", "pwdFailureTime", "pwdAccountLockedTime", "pwdHistory"] {
            assert!(config.is_stripped(name), "{name}");
        }
        assert!(!config.is_stripped("userPassword"));
    }

    #[test]
    fn builder() {
        let config = Config::new()
            .autoflush(false)
            .strip_attributes(["entryUUID"])
            .also_strip("pwdChangedTime");
        assert!(!config.autoflush);
        assert_eq!(config.strip_attributes, vec!["entryUUID", "pwdChangedTime"]);
    }
}
