//! Search scope.

use crate::dn::Dn;
use std::fmt;
use std::str::FromStr;

/// How far below the base a search reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The base entry only.
    Base,
    /// Direct children of the base, excluding the base itself.
    OneLevel,
    /// The base entry and all of its descendants.
    Subtree,
}

impl Scope {
    /// Whether `dn` falls inside this scope relative to `base`.
    ///
    /// The depth difference must be exactly 0 for [`Scope::Base`], exactly 1
    /// for [`Scope::OneLevel`] and at least 0 for [`Scope::Subtree`], with
    /// every ancestor component equal.
    #[must_use]
    pub fn contains(self, base: &Dn, dn: &Dn) -> bool {
        match (self, dn.depth_below(base)) {
            (_, None) => false,
            (Self::Base, Some(depth)) => depth == 0,
            (Self::OneLevel, Some(depth)) => depth == 1,
            (Self::Subtree, Some(_)) => true,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Base => "base",
            Self::OneLevel => "one",
            Self::Subtree => "sub",
        })
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "one" | "onelevel" => Ok(Self::OneLevel),
            "sub" | "subtree" => Ok(Self::Subtree),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}
