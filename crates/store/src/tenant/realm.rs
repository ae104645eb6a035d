//! Realm identifiers.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque identifier naming one isolated customer space.
///
/// A `Realm` selects the database every store operation runs against. The
/// value is not interpreted beyond (optionally) prefixing it to form a
/// database name, so any string a deployment uses to name its tenants
/// works unchanged.
///
/// # Examples
///
/// ```
/// use tessera_store::tenant::Realm;
///
/// let realm = Realm::new("acme-fitness");
/// assert_eq!(realm.as_str(), "acme-fitness");
/// assert_eq!(realm.to_string(), "acme-fitness");
///
/// // From is implemented for convenience at call sites.
/// let other: Realm = "acme-fitness".into();
/// assert_eq!(realm, other);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Realm(String);

impl Realm {
    /// Creates a realm from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Realm(value.into())
    }

    /// Returns the realm as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the realm is empty or whitespace-only.
    ///
    /// Blank realms are rejected by the provisioning workflows before any
    /// store call happens.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_store::tenant::Realm;
    ///
    /// assert!(Realm::new("").is_blank());
    /// assert!(Realm::new("   ").is_blank());
    /// assert!(!Realm::new("acme").is_blank());
    /// ```
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Realm({:?})", self.0)
    }
}

impl FromStr for Realm {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Realm::new(s))
    }
}

impl From<&str> for Realm {
    fn from(value: &str) -> Self {
        Realm::new(value)
    }
}

impl From<String> for Realm {
    fn from(value: String) -> Self {
        Realm(value)
    }
}

impl AsRef<str> for Realm {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
