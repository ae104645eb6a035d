//! Store configuration.
//!
//! Plain serde-deserializable structs with environment-variable
//! constructors. Library callers either build these programmatically, load
//! them from an embedding application's config file, or pick them up from
//! `TESSERA_*` variables via `from_env`.

use serde::{Deserialize, Serialize};

use crate::tenant::Realm;

/// Configuration for the tenant store layer.
///
/// # Examples
///
/// ```
/// use tessera_store::config::StoreConfig;
///
/// let config = StoreConfig::new()
///     .with_database_prefix("tessera_")
///     .with_max_page_size(200);
///
/// assert_eq!(config.database_prefix, "tessera_");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prefix prepended to realm names when forming database names.
    #[serde(default = "default_database_prefix")]
    pub database_prefix: String,

    /// Page size applied when a search request does not carry one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Hard upper bound on page sizes; larger requests are clamped.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_database_prefix() -> String {
    String::new()
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    500
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_prefix: default_database_prefix(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database name prefix.
    pub fn with_database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = prefix.into();
        self
    }

    /// Sets the default page size.
    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the maximum page size.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Reads configuration from `TESSERA_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(prefix) = std::env::var("TESSERA_DATABASE_PREFIX") {
            config.database_prefix = prefix;
        }
        if let Ok(value) = std::env::var("TESSERA_DEFAULT_PAGE_SIZE") {
            if let Ok(size) = value.parse() {
                config.default_page_size = size;
            }
        }
        if let Ok(value) = std::env::var("TESSERA_MAX_PAGE_SIZE") {
            if let Ok(size) = value.parse() {
                config.max_page_size = size;
            }
        }
        config
    }

    /// Validates the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.default_page_size == 0 {
            errors.push("default_page_size must be at least 1".to_string());
        }
        if self.max_page_size == 0 {
            errors.push("max_page_size must be at least 1".to_string());
        }
        if self.default_page_size > self.max_page_size {
            errors.push(format!(
                "default_page_size ({}) exceeds max_page_size ({})",
                self.default_page_size, self.max_page_size
            ));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Returns the database name a realm maps to under this
    /// configuration.
    pub fn database_name(&self, realm: &Realm) -> String {
        format!("{}{}", self.database_prefix, realm)
    }
}

/// Connection configuration for the MongoDB backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// MongoDB connection string.
    #[serde(default = "default_mongo_uri")]
    pub uri: String,

    /// Application name reported to the server.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Server selection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_app_name() -> String {
    "tessera".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: default_mongo_uri(),
            app_name: default_app_name(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl MongoConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection string.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Sets the reported application name.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Sets the server selection timeout.
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Reads configuration from `TESSERA_MONGODB_*` environment
    /// variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(uri) = std::env::var("TESSERA_MONGODB_URI") {
            config.uri = uri;
        }
        if let Ok(app_name) = std::env::var("TESSERA_MONGODB_APP_NAME") {
            config.app_name = app_name;
        }
        if let Ok(value) = std::env::var("TESSERA_MONGODB_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = value.parse() {
                config.connect_timeout_secs = secs;
            }
        }
        config
    }
}
