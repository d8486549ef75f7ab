//! Configuration store, typed lookups and constants.
//!
//! `Configuration` is a flat key/value map loaded from TOML. Nested tables are
//! flattened into dotted keys, so `[rest] port = 8081` and `rest.port = 8081`
//! produce the same entry. Consumers read it through the `ConfigSource` trait,
//! which resolves a [`ConfigOption`] against the primary key, its deprecated
//! keys and its default, and parses the typed value.

use std::collections::BTreeMap;
use std::path::Path;

use const_format::formatcp;
use serde::Deserialize;

use crate::options::ConfigOption;
use crate::tls::TlsError;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log target of this crate
pub const LOG_TARGET: &str = "endpoint_config";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = formatcp!("{}=info", LOG_TARGET);

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

/// Read-only, typed access to raw configuration values.
///
/// Implementors only provide `raw`; the typed getters are shared. The getters
/// never mutate the source, so a single source can back concurrent assemblies.
pub trait ConfigSource {
    /// Returns the raw string stored under `key`, if any.
    fn raw(&self, key: &str) -> Option<String>;

    /// Resolves `option`: primary key, then deprecated keys, then the default.
    fn lookup(&self, option: &ConfigOption) -> Option<String> {
        if let Some(value) = self.raw(option.key()) {
            return Some(value);
        }

        for deprecated in option.deprecated_keys() {
            if let Some(value) = self.raw(deprecated) {
                tracing::warn!(
                    deprecated = %deprecated,
                    replacement = %option.key(),
                    "Configuration uses a deprecated key"
                );
                return Some(value);
            }
        }

        option.default_value().map(str::to_string)
    }

    fn get_optional_string(&self, option: &ConfigOption) -> Option<String> {
        self.lookup(option)
    }

    /// Required string. Fails with [`ConfigError::Missing`] when unset and without default.
    fn get_string(&self, option: &ConfigOption) -> Result<String, ConfigError> {
        self.lookup(option).ok_or(ConfigError::Missing { key: option.key() })
    }

    fn get_integer(&self, option: &ConfigOption) -> Result<i64, ConfigError> {
        let value = self.get_string(option)?;
        value
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::invalid(option.key(), &value, e.to_string()))
    }

    fn get_bool(&self, option: &ConfigOption) -> Result<bool, ConfigError> {
        let value = self.get_string(option)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::invalid(
                option.key(),
                &value,
                "expected `true` or `false`",
            )),
        }
    }
}

/// Flat key/value configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "toml::Table")]
pub struct Configuration {
    entries: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(contents)?;
        Self::try_from(table)
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.insert(key.into(), value.to_string());
    }

    /// Builder-style variant of [`Configuration::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ConfigSource for Configuration {
    fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

impl TryFrom<toml::Table> for Configuration {
    type Error = ConfigError;

    fn try_from(table: toml::Table) -> Result<Self, Self::Error> {
        let mut entries = BTreeMap::new();
        flatten("", table, &mut entries)?;
        Ok(Self { entries })
    }
}

fn flatten(
    prefix: &str,
    table: toml::Table,
    entries: &mut BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };

        match value {
            toml::Value::Table(nested) => flatten(&key, nested, entries)?,
            toml::Value::Array(items) => {
                let joined = items
                    .into_iter()
                    .map(|item| scalar(&key, item))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(",");
                entries.insert(key, joined);
            }
            other => {
                let value = scalar(&key, other)?;
                entries.insert(key, value);
            }
        }
    }
    Ok(())
}

fn scalar(key: &str, value: toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        nested @ (toml::Value::Array(_) | toml::Value::Table(_)) => Err(ConfigError::invalid(
            key,
            &nested.to_string(),
            "arrays may only contain scalar values",
        )),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{key} must be set")]
    Missing { key: &'static str },
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Failed to initialize TLS context for REST server endpoint")]
    Tls(#[from] TlsError),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
