//! Store selection settings read from an opaque key/value configuration.

use std::collections::HashMap;

use serde::de::value::MapDeserializer;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::memory_log::MemoryStore;

/// Which request log implementation to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogKind {
    /// The in-memory ring, holding at most `size` requests.
    Memory { size: usize },
    /// The relational store reached through `connection`.
    Sql { connection: ConnectionSource },
}

/// Where the relational store's connection string comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionSource {
    /// A name in the host's table of named connection strings.
    Named(String),
    /// A connection string given inline.
    Url(String),
    /// An environment variable holding the connection string.
    AppKey(String),
    /// A connection the host handed over directly; there is nothing to resolve.
    Provided,
}

impl ConnectionSource {
    /// Resolves the connection string. An unknown name resolves to an empty string.
    pub fn resolve(&self, named: &HashMap<String, String>) -> Option<String> {
        match self {
            Self::Named(name) => Some(named.get(name).cloned().unwrap_or_default()),
            Self::Url(url) => Some(url.clone()),
            Self::AppKey(key) => dotenvy::var(key).ok(),
            Self::Provided => None,
        }
    }
}

/// Parsed request log configuration.
///
/// | Key                      | Meaning                                               |
/// |--------------------------|-------------------------------------------------------|
/// | `type`                   | `memory` (default), `sql`, `relational` or `database` |
/// | `size`                   | memory capacity, clamped to `[0, 500]`                |
/// | `connectionString`       | database URL                                          |
/// | `connectionStringName`   | name of a host-provided connection string             |
/// | `connectionStringAppKey` | environment variable holding the database URL         |
/// | `applicationName`        | explicit application scope                            |
/// | `autoMigrate`            | run the bundled migrations after connecting           |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub kind: LogKind,
    pub application_name: Option<String>,
    pub auto_migrate: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            kind: LogKind::Memory {
                size: MemoryStore::DEFAULT_SIZE,
            },
            application_name: None,
            auto_migrate: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawSettings {
    #[serde(rename = "type")]
    kind: String,
    size: String,
    connection_string: String,
    connection_string_name: String,
    connection_string_app_key: String,
    application_name: String,
    auto_migrate: String,
}

impl LogSettings {
    /// Parses settings from a configuration section.
    ///
    /// An empty map yields the defaults. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unknown `type`, a `size` or `autoMigrate` that does not
    /// parse, or a relational store with no connection string source.
    pub fn from_map(config: &HashMap<String, String>) -> Result<Self> {
        let pairs = config.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let raw = RawSettings::deserialize(MapDeserializer::<_, serde::de::value::Error>::new(
            pairs,
        ))
        .map_err(|e| Error::Config(e.to_string()))?;

        let kind = match raw.kind.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => LogKind::Memory {
                size: parse_size(raw.size.trim())?,
            },
            "sql" | "relational" | "database" => LogKind::Sql {
                connection: connection_source(&raw)?,
            },
            other => {
                return Err(Error::Config(format!("unknown request log type `{other}`")));
            }
        };

        let auto_migrate = match raw.auto_migrate.trim().to_ascii_lowercase().as_str() {
            "" | "false" => false,
            "true" => true,
            other => {
                return Err(Error::Config(format!(
                    "`autoMigrate` must be true or false, got `{other}`"
                )));
            }
        };

        Ok(Self {
            kind,
            application_name: Some(raw.application_name).filter(|name| !name.is_empty()),
            auto_migrate,
        })
    }
}

fn parse_size(size: &str) -> Result<usize> {
    if size.is_empty() {
        return Ok(MemoryStore::DEFAULT_SIZE);
    }
    let size: i64 = size
        .parse()
        .map_err(|_| Error::Config(format!("`size` is not a number: `{size}`")))?;
    Ok(MemoryStore::clamped(size).capacity())
}

fn connection_source(raw: &RawSettings) -> Result<ConnectionSource> {
    if !raw.connection_string_name.is_empty() {
        Ok(ConnectionSource::Named(raw.connection_string_name.clone()))
    } else if !raw.connection_string.is_empty() {
        Ok(ConnectionSource::Url(raw.connection_string.clone()))
    } else if !raw.connection_string_app_key.is_empty() {
        Ok(ConnectionSource::AppKey(raw.connection_string_app_key.clone()))
    } else {
        Err(Error::Config(
            "a relational request log needs `connectionString`, `connectionStringName` or `connectionStringAppKey`".into(),
        ))
    }
}
