//! The boundary to the low-level driver.
//!
//! The connector never talks to the wire itself. A [`ClientFactory`] turns a
//! [`ConnectionTarget`] into a [`DocumentClient`], and everything above that works with
//! the trait objects only.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{connection_string::redact, ConfigError, ConnectorConfig, ReadPreference};

/// A server-reported logical timestamp: seconds since the epoch plus an ordinal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// A connected client as provided by the driver.
///
/// Implementations must be safe to share between capture tasks.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn list_database_names(&self) -> anyhow::Result<Vec<String>>;

    async fn list_collection_names(&self, database: &str) -> anyhow::Result<Vec<String>>;

    /// Runs `command` against `database` and returns the server's reply document.
    async fn run_command(
        &self,
        database: &str,
        command: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value>;

    /// Runs the liveness command against `database` and returns the server's operation time.
    async fn hello(&self, database: &str) -> anyhow::Result<Timestamp>;

    async fn close(&self) -> anyhow::Result<()>;
}

/// Creates driver clients. Creation should not block on reaching the server.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        target: &ConnectionTarget,
        settings: &ClientSettings,
    ) -> anyhow::Result<Arc<dyn DocumentClient>>;
}

/// A resolved pool key: the effective connection string and the read preference.
///
/// `Display` and `Debug` mask the password.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    pub connection_string: String,
    pub read_preference: Option<ReadPreference>,
}

impl ConnectionTarget {
    pub fn new(connection_string: impl Into<String>, read_preference: Option<ReadPreference>) -> Self {
        Self {
            connection_string: connection_string.into(),
            read_preference,
        }
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.read_preference {
            Some(pref) => write!(f, "{} ({})", redact(&self.connection_string), pref),
            None => write!(f, "{}", redact(&self.connection_string)),
        }
    }
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("connection_string", &redact(&self.connection_string))
            .field("read_preference", &self.read_preference)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
    pub source: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsSettings {
    pub allow_invalid_hostnames: bool,
}

/// Driver settings shared by every client in the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub credential: Option<Credential>,
    pub tls: Option<TlsSettings>,
    pub connect_timeout: Duration,
    pub socket_timeout: Option<Duration>,
    pub server_selection_timeout: Duration,
    pub heartbeat_frequency: Duration,
    /// Talk to the listed host only instead of discovering the other members.
    pub direct_connection: bool,
}

impl ClientSettings {
    /// Derives the settings from the configuration.
    ///
    /// Credentials in the connection string are used unless `user` or `password` is
    /// configured, in which case those win.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ConfigError> {
        let seed = config.connection_seed()?;

        let from_seed = seed.username().map(|username| Credential {
            username: username.into_owned(),
            password: seed.password().map(|p| p.into_owned()).unwrap_or_default(),
            source: seed
                .option("authSource")
                .or(seed.database())
                .unwrap_or(config.auth_source.as_str())
                .to_string(),
        });
        let from_properties = (config.user.is_some() || config.password.is_some()).then(|| {
            Credential {
                username: config.user.clone().unwrap_or_default(),
                password: config.password.clone().unwrap_or_default(),
                source: config.auth_source.clone(),
            }
        });

        Ok(Self {
            credential: from_properties.or(from_seed),
            tls: config.ssl_enabled.then_some(TlsSettings {
                allow_invalid_hostnames: config.ssl_allow_invalid_hostnames,
            }),
            connect_timeout: config.connect_timeout(),
            socket_timeout: config.socket_timeout(),
            server_selection_timeout: config.server_selection_timeout(),
            heartbeat_frequency: config.heartbeat_frequency(),
            direct_connection: !config.auto_discover_members,
        })
    }
}
