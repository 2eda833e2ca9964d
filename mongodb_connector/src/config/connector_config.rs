use std::time::Duration;

use serde::Deserialize;

use crate::{
    connection_string::{redact, ConnectionString},
    host_utils, ConfigError, ConnectorConfigBuilder, Filters,
};

/// Whether the connector captures the whole deployment or a single database.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureScope {
    #[default]
    Deployment,
    Database,
}

/// Connector settings consumed by the connection layer.
///
/// Every field has a default, so a configuration document only needs to name
/// `hosts` or `connection_string`. `Debug` masks the password, including one embedded in
/// the connection string.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub hosts: Option<String>,
    pub connection_string: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub auth_source: String,
    pub ssl_enabled: bool,
    pub ssl_allow_invalid_hostnames: bool,
    pub connect_timeout_ms: u64,
    pub heartbeat_frequency_ms: u64,
    /// `0` disables the socket timeout.
    pub socket_timeout_ms: u64,
    pub server_selection_timeout_ms: u64,
    pub auto_discover_members: bool,
    pub poll_interval_ms: u64,
    pub connect_backoff_ms: u64,
    pub database_include_list: Vec<String>,
    pub database_exclude_list: Vec<String>,
    pub collection_include_list: Vec<String>,
    pub collection_exclude_list: Vec<String>,
    pub capture_scope: CaptureScope,
    pub capture_target: Option<String>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            hosts: None,
            connection_string: None,
            user: None,
            password: None,
            auth_source: "admin".to_string(),
            ssl_enabled: false,
            ssl_allow_invalid_hostnames: false,
            connect_timeout_ms: 10_000,
            heartbeat_frequency_ms: 10_000,
            socket_timeout_ms: 0,
            server_selection_timeout_ms: 30_000,
            auto_discover_members: true,
            poll_interval_ms: 30_000,
            connect_backoff_ms: 1_000,
            database_include_list: Vec::new(),
            database_exclude_list: Vec::new(),
            collection_include_list: Vec::new(),
            collection_exclude_list: Vec::new(),
            capture_scope: CaptureScope::default(),
            capture_target: None,
        }
    }
}

impl std::fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("hosts", &self.hosts)
            .field(
                "connection_string",
                &self.connection_string.as_deref().map(redact),
            )
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("auth_source", &self.auth_source)
            .field("ssl_enabled", &self.ssl_enabled)
            .field("ssl_allow_invalid_hostnames", &self.ssl_allow_invalid_hostnames)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("heartbeat_frequency_ms", &self.heartbeat_frequency_ms)
            .field("socket_timeout_ms", &self.socket_timeout_ms)
            .field("server_selection_timeout_ms", &self.server_selection_timeout_ms)
            .field("auto_discover_members", &self.auto_discover_members)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("connect_backoff_ms", &self.connect_backoff_ms)
            .field("database_include_list", &self.database_include_list)
            .field("database_exclude_list", &self.database_exclude_list)
            .field("collection_include_list", &self.collection_include_list)
            .field("collection_exclude_list", &self.collection_exclude_list)
            .field("capture_scope", &self.capture_scope)
            .field("capture_target", &self.capture_target)
            .finish()
    }
}

impl ConnectorConfig {
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::default()
    }

    /// Decodes and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ConnectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_none() && self.connection_string.is_none() {
            tracing::error!("Neither hosts nor a connection string were configured");
            return Err(ConfigError::MissingHostsError);
        }
        if !self.database_include_list.is_empty() && !self.database_exclude_list.is_empty() {
            return Err(ConfigError::ConflictingFilters {
                include: "database_include_list",
                exclude: "database_exclude_list",
            });
        }
        if !self.collection_include_list.is_empty() && !self.collection_exclude_list.is_empty() {
            return Err(ConfigError::ConflictingFilters {
                include: "collection_include_list",
                exclude: "collection_exclude_list",
            });
        }
        Filters::from_config(self)?;
        self.connection_seed()?;
        Ok(())
    }

    /// The initial address: the connection string when configured, else one built from `hosts`.
    pub fn connection_seed(&self) -> Result<ConnectionString, ConfigError> {
        let seed = match (&self.connection_string, &self.hosts) {
            (Some(cs), _) => cs.clone(),
            (None, Some(hosts)) => {
                let host = host_utils::parse_host(hosts).unwrap_or(hosts.as_str());
                format!("mongodb://{}/", host)
            }
            (None, None) => return Err(ConfigError::MissingHostsError),
        };
        ConnectionString::parse(&seed).map_err(|source| ConfigError::InvalidConnectionString {
            value: redact(&seed).into_owned(),
            source,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn heartbeat_frequency(&self) -> Duration {
        Duration::from_millis(self.heartbeat_frequency_ms)
    }

    pub fn socket_timeout(&self) -> Option<Duration> {
        (self.socket_timeout_ms > 0).then(|| Duration::from_millis(self.socket_timeout_ms))
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}
