use tracing::instrument;

use crate::{CaptureScope, ConfigError, ConnectorConfig};

/// Builds a validated [`ConnectorConfig`].
///
/// The builder can be kept as a template: [`ConnectorConfigBuilder::build`] may be called
/// more than once.
#[derive(Debug, Default)]
pub struct ConnectorConfigBuilder {
    config: ConnectorConfig,
}

impl ConnectorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_hosts(mut self, hosts: &str) -> Self {
        self.config.hosts = Some(hosts.to_string());
        self
    }

    pub fn set_connection_string(mut self, connection_string: &str) -> Self {
        self.config.connection_string = Some(connection_string.to_string());
        self
    }

    pub fn set_credentials(mut self, user: &str, password: &str) -> Self {
        self.config.user = Some(user.to_string());
        self.config.password = Some(password.to_string());
        self
    }

    pub fn set_auth_source(mut self, auth_source: &str) -> Self {
        self.config.auth_source = auth_source.to_string();
        self
    }

    pub fn set_ssl(mut self, enabled: bool, allow_invalid_hostnames: bool) -> Self {
        self.config.ssl_enabled = enabled;
        self.config.ssl_allow_invalid_hostnames = allow_invalid_hostnames;
        self
    }

    pub fn set_connect_timeout_ms(mut self, millis: u64) -> Self {
        self.config.connect_timeout_ms = millis;
        self
    }

    pub fn set_heartbeat_frequency_ms(mut self, millis: u64) -> Self {
        self.config.heartbeat_frequency_ms = millis;
        self
    }

    pub fn set_socket_timeout_ms(mut self, millis: u64) -> Self {
        self.config.socket_timeout_ms = millis;
        self
    }

    pub fn set_server_selection_timeout_ms(mut self, millis: u64) -> Self {
        self.config.server_selection_timeout_ms = millis;
        self
    }

    pub fn set_auto_discover_members(mut self, auto_discover: bool) -> Self {
        self.config.auto_discover_members = auto_discover;
        self
    }

    pub fn set_poll_interval_ms(mut self, millis: u64) -> Self {
        self.config.poll_interval_ms = millis;
        self
    }

    pub fn set_connect_backoff_ms(mut self, millis: u64) -> Self {
        self.config.connect_backoff_ms = millis;
        self
    }

    pub fn set_database_include_list<T: AsRef<str>>(mut self, patterns: &[T]) -> Self {
        self.config.database_include_list = to_strings(patterns);
        self
    }

    pub fn set_database_exclude_list<T: AsRef<str>>(mut self, patterns: &[T]) -> Self {
        self.config.database_exclude_list = to_strings(patterns);
        self
    }

    pub fn set_collection_include_list<T: AsRef<str>>(mut self, patterns: &[T]) -> Self {
        self.config.collection_include_list = to_strings(patterns);
        self
    }

    pub fn set_collection_exclude_list<T: AsRef<str>>(mut self, patterns: &[T]) -> Self {
        self.config.collection_exclude_list = to_strings(patterns);
        self
    }

    /// Restricts capture to `database`.
    pub fn set_capture_database(mut self, database: &str) -> Self {
        self.config.capture_scope = CaptureScope::Database;
        self.config.capture_target = Some(database.to_string());
        self
    }

    #[instrument(level = "debug", name = "Build ConnectorConfig", skip(self))]
    pub fn build(&self) -> Result<ConnectorConfig, ConfigError> {
        self.config.validate()?;
        tracing::trace!("Connector configuration: {:?}", &self.config);
        Ok(self.config.clone())
    }
}

fn to_strings<T: AsRef<str>>(values: &[T]) -> Vec<String> {
    values.iter().map(|v| v.as_ref().to_string()).collect()
}
