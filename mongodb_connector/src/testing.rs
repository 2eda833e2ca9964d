//! Deterministic stand-ins for the driver, shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Once,
    },
    time::Duration,
};

use async_trait::async_trait;
use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::{
    ClientFactory, ClientSettings, ConnectionTarget, ConnectorConfig, DocumentClient, Timestamp,
};

static TRACING: Once = Once::new();

/// Installs the test subscriber once. Output is only printed when `TEST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var("TEST_LOG").is_err() {
            return;
        }
        LogTracer::init().expect("Failed to set logger");
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let formatting_layer =
            BunyanFormattingLayer::new("mongodb_connector".into(), std::io::stdout);
        let subscriber = Registry::default()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(formatting_layer);
        set_global_default(subscriber).expect("Failed to set subscriber");
    });
}

pub fn test_config() -> ConnectorConfig {
    ConnectorConfig {
        hosts: Some("rs0/host1:27017,host2:27017".to_string()),
        ..Default::default()
    }
}

pub fn test_settings() -> ClientSettings {
    ClientSettings::from_config(&test_config()).unwrap()
}

/// What every fake client reports.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    pub databases: Vec<String>,
    pub collections: HashMap<String, Vec<String>>,
    /// Replies keyed by the command's first field name.
    pub replies: HashMap<String, serde_json::Value>,
    pub operation_time: Timestamp,
}

impl FakeServer {
    pub fn with_database(mut self, database: &str, collections: &[&str]) -> Self {
        self.databases.push(database.to_string());
        self.collections.insert(
            database.to_string(),
            collections.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn with_reply(mut self, command: &str, reply: serde_json::Value) -> Self {
        self.replies.insert(command.to_string(), reply);
        self
    }
}

pub struct FakeClient {
    server: FakeServer,
    target: ConnectionTarget,
    fail_close: bool,
    close_attempts: Arc<AtomicUsize>,
    database_list_calls: Arc<AtomicUsize>,
    hello_databases: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl DocumentClient for FakeClient {
    async fn list_database_names(&self) -> anyhow::Result<Vec<String>> {
        self.database_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.server.databases.clone())
    }

    async fn list_collection_names(&self, database: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .server
            .collections
            .get(database)
            .cloned()
            .unwrap_or_default())
    }

    async fn run_command(
        &self,
        _database: &str,
        command: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let name = command
            .as_object()
            .and_then(|c| c.keys().next().cloned())
            .unwrap_or_default();
        self.server
            .replies
            .get(&name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such command: '{}'", name))
    }

    async fn hello(&self, database: &str) -> anyhow::Result<Timestamp> {
        self.hello_databases
            .lock()
            .unwrap()
            .push(database.to_string());
        Ok(self.server.operation_time)
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.close_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(anyhow::anyhow!(
                "socket already closed for {}",
                self.target.connection_string
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeClientFactory {
    server: FakeServer,
    fail_close_for: Option<String>,
    slow_create_for: Option<(String, Duration)>,
    created: Mutex<Vec<ConnectionTarget>>,
    close_attempts: Arc<AtomicUsize>,
    database_list_calls: Arc<AtomicUsize>,
    hello_databases: Arc<Mutex<Vec<String>>>,
}

impl FakeClientFactory {
    pub fn new(server: FakeServer) -> Self {
        Self {
            server,
            ..Default::default()
        }
    }

    /// Clients whose connection string mentions `needle` fail to close.
    pub fn fail_close_for(mut self, needle: &str) -> Self {
        self.fail_close_for = Some(needle.to_string());
        self
    }

    /// Creating a client whose connection string mentions `needle` takes `delay`.
    pub fn slow_create_for(mut self, needle: &str, delay: Duration) -> Self {
        self.slow_create_for = Some((needle.to_string(), delay));
        self
    }

    pub fn created(&self) -> Vec<ConnectionTarget> {
        self.created.lock().unwrap().clone()
    }

    pub fn close_attempts(&self) -> usize {
        self.close_attempts.load(Ordering::SeqCst)
    }

    pub fn database_list_calls(&self) -> usize {
        self.database_list_calls.load(Ordering::SeqCst)
    }

    pub fn hello_databases(&self) -> Vec<String> {
        self.hello_databases.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientFactory for FakeClientFactory {
    async fn create(
        &self,
        target: &ConnectionTarget,
        _settings: &ClientSettings,
    ) -> anyhow::Result<Arc<dyn DocumentClient>> {
        self.created.lock().unwrap().push(target.clone());
        if let Some((needle, delay)) = &self.slow_create_for {
            if target.connection_string.contains(needle.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }
        let fail_close = self
            .fail_close_for
            .as_ref()
            .map(|needle| target.connection_string.contains(needle.as_str()))
            .unwrap_or(false);
        Ok(Arc::new(FakeClient {
            server: self.server.clone(),
            target: target.clone(),
            fail_close,
            close_attempts: self.close_attempts.clone(),
            database_list_calls: self.database_list_calls.clone(),
            hello_databases: self.hello_databases.clone(),
        }))
    }
}
