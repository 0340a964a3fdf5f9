use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::domain::customer::CommandHandlerConfig;
use crate::utils::RetryConfig;

/// Which record store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Memory,
    Scylla,
}

/// Customer credit service. Every flag can also be set from the environment.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, env = "CUSTOMER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "CUSTOMER_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Record store backend
    #[arg(long, env = "CUSTOMER_STORE", value_enum, default_value_t = StoreBackend::Memory)]
    pub store: StoreBackend,

    #[arg(long, env = "SCYLLA_NODE", default_value = "127.0.0.1:9042")]
    pub scylla_node: String,

    #[arg(long, env = "SCYLLA_KEYSPACE", default_value = "customer_ks")]
    pub scylla_keyspace: String,

    /// Deadline for a single request, store round trips included
    #[arg(long, env = "CUSTOMER_REQUEST_TIMEOUT_MS", default_value_t = 1000)]
    pub request_timeout_ms: u64,

    /// Attempts at a read-decide-write cycle before giving up on contention
    #[arg(long, env = "CUSTOMER_MAX_CONFLICT_RETRIES", default_value_t = 10)]
    pub max_conflict_retries: u32,

    /// Extra path prefix the customer API is also served under
    #[arg(long, env = "CUSTOMER_ROUTE_PREFIX")]
    pub route_prefix: Option<String>,

    /// Topic recorded on outbox events
    #[arg(long, env = "CUSTOMER_OUTBOX_TOPIC", default_value = "customer-service-event")]
    pub outbox_topic: String,

    /// Answer every failure with a plain 500 instead of a per-kind status
    #[arg(long, env = "CUSTOMER_COLLAPSE_ERRORS", default_value_t = false)]
    pub collapse_errors: bool,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn command_handler_config(&self) -> CommandHandlerConfig {
        CommandHandlerConfig {
            request_timeout: self.request_timeout(),
            retry: RetryConfig::with_max_attempts(self.max_conflict_retries),
            outbox_topic: self.outbox_topic.clone(),
        }
    }

    /// Route prefix without surrounding slashes; `None` when unset or blank
    pub fn normalized_route_prefix(&self) -> Option<String> {
        self.route_prefix
            .as_deref()
            .map(|prefix| prefix.trim_matches('/'))
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string)
    }
}
