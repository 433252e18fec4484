//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address, in the form accepted on the command line.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Default address of the external coordination store.
pub const DEFAULT_COORDINATION_ADDR: &str = "localhost:6379";
/// Default file served at `/`.
pub const DEFAULT_INDEX_PATH: &str = "index.html";
/// Default number of undelivered payloads an observer may hold.
pub const DEFAULT_OBSERVER_QUEUE_CAPACITY: usize = 256;

/// Configuration for the textsync server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// Address of the external coordination store. Recognized and logged,
    /// but the server runs single-instance and never connects to it.
    pub coordination_addr: String,
    /// File served at `/`.
    pub index_path: PathBuf,
    /// Undelivered payloads an observer may hold before it is dropped.
    pub observer_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            coordination_addr: DEFAULT_COORDINATION_ADDR.to_string(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            observer_queue_capacity: DEFAULT_OBSERVER_QUEUE_CAPACITY,
        }
    }
}

/// Builder for server configuration.
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn coordination_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.coordination_addr = addr.into();
        self
    }

    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = path.into();
        self
    }

    pub fn observer_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.observer_queue_capacity = capacity;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
