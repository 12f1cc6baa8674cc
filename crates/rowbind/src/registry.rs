//! Named connections.

use std::collections::BTreeMap;

use crate::config::RegistryConfig;
use crate::connection::Connection;
use crate::error::{DbError, DbResult};

/// Name of the connection returned by [`Registry::default_connection`].
pub const DEFAULT_CONNECTION: &str = "default";

/// A name → [`Connection`] map.
///
/// The registry is an ordinary value owned by the caller; there is no global
/// instance. Adding a connection also names it.
#[derive(Debug, Default)]
pub struct Registry {
    connections: BTreeMap<String, Connection>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and register every connection described by `config`.
    pub fn from_config(config: &RegistryConfig) -> DbResult<Self> {
        let mut registry = Self::new();
        for (name, conn_config) in &config.connections {
            let conn = conn_config.open()?;
            tracing::debug!(
                target: "rowbind.registry",
                connection = %name,
                driver = conn.driver_tag(),
                "opened connection"
            );
            registry.add(name, conn);
        }
        Ok(registry)
    }

    /// Register `conn` under `name`, replacing any connection already there.
    ///
    /// Returns the replaced connection.
    pub fn add(&mut self, name: &str, conn: Connection) -> Option<Connection> {
        conn.set_name(name);
        self.connections.insert(name.to_string(), conn)
    }

    pub fn get(&self, name: &str) -> DbResult<Connection> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::ConnectionNotFound(name.to_string()))
    }

    /// The connection registered as [`DEFAULT_CONNECTION`].
    pub fn default_connection(&self) -> DbResult<Connection> {
        self.get(DEFAULT_CONNECTION)
    }

    /// Unregister `name`. Removing an unknown name is not an error.
    pub fn remove(&mut self, name: &str) -> Option<Connection> {
        self.connections.remove(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
