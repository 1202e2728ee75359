use crate::common::REPLICA_SET_OPTION;
use crate::connection::ConnectionString;

/// Deployment shape the in-memory store imitates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// A single node. Multi-document transactions are unavailable.
    Standalone,
    /// A named replica set. Transactions are available.
    ReplicaSet(String),
}

#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    topology: Topology,
}

impl MemoryStoreConfig {
    pub fn new() -> Self {
        MemoryStoreConfig {
            topology: Topology::Standalone,
        }
    }

    pub fn replica_set(name: &str) -> Self {
        MemoryStoreConfig {
            topology: Topology::ReplicaSet(name.to_string()),
        }
    }

    /// Reads the topology from the `replicaSet` option of a connection string.
    pub fn from_connection_string(connection_string: &ConnectionString) -> Self {
        match connection_string.option(REPLICA_SET_OPTION) {
            Some(name) if !name.is_empty() => MemoryStoreConfig::replica_set(name),
            _ => MemoryStoreConfig::new(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn supports_transactions(&self) -> bool {
        matches!(self.topology, Topology::ReplicaSet(_))
    }
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        MemoryStoreConfig::new()
    }
}
