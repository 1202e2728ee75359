use std::fmt::Debug;

use crate::common::{ENV_CONNECTION_STRING, ENV_DATABASE};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};

/// Connection settings as they appear in configuration.
///
/// Both values may be ciphertext. They are handed to the configured
/// [SecretProvider](crate::connection::SecretProvider) when the connection is built.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionOptions {
    connection_string: String,
    database: String,
}

impl ConnectionOptions {
    pub fn new(connection_string: &str, database: &str) -> Self {
        ConnectionOptions {
            connection_string: connection_string.to_string(),
            database: database.to_string(),
        }
    }

    /// Reads `DOCREPO_CONNECTION_STRING` and `DOCREPO_DATABASE`.
    pub fn from_env() -> DocRepoResult<Self> {
        Ok(ConnectionOptions {
            connection_string: read_env(ENV_CONNECTION_STRING)?,
            database: read_env(ENV_DATABASE)?,
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

impl Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("connection_string", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

fn read_env(name: &str) -> DocRepoResult<String> {
    std::env::var(name).map_err(|e| {
        log::error!("Failed to read {} from the environment: {}", name, e);
        DocRepoError::new(
            &format!("Environment variable {} is not set", name),
            ErrorKind::InvalidConfiguration,
        )
    })
}
