use std::sync::Arc;

use super::{
    ConnectionOptions, ConnectionString, DatabaseConnection, PlainTextSecretProvider,
    SecretProvider,
};
use crate::common::MEMORY_SCHEME;
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use crate::repository::{EnglishPluralizer, Pluralizer};
use crate::store::memory::{MemoryStore, MemoryStoreConfig};
use crate::store::{DocumentStore, DocumentStoreProvider};

/// Builder for a [DatabaseConnection].
///
/// Setters never fail. The first configuration error is kept and reported by
/// [connect](ConnectionBuilder::connect). Secrets are decrypted once, at connect time,
/// with the provider configured on the builder.
///
/// # Examples
///
/// ```rust,ignore
/// let connection = DatabaseConnection::builder()
///     .secret_provider(Aes256GcmSecretProvider::from_base64_key(&key)?)
///     .options(ConnectionOptions::from_env()?)
///     .connect()?;
/// ```
pub struct ConnectionBuilder {
    error: Option<DocRepoError>,
    connection_string: Option<String>,
    database: Option<String>,
    secret_provider: Arc<dyn SecretProvider>,
    pluralizer: Arc<dyn Pluralizer>,
    store: Option<DocumentStore>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        ConnectionBuilder {
            error: None,
            connection_string: None,
            database: None,
            secret_provider: Arc::new(PlainTextSecretProvider),
            pluralizer: Arc::new(EnglishPluralizer::new()),
            store: None,
        }
    }

    pub fn options(self, options: ConnectionOptions) -> Self {
        self.connection_string(options.connection_string())
            .database(options.database())
    }

    pub fn connection_string(mut self, connection_string: &str) -> Self {
        if self.error.is_none() {
            if connection_string.trim().is_empty() {
                self.error = Some(invalid("Connection string cannot be empty"));
            } else {
                self.connection_string = Some(connection_string.to_string());
            }
        }
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        if self.error.is_none() {
            if database.trim().is_empty() {
                self.error = Some(invalid("Database name cannot be empty"));
            } else {
                self.database = Some(database.to_string());
            }
        }
        self
    }

    pub fn secret_provider<S: SecretProvider + 'static>(mut self, provider: S) -> Self {
        self.secret_provider = Arc::new(provider);
        self
    }

    pub fn pluralizer<P: Pluralizer + 'static>(mut self, pluralizer: P) -> Self {
        self.pluralizer = Arc::new(pluralizer);
        self
    }

    /// Uses `store` instead of opening one from the connection string.
    pub fn store<S: DocumentStoreProvider + 'static>(mut self, store: S) -> Self {
        self.store = Some(DocumentStore::new(store));
        self
    }

    pub fn connect(self) -> DocRepoResult<DatabaseConnection> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let connection_string = match &self.connection_string {
            Some(ciphertext) => Some(ConnectionString::parse(
                &self.secret_provider.decrypt(ciphertext)?,
            )?),
            None => None,
        };

        let database = match &self.database {
            Some(ciphertext) => self.secret_provider.decrypt(ciphertext)?,
            None => connection_string
                .as_ref()
                .and_then(|cs| cs.database())
                .unwrap_or_default()
                .to_string(),
        };
        if database.trim().is_empty() {
            return Err(invalid("Database name is required"));
        }

        let store = match (self.store, &connection_string) {
            (Some(store), _) => store,
            (None, Some(connection_string)) => open_store(connection_string)?,
            (None, None) => {
                return Err(invalid("Either a connection string or a store is required"))
            }
        };

        Ok(DatabaseConnection::new(store, database, self.pluralizer))
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        ConnectionBuilder::new()
    }
}

fn open_store(connection_string: &ConnectionString) -> DocRepoResult<DocumentStore> {
    match connection_string.scheme() {
        MEMORY_SCHEME => {
            log::debug!("Opening in-memory store for {}", connection_string);
            let config = MemoryStoreConfig::from_connection_string(connection_string);
            Ok(DocumentStore::new(MemoryStore::new(config)))
        }
        scheme => {
            log::error!("No bundled store for scheme {}", scheme);
            Err(DocRepoError::new(
                &format!(
                    "Unsupported scheme {}, supply a store for this deployment",
                    scheme
                ),
                ErrorKind::InvalidConfiguration,
            ))
        }
    }
}

fn invalid(message: &str) -> DocRepoError {
    log::error!("{}", message);
    DocRepoError::new(message, ErrorKind::InvalidConfiguration)
}
