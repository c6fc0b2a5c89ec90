//! ScyllaDB client and schema management for the memory subsystem (§6 Persistence).

use std::sync::Arc;
use std::time::Duration;

use scylla::{Session, SessionBuilder};

use crate::error::MemoryError;
use crate::schema;
use nexus_config::DatabaseSettings;

/// Wide-column store client wrapper, shared (cheaply, via `Arc`) across all repositories.
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    keyspace: String,
}

impl ScyllaClient {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, MemoryError> {
        tracing::info!(host = %settings.host, port = settings.port, keyspace = %settings.name, "connecting to ScyllaDB");

        let node = format!("{}:{}", settings.host, settings.port);
        let mut builder = SessionBuilder::new()
            .known_node(&node)
            .connection_timeout(Duration::from_secs(settings.connection_timeout_s));

        if !settings.user.is_empty() {
            builder = builder.user(&settings.user, &settings.password);
        }

        let session = builder.build().await?;

        Ok(Self { session: Arc::new(session), keyspace: settings.name.clone() })
    }

    pub async fn ensure_schema(&self) -> Result<(), MemoryError> {
        schema::create_keyspace(&self.session, &self.keyspace).await?;
        schema::create_tables(&self.session, &self.keyspace).await?;
        tracing::info!(keyspace = %self.keyspace, "memory subsystem schema ensured");
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }
}
