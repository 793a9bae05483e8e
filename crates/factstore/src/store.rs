//! Explicit database handle.
//!
//! A [`Store`] owns one `tokio_postgres::Client` and the task driving its
//! connection. Open it once at startup, pass `&store` into entity
//! operations, and call [`Store::close`] at shutdown.

use crate::client::GenericClient;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

pub struct Store {
    client: Client,
    connection: JoinHandle<()>,
}

impl Store {
    /// Connect to `database_url` and spawn the connection task.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "factstore.store", error = %e, "connection closed with error");
            }
        });

        tracing::debug!(target: "factstore.store", "connected");
        Ok(Self { client, connection })
    }

    /// Connect using the URL the configuration selects for its environment.
    pub async fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::connect(config.database_url()?).await
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Mutable access, needed for transactions and migrations.
    pub fn client_mut(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Drop the client and wait for the connection task to finish.
    pub async fn close(self) -> StoreResult<()> {
        let Self { client, connection } = self;
        drop(client);
        connection
            .await
            .map_err(|e| StoreError::Connection(format!("connection task failed: {e}")))?;
        tracing::debug!(target: "factstore.store", "closed");
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

impl GenericClient for Store {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StoreResult<Vec<Row>> {
        GenericClient::query(&self.client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StoreResult<u64> {
        GenericClient::execute(&self.client, sql, params).await
    }
}
