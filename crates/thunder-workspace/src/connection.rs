//! Active backend connection

use std::sync::Arc;

use thunder_core::{Backend, ConnectionInfo, Result};

/// Tracks the open connections and which one is active.
///
/// Schema and table names are only meaningful relative to the active
/// connection; its id keys the schema cache.
pub struct ConnectionContext {
    backend: Arc<dyn Backend>,
    connections: Vec<ConnectionInfo>,
    active: Option<ConnectionInfo>,
}

impl ConnectionContext {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            connections: Vec::new(),
            active: None,
        }
    }

    /// Reload the connection list. On failure the previous list is kept.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<()> {
        let connections = match self.backend.get_active_connections().await.into_result() {
            Ok(connections) => connections,
            Err(err) => {
                tracing::error!(error = %err, "failed to get active connections");
                return Err(err.into());
            }
        };
        self.active = connections.iter().find(|c| c.is_active).cloned();
        self.connections = connections;
        tracing::debug!(
            count = self.connections.len(),
            active = ?self.active_connection_id(),
            "connections refreshed"
        );
        Ok(())
    }

    /// Make `connection_id` the active connection and reload the list.
    ///
    /// Returns false if the backend declined without reporting an error.
    #[tracing::instrument(skip(self))]
    pub async fn switch_to(&mut self, connection_id: &str) -> Result<bool> {
        let switched = self
            .backend
            .switch_connection(connection_id)
            .await
            .into_result()
            .inspect_err(|err| tracing::error!(error = %err, "failed to switch connection"))?;
        if switched {
            self.refresh().await?;
        }
        Ok(switched)
    }

    /// Disconnect and forget a connection
    #[tracing::instrument(skip(self))]
    pub async fn remove(&mut self, connection_id: &str) -> Result<bool> {
        let removed = self
            .backend
            .disconnect_connection(connection_id)
            .await
            .into_result()
            .inspect_err(|err| tracing::error!(error = %err, "failed to disconnect"))?;
        if removed {
            self.refresh().await?;
        }
        Ok(removed)
    }

    pub fn connections(&self) -> &[ConnectionInfo] {
        &self.connections
    }

    pub fn active_connection(&self) -> Option<&ConnectionInfo> {
        self.active.as_ref()
    }

    pub fn active_connection_id(&self) -> Option<String> {
        self.active.as_ref().map(|c| c.id.clone())
    }
}
