use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::backend::{self, MemoryBackend, MemoryClient};
use crate::store::ResourceStore;

/// Runs one [`MemoryBackend`] per resource type and hands out stores wired to them.
///
/// `MemoryServer` is responsible for:
/// - **Lifecycle Management**: spawning backends and stopping them on shutdown
/// - **Dependency Wiring**: giving every [`ResourceStore`] the client of its type
///
/// # Example
///
/// ```ignore
/// let mut server = MemoryServer::new();
/// let widgets = server.store("widgets");
///
/// widgets.create(NewResource::new("widgets").with_attribute("title", "Baz")).await?;
///
/// server.shutdown().await?;
/// ```
pub struct MemoryServer {
    clients: HashMap<String, MemoryClient>,
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            clients: HashMap::new(),
            handles: Vec::new(),
            shutdown,
        }
    }
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a preconfigured backend (seeded, validated, ...) for its type.
    ///
    /// Replaces any backend already registered for that type; the old one
    /// stops once its clients are dropped, or at shutdown.
    pub fn register(&mut self, backend: MemoryBackend, client: MemoryClient) {
        let resource_type = backend.resource_type().to_string();
        info!(%resource_type, "Registering backend");
        self.handles.push(tokio::spawn(backend.run_until(self.shutdown.subscribe())));
        self.clients.insert(resource_type, client);
    }

    /// Client for `resource_type`, spawning a default backend if none is running.
    pub fn client(&mut self, resource_type: &str) -> MemoryClient {
        if let Some(client) = self.clients.get(resource_type) {
            return client.clone();
        }
        let (backend, client) = backend::new(resource_type);
        self.register(backend, client.clone());
        client
    }

    /// A new store for `resource_type`, backed by that type's backend.
    pub fn store(&mut self, resource_type: &str) -> ResourceStore {
        let client = self.client(resource_type);
        ResourceStore::new(resource_type, Arc::new(client))
    }

    /// Gracefully shuts down every backend.
    ///
    /// # Shutdown Process
    ///
    /// The server signals every backend to stop, then waits for each backend
    /// loop to end. Stores and records that outlive the server keep their
    /// cached data; their requests fail with `ClientError::BackendClosed`.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        info!(backends = self.handles.len(), "Shutting down server...");
        self.shutdown.send_replace(true);
        drop(self.clients);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Backend task failed: {:?}", e);
                return Err(e);
            }
        }

        info!("Server shutdown complete.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::model::{NewResource, QueryOptions};
    use crate::store::Record;

    #[tokio::test]
    async fn test_stores_of_one_type_share_a_backend() {
        let mut server = MemoryServer::new();
        let first = server.store("widgets");
        let second = server.store("widgets");

        let created = first
            .create(NewResource::new("widgets").with_attribute("title", "Baz"))
            .await
            .unwrap();
        let loaded = second.load_by_id(created.id(), QueryOptions::new()).await.unwrap();

        assert_eq!(loaded.attribute("title"), created.attribute("title"));
        assert!(!Record::ptr_eq(&loaded, &created));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_with_live_stores_and_records() {
        let mut server = MemoryServer::new();
        let widgets = server.store("widgets");
        let created = widgets
            .create(NewResource::new("widgets").with_attribute("title", "Baz"))
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), server.shutdown())
            .await
            .expect("shutdown waited on live records")
            .unwrap();

        // Cached data survives; requests report the closed backend
        assert_eq!(widgets.by_id(created.id()).unwrap().attribute("title"), created.attribute("title"));
        assert_eq!(created.save().await.unwrap_err(), ClientError::BackendClosed);
        assert!(created.error());
    }
}
