//! # In-memory JSON:API backend
//!
//! An actor that owns every resource of one type and answers the same calls a
//! remote JSON:API server would. Requests arrive over an mpsc channel and are
//! processed one at a time, so the resource list needs no lock.
//!
//! ## Key Types
//!
//! - [`MemoryBackend`]: the actor (server half). Call [`MemoryBackend::run`]
//!   (or [`MemoryBackend::run_until`] with a stop signal) in a task.
//! - [`MemoryClient`]: the cloneable client half; implements [`ResourceApi`].
//! - [`BackendRequest`]: the messages flowing between the two.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::client::{ApiError, ClientError, ResourceApi};
use crate::model::{Document, Filter, NewResource, ParentKey, QueryOptions, Resource};

/// Type alias for the one-shot response channel used by the backend.
pub type Response<T> = oneshot::Sender<Result<T, ClientError>>;

/// Validation hook run on every created or updated resource before it is stored.
pub type Validator = Box<dyn Fn(&Resource) -> Result<(), Vec<ApiError>> + Send + Sync>;

/// Message sent to the backend actor.
///
/// Options are carried along for logging only; the backend does not
/// implement includes or sparse fieldsets.
#[derive(Debug)]
pub enum BackendRequest {
    All {
        options: QueryOptions,
        respond_to: Response<Vec<Resource>>,
    },
    Find {
        id: String,
        options: QueryOptions,
        respond_to: Response<Resource>,
    },
    Where {
        filter: Filter,
        options: QueryOptions,
        respond_to: Response<Vec<Resource>>,
    },
    Related {
        parent: ParentKey,
        options: QueryOptions,
        respond_to: Response<Vec<Resource>>,
    },
    Create {
        resource: NewResource,
        respond_to: Response<Resource>,
    },
    Update {
        resource: Resource,
        respond_to: Response<Resource>,
    },
    Delete {
        id: String,
        respond_to: Response<()>,
    },
}

/// Actor holding the resources of one type.
pub struct MemoryBackend {
    resource_type: String,
    receiver: mpsc::Receiver<BackendRequest>,
    resources: Vec<Resource>,
    next_id_fn: Box<dyn Fn() -> String + Send + Sync>,
    validator: Option<Validator>,
}

impl MemoryBackend {
    pub fn new(
        resource_type: impl Into<String>,
        buffer_size: usize,
        next_id_fn: impl Fn() -> String + Send + Sync + 'static,
    ) -> (Self, MemoryClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let backend = Self {
            resource_type: resource_type.into(),
            receiver,
            resources: Vec::new(),
            next_id_fn: Box::new(next_id_fn),
            validator: None,
        };
        (backend, MemoryClient::new(sender))
    }

    /// Rejects creates and updates for which `validator` returns errors.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Resource) -> Result<(), Vec<ApiError>> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Starts the backend with `resources` already stored.
    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
        self
    }

    /// Runs the actor's event loop, processing messages until every client is dropped.
    pub async fn run(mut self) {
        let resource_type = self.resource_type.clone();
        info!(%resource_type, "Backend started");

        while let Some(msg) = self.receiver.recv().await {
            self.handle(msg);
        }

        info!(%resource_type, size = self.resources.len(), "Shutdown");
    }

    /// Like [`MemoryBackend::run`], but also stops as soon as `shutdown`
    /// flips to `true` (or its sender is dropped), even while clients are
    /// still alive. Later calls from those clients fail with
    /// [`ClientError::BackendClosed`].
    pub async fn run_until(mut self, mut shutdown: watch::Receiver<bool>) {
        let resource_type = self.resource_type.clone();
        info!(%resource_type, "Backend started");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                signalled = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => {
                    if !signalled {
                        debug!(%resource_type, "Shutdown signal dropped");
                    }
                    break;
                }
            }
        }

        info!(%resource_type, size = self.resources.len(), "Shutdown");
    }

    fn handle(&mut self, msg: BackendRequest) {
        let resource_type = self.resource_type.as_str();
        match msg {
            BackendRequest::All { options, respond_to } => {
                debug!(resource_type, %options, "All");
                let _ = respond_to.send(Ok(self.resources.clone()));
            }
            BackendRequest::Find { id, options, respond_to } => {
                let found = self.position(&id).map(|index| self.resources[index].clone());
                debug!(resource_type, %id, %options, found = found.is_some(), "Find");
                let _ = respond_to.send(found.ok_or(ClientError::NotFound(id)));
            }
            BackendRequest::Where { filter, options, respond_to } => {
                let matching = self.select(|resource| filter.matches(&resource.attributes));
                debug!(resource_type, %filter, %options, count = matching.len(), "Where");
                let _ = respond_to.send(Ok(matching));
            }
            BackendRequest::Related { parent, options, respond_to } => {
                let linked = self.select(|resource| resource.links_to(&parent.resource_type, &parent.id));
                debug!(resource_type, %parent, %options, count = linked.len(), "Related");
                let _ = respond_to.send(Ok(linked));
            }
            BackendRequest::Create { resource, respond_to } => {
                debug!(resource_type, ?resource, "Create");
                let result = self.create(resource);
                let _ = respond_to.send(result);
            }
            BackendRequest::Update { resource, respond_to } => {
                debug!(resource_type, ?resource, "Update");
                let result = self.update(resource);
                let _ = respond_to.send(result);
            }
            BackendRequest::Delete { id, respond_to } => {
                debug!(resource_type, %id, "Delete");
                let result = match self.position(&id) {
                    Some(index) => {
                        self.resources.remove(index);
                        info!(resource_type, %id, size = self.resources.len(), "Deleted");
                        Ok(())
                    }
                    None => {
                        warn!(resource_type, %id, "Not found");
                        Err(ClientError::NotFound(id))
                    }
                };
                let _ = respond_to.send(result);
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.resources.iter().position(|resource| resource.id == id)
    }

    fn select(&self, predicate: impl Fn(&Resource) -> bool) -> Vec<Resource> {
        self.resources.iter().filter(|r| predicate(r)).cloned().collect()
    }

    fn check_type(&self, resource_type: &str) -> Result<(), ClientError> {
        if resource_type == self.resource_type {
            return Ok(());
        }
        Err(ClientError::Api(vec![ApiError::new("409", "Conflict").with_detail(format!(
            "type {resource_type} does not match {}",
            self.resource_type
        ))]))
    }

    fn validate(&self, resource: &Resource) -> Result<(), ClientError> {
        match &self.validator {
            Some(validator) => validator(resource).map_err(ClientError::Api),
            None => Ok(()),
        }
    }

    fn create(&mut self, new: NewResource) -> Result<Resource, ClientError> {
        self.check_type(&new.resource_type)?;
        let id = (self.next_id_fn)();
        let resource = new.into_resource(id);

        if let Err(e) = self.validate(&resource) {
            warn!(resource_type = %self.resource_type, error = %e, "Create failed");
            return Err(e);
        }
        self.resources.push(resource.clone());
        info!(resource_type = %self.resource_type, id = %resource.id, size = self.resources.len(), "Created");
        Ok(resource)
    }

    fn update(&mut self, patch: Resource) -> Result<Resource, ClientError> {
        self.check_type(&patch.resource_type)?;
        let Some(index) = self.position(&patch.id) else {
            warn!(resource_type = %self.resource_type, id = %patch.id, "Not found");
            return Err(ClientError::NotFound(patch.id));
        };

        let mut updated = self.resources[index].clone();
        updated.attributes.extend(patch.attributes);
        updated.relationships.extend(patch.relationships);

        if let Err(e) = self.validate(&updated) {
            warn!(resource_type = %self.resource_type, id = %updated.id, error = %e, "Update failed");
            return Err(e);
        }
        self.resources[index] = updated.clone();
        info!(resource_type = %self.resource_type, id = %updated.id, "Updated");
        Ok(updated)
    }
}

/// Client half of a [`MemoryBackend`].
#[derive(Clone)]
pub struct MemoryClient {
    sender: mpsc::Sender<BackendRequest>,
}

impl MemoryClient {
    pub fn new(sender: mpsc::Sender<BackendRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> BackendRequest,
    ) -> Result<T, ClientError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| ClientError::BackendClosed)?;
        response.await.map_err(|_| ClientError::BackendDropped)?
    }
}

#[async_trait]
impl ResourceApi for MemoryClient {
    async fn all(&self, options: &QueryOptions) -> Result<Document<Vec<Resource>>, ClientError> {
        let options = options.clone();
        self.request(|respond_to| BackendRequest::All { options, respond_to })
            .await
            .map(Document::new)
    }

    async fn find(&self, id: &str, options: &QueryOptions) -> Result<Document<Resource>, ClientError> {
        let (id, options) = (id.to_string(), options.clone());
        self.request(|respond_to| BackendRequest::Find { id, options, respond_to })
            .await
            .map(Document::new)
    }

    async fn find_where(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Document<Vec<Resource>>, ClientError> {
        let (filter, options) = (filter.clone(), options.clone());
        self.request(|respond_to| BackendRequest::Where { filter, options, respond_to })
            .await
            .map(Document::new)
    }

    async fn related(
        &self,
        parent: &ParentKey,
        options: &QueryOptions,
    ) -> Result<Document<Vec<Resource>>, ClientError> {
        let (parent, options) = (parent.clone(), options.clone());
        self.request(|respond_to| BackendRequest::Related { parent, options, respond_to })
            .await
            .map(Document::new)
    }

    async fn create(&self, resource: NewResource) -> Result<Document<Resource>, ClientError> {
        self.request(|respond_to| BackendRequest::Create { resource, respond_to })
            .await
            .map(Document::new)
    }

    async fn update(&self, resource: Resource) -> Result<Document<Resource>, ClientError> {
        self.request(|respond_to| BackendRequest::Update { resource, respond_to })
            .await
            .map(Document::new)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let id = id.to_string();
        self.request(|respond_to| BackendRequest::Delete { id, respond_to }).await
    }
}
