//! A single cached resource.
//!
//! A [`Record`] is a handle: cloning it yields another handle to the same
//! instance, so a record returned by a query is the very record held in its
//! store. Local state lives in one `watch` channel, which makes every change
//! observable through [`Record::subscribe`].
//!
//! `save`, `update` and `delete` mark the record as loading as soon as they
//! are called, before the returned future is first polled.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::client::{ClientError, ResourceApi};
use crate::model::{Attributes, Relationships, Resource, Status};

/// Whoever holds a record in its authoritative list.
///
/// A record only keeps a [`Weak`] reference to its owner; deleting a record
/// whose owner is gone still issues the API call.
pub trait RecordOwner: Send + Sync {
    /// Drops the record with `id`; returns false if it was not present.
    fn remove_by_id(&self, id: &str) -> bool;
}

/// Observable state of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordState {
    pub attributes: Attributes,
    pub relationships: Relationships,
    status: Status,
}

impl RecordState {
    pub fn status(&self) -> Status {
        self.status
    }

    fn merge(&mut self, attributes: &Attributes, relationships: &Relationships) {
        for (key, value) in attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        for (key, value) in relationships {
            self.relationships.insert(key.clone(), value.clone());
        }
    }
}

/// Partial change sent by [`Record::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub attributes: Option<Attributes>,
    pub relationships: Option<Relationships>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn relationship(mut self, key: impl Into<String>, value: Value) -> Self {
        self.relationships
            .get_or_insert_with(Relationships::new)
            .insert(key.into(), value);
        self
    }
}

struct RecordInner {
    resource_type: String,
    id: String,
    state: watch::Sender<RecordState>,
    client: Arc<dyn ResourceApi>,
    owner: Option<Weak<dyn RecordOwner>>,
}

/// Reactive, locally cached representation of one resource.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

impl Record {
    /// Wraps `resource` in a record that belongs to no store.
    pub fn new(resource: Resource, client: Arc<dyn ResourceApi>) -> Self {
        Self::build(resource, client, None)
    }

    /// Wraps `resource` in a record that asks `owner` to drop it once deleted.
    pub fn with_owner(resource: Resource, client: Arc<dyn ResourceApi>, owner: Weak<dyn RecordOwner>) -> Self {
        Self::build(resource, client, Some(owner))
    }

    fn build(resource: Resource, client: Arc<dyn ResourceApi>, owner: Option<Weak<dyn RecordOwner>>) -> Self {
        let state = RecordState {
            attributes: resource.attributes,
            relationships: resource.relationships,
            status: Status::Initial,
        };
        Self {
            inner: Arc::new(RecordInner {
                resource_type: resource.resource_type,
                id: resource.id,
                state: watch::Sender::new(state),
                client,
                owner,
            }),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.inner.resource_type
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn status(&self) -> Status {
        self.inner.state.borrow().status
    }

    pub fn loading(&self) -> bool {
        self.status().is_loading()
    }

    pub fn error(&self) -> bool {
        self.status().is_error()
    }

    pub fn attributes(&self) -> Attributes {
        self.inner.state.borrow().attributes.clone()
    }

    pub fn relationships(&self) -> Relationships {
        self.inner.state.borrow().relationships.clone()
    }

    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().attributes.get(key).cloned()
    }

    /// Changes one attribute locally. Nothing is sent until [`Record::save`].
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) {
        let (key, value) = (key.into(), value.into());
        self.inner.state.send_modify(|state| {
            state.attributes.insert(key, value);
        });
    }

    /// Applies several local edits as one change.
    pub fn edit(&self, edit: impl FnOnce(&mut Attributes, &mut Relationships)) {
        self.inner.state.send_modify(|state| {
            edit(&mut state.attributes, &mut state.relationships);
        });
    }

    /// Current contents as a wire resource.
    pub fn snapshot(&self) -> Resource {
        let state = self.inner.state.borrow();
        Resource {
            resource_type: self.inner.resource_type.clone(),
            id: self.inner.id.clone(),
            attributes: state.attributes.clone(),
            relationships: state.relationships.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RecordState> {
        self.inner.state.subscribe()
    }

    /// Returns true if both handles point at the same record.
    pub fn ptr_eq(a: &Record, b: &Record) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Replaces attributes and relationships with the ones in `resource`.
    ///
    /// Type, id and status are never touched.
    pub fn overwrite(&self, resource: Resource) {
        debug_assert_eq!(resource.id, self.inner.id);
        self.inner.state.send_modify(|state| {
            state.attributes = resource.attributes;
            state.relationships = resource.relationships;
        });
    }

    /// Sends the full current attributes and relationships to the server.
    ///
    /// Resolves with the server's copy of the resource; local fields are left
    /// as they are.
    pub fn save(&self) -> impl Future<Output = Result<Resource, ClientError>> + Send + 'static {
        self.start();
        let record = self.clone();
        let snapshot = self.snapshot();
        let span = info_span!("save", resource_type = %self.inner.resource_type, id = %self.inner.id);

        async move {
            debug!(?snapshot, "Sending request");
            let result = record.inner.client.update(snapshot).await.map(|document| document.data);
            record.inner.state.send_modify(|state| state.status = state.status.settle(&result));
            match &result {
                Ok(_) => info!("Saved"),
                Err(e) => warn!(error = %e, "Save failed"),
            }
            result
        }
        .instrument(span)
    }

    /// Sends only the members in `patch`.
    ///
    /// On success the patch, then whatever the server returned, is merged
    /// into the local state key by key. On failure nothing local changes.
    pub fn update(&self, patch: RecordPatch) -> impl Future<Output = Result<Resource, ClientError>> + Send + 'static {
        self.start();
        let record = self.clone();
        let request = Resource {
            resource_type: self.inner.resource_type.clone(),
            id: self.inner.id.clone(),
            attributes: patch.attributes.clone().unwrap_or_default(),
            relationships: patch.relationships.clone().unwrap_or_default(),
        };
        let span = info_span!("update", resource_type = %self.inner.resource_type, id = %self.inner.id);

        async move {
            debug!(?patch, "Sending request");
            let result = record.inner.client.update(request).await.map(|document| document.data);
            record.inner.state.send_modify(|state| {
                if let Ok(returned) = &result {
                    state.merge(
                        patch.attributes.as_ref().unwrap_or(&Attributes::new()),
                        patch.relationships.as_ref().unwrap_or(&Relationships::new()),
                    );
                    state.merge(&returned.attributes, &returned.relationships);
                }
                state.status = state.status.settle(&result);
            });
            match &result {
                Ok(_) => info!("Updated"),
                Err(e) => warn!(error = %e, "Update failed"),
            }
            result
        }
        .instrument(span)
    }

    /// Deletes the resource on the server, then drops it from its owner.
    pub fn delete(&self) -> impl Future<Output = Result<(), ClientError>> + Send + 'static {
        self.start();
        let record = self.clone();
        let span = info_span!("delete", resource_type = %self.inner.resource_type, id = %self.inner.id);

        async move {
            debug!("Sending request");
            let result = record.inner.client.delete(&record.inner.id).await;
            // Leave the owner before SUCCESS is published.
            match &result {
                Ok(_) => {
                    let owner = record.inner.owner.as_ref().and_then(Weak::upgrade);
                    let removed = owner.is_some_and(|owner| owner.remove_by_id(&record.inner.id));
                    info!(removed, "Deleted");
                }
                Err(e) => warn!(error = %e, "Delete failed"),
            }
            record.inner.state.send_modify(|state| state.status = state.status.settle(&result));
            result
        }
        .instrument(span)
    }

    fn start(&self) {
        self.inner.state.send_modify(|state| state.status = state.status.start());
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.inner.resource_type)
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
