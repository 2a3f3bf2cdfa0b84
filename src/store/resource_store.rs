//! # Resource Store
//!
//! The authoritative cache of records of one resource type.
//!
//! ## State
//!
//! Everything a store knows sits in one [`StoreState`] behind a `watch`
//! channel:
//!
//! - `records`: every known record, unique by id, in first-seen order.
//! - `filtered`: ids returned by the latest `load_where` per exact [`Filter`].
//! - `related`: ids returned by the latest `load_related` per [`ParentKey`].
//! - `status`: one status shared by every query method.
//!
//! A settled request updates the status, merges the records and rewrites the
//! index entry in a single `send_modify`, so a subscriber never sees SUCCESS
//! paired with stale records.
//!
//! ## Reconciliation
//!
//! Incoming resources are matched to existing records by id. A match is
//! overwritten in place (callers holding that record see the new data); an
//! unknown id is appended. Index entries hold ids, never records, and are
//! resolved through `records` on every read.
//!
//! ## Overlapping requests
//!
//! Requests are not deduplicated and the status belongs to the store, not to
//! a request: when two loads overlap, whichever settles last decides what
//! `loading()` and `error()` report.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use super::record::{Record, RecordOwner};
use crate::client::{ClientError, ResourceApi};
use crate::model::{Document, Filter, NewResource, ParentKey, QueryOptions, Resource, Status};

/// Snapshot of everything a store tracks.
#[derive(Debug, Default)]
pub struct StoreState {
    status: Status,
    records: Vec<Record>,
    filtered: HashMap<Filter, Vec<String>>,
    related: HashMap<ParentKey, Vec<String>>,
}

impl StoreState {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn by_id(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Ids cached for `filter`, in response order.
    pub fn filtered_ids(&self, filter: &Filter) -> Option<&[String]> {
        self.filtered.get(filter).map(Vec::as_slice)
    }

    /// Ids cached for `parent`, in response order.
    pub fn related_ids(&self, parent: &ParentKey) -> Option<&[String]> {
        self.related.get(parent).map(Vec::as_slice)
    }

    /// Resolves cached ids to live records. Ids whose record has been removed
    /// are skipped.
    fn project(&self, ids: Option<&[String]>) -> Vec<Record> {
        ids.unwrap_or_default()
            .iter()
            .filter_map(|id| self.by_id(id).cloned())
            .collect()
    }

    /// Takes in a freshly wrapped record. If a record with the same id is
    /// already present it is overwritten with the candidate's contents and
    /// returned; otherwise the candidate is appended.
    fn adopt(&mut self, candidate: Record) -> Record {
        match self.by_id(candidate.id()) {
            Some(existing) => {
                let existing = existing.clone();
                existing.overwrite(candidate.snapshot());
                existing
            }
            None => {
                self.records.push(candidate.clone());
                candidate
            }
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|record| record.id() != id);
        self.records.len() != before
    }
}

struct StoreShared {
    name: String,
    client: Arc<dyn ResourceApi>,
    state: watch::Sender<StoreState>,
}

impl RecordOwner for StoreShared {
    fn remove_by_id(&self, id: &str) -> bool {
        let removed = self.state.send_if_modified(|state| state.remove(id));
        debug!(resource_type = %self.name, %id, removed, "Remove");
        removed
    }
}

/// Reactive cache of the resources of one type, backed by a [`ResourceApi`].
///
/// Cloning a store yields another handle to the same cache.
#[derive(Clone)]
pub struct ResourceStore {
    shared: Arc<StoreShared>,
}

impl ResourceStore {
    /// Creates an empty store for resources of type `name`.
    pub fn new(name: impl Into<String>, client: Arc<dyn ResourceApi>) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                name: name.into(),
                client,
                state: watch::Sender::new(StoreState::default()),
            }),
        }
    }

    /// Resource type this store caches.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn status(&self) -> Status {
        self.shared.state.borrow().status
    }

    pub fn loading(&self) -> bool {
        self.status().is_loading()
    }

    pub fn error(&self) -> bool {
        self.status().is_error()
    }

    /// Subscribes to every change of the store state.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.shared.state.subscribe()
    }

    pub fn len(&self) -> usize {
        self.shared.state.borrow().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every record currently in the store.
    ///
    /// The handles are the store's own records, not copies.
    pub fn all(&self) -> Vec<Record> {
        self.shared.state.borrow().records.clone()
    }

    pub fn by_id(&self, id: &str) -> Option<Record> {
        self.shared.state.borrow().by_id(id).cloned()
    }

    /// Records returned by the latest `load_where` with exactly `filter`.
    ///
    /// Empty if that filter was never loaded.
    pub fn where_(&self, filter: &Filter) -> Vec<Record> {
        let state = self.shared.state.borrow();
        state.project(state.filtered_ids(filter))
    }

    /// Records returned by the latest `load_related` for `parent`.
    ///
    /// Empty if that parent was never loaded.
    pub fn related(&self, parent: &ParentKey) -> Vec<Record> {
        let state = self.shared.state.borrow();
        state.project(state.related_ids(parent))
    }

    // =========================================================================
    // Local writes
    // =========================================================================

    /// Replaces every record with fresh ones built from `resources`.
    ///
    /// Meant for seeding; cached filter and related ids are kept.
    pub fn store_records(&self, resources: Vec<Resource>) {
        let records: Vec<Record> = resources.into_iter().map(|resource| self.wrap(resource)).collect();
        info!(resource_type = %self.shared.name, count = records.len(), "Stored records");
        self.shared.state.send_modify(|state| state.records = records);
    }

    /// Drops `record` from the store. Cached filter and related ids are not
    /// pruned; reads skip ids that no longer resolve.
    pub fn remove(&self, record: &Record) -> bool {
        self.remove_by_id(record.id())
    }

    pub fn remove_by_id(&self, id: &str) -> bool {
        self.shared.remove_by_id(id)
    }

    // =========================================================================
    // Requests
    // =========================================================================
    //
    // Each request marks the store as loading when it is called, before the
    // returned future is polled.

    /// Loads every resource of this type.
    pub fn load_all(&self, options: QueryOptions) -> impl Future<Output = Result<Vec<Record>, ClientError>> + Send + 'static {
        self.start();
        let store = self.clone();
        let span = info_span!("load_all", resource_type = %self.shared.name);

        async move {
            debug!(%options, "Sending request");
            let result = store.shared.client.all(&options).await;
            store.settle_many(result, |_, _| {})
        }
        .instrument(span)
    }

    /// Loads one resource by id.
    pub fn load_by_id(
        &self,
        id: impl Into<String>,
        options: QueryOptions,
    ) -> impl Future<Output = Result<Record, ClientError>> + Send + 'static {
        self.start();
        let store = self.clone();
        let id = id.into();
        let span = info_span!("load_by_id", resource_type = %self.shared.name, %id);

        async move {
            debug!(%options, "Sending request");
            let result = store.shared.client.find(&id, &options).await;
            store.settle_one(result)
        }
        .instrument(span)
    }

    /// Loads the resources matching `filter` and caches their ids under it,
    /// replacing whatever that filter returned before.
    pub fn load_where(
        &self,
        filter: Filter,
        options: QueryOptions,
    ) -> impl Future<Output = Result<Vec<Record>, ClientError>> + Send + 'static {
        self.start();
        let store = self.clone();
        let span = info_span!("load_where", resource_type = %self.shared.name, %filter);

        async move {
            debug!(%options, "Sending request");
            let result = store.shared.client.find_where(&filter, &options).await;
            store.settle_many(result, |state, ids| {
                state.filtered.insert(filter, ids);
            })
        }
        .instrument(span)
    }

    /// Loads the resources related to `parent` and caches their ids under it,
    /// replacing whatever that parent returned before.
    pub fn load_related(
        &self,
        parent: ParentKey,
        options: QueryOptions,
    ) -> impl Future<Output = Result<Vec<Record>, ClientError>> + Send + 'static {
        self.start();
        let store = self.clone();
        let span = info_span!("load_related", resource_type = %self.shared.name, %parent);

        async move {
            debug!(%options, "Sending request");
            let result = store.shared.client.related(&parent, &options).await;
            store.settle_many(result, |state, ids| {
                state.related.insert(parent, ids);
            })
        }
        .instrument(span)
    }

    /// Creates a resource on the server and adds the returned record.
    pub fn create(&self, resource: NewResource) -> impl Future<Output = Result<Record, ClientError>> + Send + 'static {
        self.start();
        let store = self.clone();
        let span = info_span!("create", resource_type = %self.shared.name);

        async move {
            debug!(?resource, "Sending request");
            let result = store.shared.client.create(resource).await;
            store.settle_one(result)
        }
        .instrument(span)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn wrap(&self, resource: Resource) -> Record {
        let owner: Weak<dyn RecordOwner> = Arc::downgrade(&self.shared) as Weak<dyn RecordOwner>;
        Record::with_owner(resource, self.shared.client.clone(), owner)
    }

    fn start(&self) {
        self.shared.state.send_modify(|state| state.status = state.status.start());
    }

    fn fail(&self, error: &ClientError) {
        warn!(error = %error, "Request failed");
        self.shared.state.send_modify(|state| state.status = state.status.fail());
    }

    fn settle_one(&self, result: Result<Document<Resource>, ClientError>) -> Result<Record, ClientError> {
        let candidate = match result {
            Ok(document) => self.wrap(document.data),
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let mut record = candidate.clone();
        self.shared.state.send_modify(|state| {
            state.status = state.status.succeed();
            record = state.adopt(candidate);
        });
        info!(id = %record.id(), size = self.len(), "Loaded");
        Ok(record)
    }

    fn settle_many(
        &self,
        result: Result<Document<Vec<Resource>>, ClientError>,
        index: impl FnOnce(&mut StoreState, Vec<String>),
    ) -> Result<Vec<Record>, ClientError> {
        let candidates: Vec<Record> = match result {
            Ok(document) => document.data.into_iter().map(|resource| self.wrap(resource)).collect(),
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        // Cached ids form a set; a repeated id keeps its first position.
        let mut seen = HashSet::new();
        let ids: Vec<String> = candidates
            .iter()
            .map(|record| record.id().to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let mut records = Vec::with_capacity(candidates.len());
        self.shared.state.send_modify(|state| {
            state.status = state.status.succeed();
            records.extend(candidates.into_iter().map(|candidate| state.adopt(candidate)));
            index(state, ids);
        });
        info!(count = records.len(), size = self.len(), "Loaded");
        Ok(records)
    }
}

impl fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ResourceStore")
            .field("name", &self.shared.name)
            .field("status", &state.status)
            .field("records", &state.records.len())
            .field("filtered", &state.filtered.len())
            .field("related", &state.related.len())
            .finish()
    }
}
