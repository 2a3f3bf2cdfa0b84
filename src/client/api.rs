use async_trait::async_trait;

use super::ClientError;
use crate::model::{Document, Filter, NewResource, ParentKey, QueryOptions, Resource};

/// The JSON:API client a store and its records talk to.
///
/// One implementation serves one resource type (the store's `name`). How a
/// call becomes a request (URL, query string, envelope) is entirely up to the
/// implementation; errors come back as [`ClientError`] and are propagated by
/// the store without being wrapped.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// `GET /<type>`
    async fn all(&self, options: &QueryOptions) -> Result<Document<Vec<Resource>>, ClientError>;

    /// `GET /<type>/<id>`
    async fn find(&self, id: &str, options: &QueryOptions) -> Result<Document<Resource>, ClientError>;

    /// `GET /<type>?filter[..]=..`
    async fn find_where(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Document<Vec<Resource>>, ClientError>;

    /// `GET /<parent type>/<parent id>/<type>`
    async fn related(
        &self,
        parent: &ParentKey,
        options: &QueryOptions,
    ) -> Result<Document<Vec<Resource>>, ClientError>;

    /// `POST /<type>`
    async fn create(&self, resource: NewResource) -> Result<Document<Resource>, ClientError>;

    /// `PATCH /<type>/<id>`; only the members present in `resource` are sent.
    async fn update(&self, resource: Resource) -> Result<Document<Resource>, ClientError>;

    /// `DELETE /<type>/<id>`
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
}
