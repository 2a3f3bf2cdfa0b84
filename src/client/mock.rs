//! # Mock Client
//!
//! Utilities for testing stores and records without a server.
//!
//! [`MockApi`] implements [`ResourceApi`]. Queue expectations with the
//! `expect_*` builders, hand an `Arc<MockApi>` to the code under test, then
//! inspect [`MockApi::calls`] and finish with [`MockApi::verify`].
//!
//! ```ignore
//! let api = Arc::new(MockApi::new());
//! api.expect_find("42").return_ok(Resource::new("widgets", "42"));
//!
//! let store = ResourceStore::new("widgets", api.clone());
//! store.load_by_id("42", QueryOptions::new()).await?;
//!
//! api.verify(); // Ensures all expectations were met
//! ```
//!
//! Expectations are consumed in the order they were queued. A call that does
//! not match the next expectation panics, like an unexpected call on any
//! other test double.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{ClientError, ResourceApi};
use crate::model::{Document, Filter, NewResource, ParentKey, QueryOptions, Resource};

/// A call received by the mock, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    All { options: QueryOptions },
    Find { id: String, options: QueryOptions },
    Where { filter: Filter, options: QueryOptions },
    Related { parent: ParentKey, options: QueryOptions },
    Create { resource: NewResource },
    Update { resource: Resource },
    Delete { id: String },
}

enum Expected {
    All(Result<Vec<Resource>, ClientError>),
    Find(String, Result<Resource, ClientError>),
    Where(Filter, Result<Vec<Resource>, ClientError>),
    Related(ParentKey, Result<Vec<Resource>, ClientError>),
    Create(Result<Resource, ClientError>),
    Update(String, Result<Resource, ClientError>),
    Delete(String, Result<(), ClientError>),
}

impl Expected {
    fn name(&self) -> &'static str {
        match self {
            Expected::All(_) => "all",
            Expected::Find(..) => "find",
            Expected::Where(..) => "find_where",
            Expected::Related(..) => "related",
            Expected::Create(_) => "create",
            Expected::Update(..) => "update",
            Expected::Delete(..) => "delete",
        }
    }
}

struct Expectation {
    expected: Expected,
    delay: Option<Duration>,
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An API client that answers from a queue of expectations.
#[derive(Default)]
pub struct MockApi {
    expectations: Queue,
    calls: Mutex<Vec<ApiCall>>,
}

impl MockApi {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects an `all` call.
    pub fn expect_all(&self) -> ExpectationBuilder<Vec<Resource>> {
        self.builder::<Vec<Resource>>(Box::new(Expected::All))
    }

    /// Expects a `find` call for `id`.
    pub fn expect_find(&self, id: impl Into<String>) -> ExpectationBuilder<Resource> {
        let id = id.into();
        self.builder(Box::new(move |response| Expected::Find(id, response)))
    }

    /// Expects a `find_where` call with exactly `filter`.
    pub fn expect_where(&self, filter: Filter) -> ExpectationBuilder<Vec<Resource>> {
        self.builder(Box::new(move |response| Expected::Where(filter, response)))
    }

    /// Expects a `related` call for `parent`.
    pub fn expect_related(&self, parent: ParentKey) -> ExpectationBuilder<Vec<Resource>> {
        self.builder(Box::new(move |response| Expected::Related(parent, response)))
    }

    /// Expects a `create` call.
    pub fn expect_create(&self) -> ExpectationBuilder<Resource> {
        self.builder::<Resource>(Box::new(Expected::Create))
    }

    /// Expects an `update` call for `id`.
    pub fn expect_update(&self, id: impl Into<String>) -> ExpectationBuilder<Resource> {
        let id = id.into();
        self.builder(Box::new(move |response| Expected::Update(id, response)))
    }

    /// Expects a `delete` call for `id`.
    pub fn expect_delete(&self, id: impl Into<String>) -> ExpectationBuilder<()> {
        let id = id.into();
        self.builder(Box::new(move |response| Expected::Delete(id, response)))
    }

    /// Every call received so far, oldest first.
    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }

    fn builder<T>(&self, wrap: Box<dyn FnOnce(Result<T, ClientError>) -> Expected + Send>) -> ExpectationBuilder<T> {
        ExpectationBuilder {
            expectations: self.expectations.clone(),
            wrap,
            delay: None,
        }
    }

    /// Records `call` and pops the next expectation, panicking if there is none.
    fn next(&self, call: ApiCall) -> Expectation {
        let description = format!("{:?}", call);
        lock(&self.calls).push(call);
        match lock(&self.expectations).pop_front() {
            Some(expectation) => expectation,
            None => panic!("Unexpected request: {}", description),
        }
    }

    async fn respond<T>(delay: Option<Duration>, response: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// Builder returned by the `expect_*` methods.
pub struct ExpectationBuilder<T> {
    expectations: Queue,
    wrap: Box<dyn FnOnce(Result<T, ClientError>) -> Expected + Send>,
    delay: Option<Duration>,
}

impl<T> ExpectationBuilder<T> {
    /// Holds the response back for `delay` once the call arrives.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ClientError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, ClientError>) {
        let expectation = Expectation {
            expected: (self.wrap)(response),
            delay: self.delay,
        };
        lock(&self.expectations).push_back(expectation);
    }
}

#[async_trait]
impl ResourceApi for MockApi {
    async fn all(&self, options: &QueryOptions) -> Result<Document<Vec<Resource>>, ClientError> {
        let Expectation { expected, delay } = self.next(ApiCall::All { options: options.clone() });
        match expected {
            Expected::All(response) => Self::respond(delay, response).await.map(Document::new),
            other => panic!("Unexpected request: all, expected {}", other.name()),
        }
    }

    async fn find(&self, id: &str, options: &QueryOptions) -> Result<Document<Resource>, ClientError> {
        let Expectation { expected, delay } = self.next(ApiCall::Find {
            id: id.to_string(),
            options: options.clone(),
        });
        match expected {
            Expected::Find(expected_id, response) => {
                assert_eq!(expected_id, id, "find called with unexpected id");
                Self::respond(delay, response).await.map(Document::new)
            }
            other => panic!("Unexpected request: find, expected {}", other.name()),
        }
    }

    async fn find_where(
        &self,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<Document<Vec<Resource>>, ClientError> {
        let Expectation { expected, delay } = self.next(ApiCall::Where {
            filter: filter.clone(),
            options: options.clone(),
        });
        match expected {
            Expected::Where(expected_filter, response) => {
                assert_eq!(&expected_filter, filter, "find_where called with unexpected filter");
                Self::respond(delay, response).await.map(Document::new)
            }
            other => panic!("Unexpected request: find_where, expected {}", other.name()),
        }
    }

    async fn related(
        &self,
        parent: &ParentKey,
        options: &QueryOptions,
    ) -> Result<Document<Vec<Resource>>, ClientError> {
        let Expectation { expected, delay } = self.next(ApiCall::Related {
            parent: parent.clone(),
            options: options.clone(),
        });
        match expected {
            Expected::Related(expected_parent, response) => {
                assert_eq!(&expected_parent, parent, "related called with unexpected parent");
                Self::respond(delay, response).await.map(Document::new)
            }
            other => panic!("Unexpected request: related, expected {}", other.name()),
        }
    }

    async fn create(&self, resource: NewResource) -> Result<Document<Resource>, ClientError> {
        let Expectation { expected, delay } = self.next(ApiCall::Create { resource });
        match expected {
            Expected::Create(response) => Self::respond(delay, response).await.map(Document::new),
            other => panic!("Unexpected request: create, expected {}", other.name()),
        }
    }

    async fn update(&self, resource: Resource) -> Result<Document<Resource>, ClientError> {
        let id = resource.id.clone();
        let Expectation { expected, delay } = self.next(ApiCall::Update { resource });
        match expected {
            Expected::Update(expected_id, response) => {
                assert_eq!(expected_id, id, "update called with unexpected id");
                Self::respond(delay, response).await.map(Document::new)
            }
            other => panic!("Unexpected request: update, expected {}", other.name()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let Expectation { expected, delay } = self.next(ApiCall::Delete { id: id.to_string() });
        match expected {
            Expected::Delete(expected_id, response) => {
                assert_eq!(expected_id, id, "delete called with unexpected id");
                Self::respond(delay, response).await
            }
            other => panic!("Unexpected request: delete, expected {}", other.name()),
        }
    }
}
