//! Error types returned by API clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of the offending member inside the request document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A JSON:API error object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ApiError {
    pub fn new(status: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Points at `/data/attributes/<attribute>`.
    pub fn with_attribute_pointer(mut self, attribute: &str) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(format!("/data/attributes/{attribute}")),
            parameter: None,
        });
        self
    }
}

/// Errors surfaced by a [`ResourceApi`](crate::client::ResourceApi).
///
/// The store hands these back to its caller unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// The server rejected the request with one or more error objects.
    #[error("API rejected request: {}", summarize(.0))]
    Api(Vec<ApiError>),

    /// The request never produced a usable response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The requested resource does not exist on the server.
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Backend closed")]
    BackendClosed,

    #[error("Backend dropped response channel")]
    BackendDropped,
}

impl ClientError {
    /// Error objects carried by an [`ClientError::Api`] rejection.
    pub fn api_errors(&self) -> &[ApiError] {
        match self {
            ClientError::Api(errors) => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return "no error objects".to_string();
    }
    errors
        .iter()
        .map(|e| {
            let title = e.title.as_deref().unwrap_or("error");
            match &e.status {
                Some(status) => format!("{status} {title}"),
                None => title.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
