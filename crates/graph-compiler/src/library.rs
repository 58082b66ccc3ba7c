//! Schema/library collaborator
//!
//! Supplies algorithm schemas and the columns of external data: files on
//! disk and variables in a live environment. [`StaticSchemaLibrary`] keeps
//! everything in memory; [`HttpSchemaLibrary`] talks to a JSON server.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Column, NodeSchema};

/// Errors raised by a schema library
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The requested schema, file, or variable is unknown
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Library API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid library data: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of schemas and external column lists
#[async_trait]
pub trait SchemaLibrary: Send + Sync {
    /// Schema registered under an algorithm id
    async fn schema(&self, algorithm: &str) -> Result<NodeSchema, LibraryError>;

    /// Columns of a data file
    async fn file_columns(&self, path: &str) -> Result<Vec<Column>, LibraryError>;

    /// Columns of a variable in the live environment
    async fn variable_columns(&self, name: &str) -> Result<Vec<Column>, LibraryError>;
}

/// In-memory library, loadable from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSchemaLibrary {
    pub schemas: HashMap<String, NodeSchema>,
    pub files: HashMap<String, Vec<Column>>,
    pub variables: HashMap<String, Vec<Column>>,
}

impl StaticSchemaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a library from a JSON file
    pub async fn load(path: &Path) -> Result<Self, LibraryError> {
        let content = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| LibraryError::Invalid(e.to_string()))
    }

    pub fn with_schema(mut self, schema: NodeSchema) -> Self {
        self.schemas.insert(schema.id.clone(), schema);
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, columns: Vec<Column>) -> Self {
        self.files.insert(path.into(), columns);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, columns: Vec<Column>) -> Self {
        self.variables.insert(name.into(), columns);
        self
    }
}

#[async_trait]
impl SchemaLibrary for StaticSchemaLibrary {
    async fn schema(&self, algorithm: &str) -> Result<NodeSchema, LibraryError> {
        self.schemas
            .get(algorithm)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(format!("schema '{}'", algorithm)))
    }

    async fn file_columns(&self, path: &str) -> Result<Vec<Column>, LibraryError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(format!("file '{}'", path)))
    }

    async fn variable_columns(&self, name: &str) -> Result<Vec<Column>, LibraryError> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| LibraryError::NotFound(format!("variable '{}'", name)))
    }
}

/// JSON client for a remote schema library
///
/// Endpoints: `GET /schemas/{id}`, `POST /columns/file` with `{"path": ..}`,
/// and `POST /columns/variable` with `{"name": ..}`. Column endpoints answer
/// with a JSON array of columns.
pub struct HttpSchemaLibrary {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSchemaLibrary {
    /// Create a client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LibraryError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_columns(
        &self,
        endpoint: &str,
        body: serde_json::Value,
        key: &str,
    ) -> Result<Vec<Column>, LibraryError> {
        let url = format!("{}/columns/{}", self.base_url, endpoint);
        log::debug!("Fetching columns from {} for '{}'", url, key);
        let response = self.http_client.post(&url).json(&body).send().await?;
        decode(response, key).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    key: &str,
) -> Result<T, LibraryError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(LibraryError::NotFound(key.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LibraryError::Api {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(|e| LibraryError::Invalid(format!("Failed to parse response: {}", e)))
}

#[async_trait]
impl SchemaLibrary for HttpSchemaLibrary {
    async fn schema(&self, algorithm: &str) -> Result<NodeSchema, LibraryError> {
        let url = format!("{}/schemas/{}", self.base_url, algorithm);
        let response = self.http_client.get(&url).send().await?;
        decode(response, algorithm).await
    }

    async fn file_columns(&self, path: &str) -> Result<Vec<Column>, LibraryError> {
        self.post_columns("file", serde_json::json!({ "path": path }), path)
            .await
    }

    async fn variable_columns(&self, name: &str) -> Result<Vec<Column>, LibraryError> {
        self.post_columns("variable", serde_json::json!({ "name": name }), name)
            .await
    }
}
