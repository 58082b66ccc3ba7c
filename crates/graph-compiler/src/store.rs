//! Document store collaborator
//!
//! The host owns a key/value record store plus an ordered list of source
//! cells. A document persists itself as one record per node, keyed by node
//! id under [`names::NODE_KEY_PREFIX`], and a document record under
//! [`names::DOCUMENT_KEY`] holding the ordinal counter, the edges and the
//! node order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::names;
use crate::document::DocumentState;
use crate::error::{CompilerError, Result};
use crate::types::{GraphEdge, GraphNode, NodeId};

/// Host-side storage of records and source cells
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    /// Insert a source cell before `index` (`index == len` appends)
    async fn insert_cell(&self, index: usize, source: &str) -> Result<()>;
    async fn delete_cell(&self, index: usize) -> Result<()>;
    async fn source_text(&self, index: usize) -> Result<String>;
    async fn set_source_text(&self, index: usize, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    entries: BTreeMap<String, Value>,
    #[serde(default)]
    cells: Vec<String>,
}

/// In-memory store with optional JSON file persistence
///
/// With persistence enabled every mutation rewrites the whole file.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    data: Mutex<StoreData>,
    persist_path: Option<PathBuf>,
}

impl MemoryDocumentStore {
    /// Create a new in-memory store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that persists to the given file
    ///
    /// The parent directory will be created if it doesn't exist when saving.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Load the persisted file, if any
    ///
    /// Returns whether a file was loaded.
    pub async fn load_from_disk(&self) -> Result<bool> {
        let Some(path) = &self.persist_path else {
            return Ok(false);
        };
        if !tokio::fs::try_exists(path).await? {
            return Ok(false);
        }
        let content = tokio::fs::read_to_string(path).await?;
        let data: StoreData = serde_json::from_str(&content)?;
        log::info!(
            "Loaded {} record(s) and {} cell(s) from {:?}",
            data.entries.len(),
            data.cells.len(),
            path
        );
        *self.data.lock() = data;
        Ok(true)
    }

    /// Number of source cells
    pub fn cell_count(&self) -> usize {
        self.data.lock().cells.len()
    }

    async fn save_to_disk(&self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&*self.data.lock())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        log::debug!("Saved document store to {:?}", path);
        Ok(())
    }

    fn with_cell<T>(&self, index: usize, f: impl FnOnce(&mut Vec<String>) -> T) -> Result<T> {
        let mut data = self.data.lock();
        if index >= data.cells.len() {
            return Err(out_of_range(index, data.cells.len()));
        }
        Ok(f(&mut data.cells))
    }
}

fn out_of_range(index: usize, len: usize) -> CompilerError {
    CompilerError::store(format!("cell index {} out of range ({} cell(s))", index, len))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.lock().entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.data.lock().entries.insert(key.to_string(), value);
        self.save_to_disk().await
    }

    async fn insert_cell(&self, index: usize, source: &str) -> Result<()> {
        {
            let mut data = self.data.lock();
            if index > data.cells.len() {
                return Err(out_of_range(index, data.cells.len()));
            }
            data.cells.insert(index, source.to_string());
        }
        self.save_to_disk().await
    }

    async fn delete_cell(&self, index: usize) -> Result<()> {
        self.with_cell(index, |cells| {
            cells.remove(index);
        })?;
        self.save_to_disk().await
    }

    async fn source_text(&self, index: usize) -> Result<String> {
        self.with_cell(index, |cells| cells[index].clone())
    }

    async fn set_source_text(&self, index: usize, text: &str) -> Result<()> {
        self.with_cell(index, |cells| cells[index] = text.to_string())?;
        self.save_to_disk().await
    }
}

/// Document-level record stored under the document key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRecord {
    id: String,
    name: String,
    next_ordinal: u32,
    node_ids: Vec<NodeId>,
    #[serde(default)]
    edges: Vec<GraphEdge>,
}

fn node_key(node_id: &str) -> String {
    format!("{}{}", names::NODE_KEY_PREFIX, node_id)
}

/// Persist a document into a store
///
/// Records of nodes that no longer exist are overwritten with null.
pub async fn save_document(store: &dyn DocumentStore, document: &DocumentState) -> Result<()> {
    let previous: Vec<NodeId> = match store.get(names::DOCUMENT_KEY).await? {
        Some(value) => serde_json::from_value::<DocumentRecord>(value)
            .map(|r| r.node_ids)
            .unwrap_or_default(),
        None => Vec::new(),
    };

    for node in &document.nodes {
        store.set(&node_key(&node.id), serde_json::to_value(node)?).await?;
    }
    for stale in previous.iter().filter(|id| !document.contains_node(id)) {
        store.set(&node_key(stale), Value::Null).await?;
    }

    let record = DocumentRecord {
        id: document.id.clone(),
        name: document.name.clone(),
        next_ordinal: document.next_ordinal(),
        node_ids: document.nodes.iter().map(|n| n.id.clone()).collect(),
        edges: document.edges.clone(),
    };
    store
        .set(names::DOCUMENT_KEY, serde_json::to_value(record)?)
        .await?;
    log::debug!(
        "Saved document '{}' with {} node(s)",
        document.id,
        document.nodes.len()
    );
    Ok(())
}

/// Load a document from a store; `None` when nothing was saved
pub async fn load_document(store: &dyn DocumentStore) -> Result<Option<DocumentState>> {
    let Some(value) = store.get(names::DOCUMENT_KEY).await? else {
        return Ok(None);
    };
    let record: DocumentRecord = serde_json::from_value(value)?;

    let mut document = DocumentState::with_id(record.id, record.name);
    for node_id in &record.node_ids {
        match store.get(&node_key(node_id)).await? {
            Some(value) if !value.is_null() => {
                let node: GraphNode = serde_json::from_value(value)?;
                document.nodes.push(node);
            }
            _ => return Err(CompilerError::store(format!("missing record for node '{}'", node_id))),
        }
    }
    document.edges = record.edges;
    document.advance_ordinal_to(record.next_ordinal);
    document.normalize()?;
    Ok(Some(document))
}
