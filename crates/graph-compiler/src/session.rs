//! Editing session over one pipeline document
//!
//! A [`PipelineSession`] owns the shared document together with what the
//! host needs around it:
//! - the algorithm registry used to create and re-type nodes
//! - the code synthesizer configured from [`CompilerConfig`]
//! - node statuses, refreshed after every mutation and execution
//! - undo/redo history
//!
//! Every mutation checkpoints history first, then recomputes statuses and
//! reports the ones that changed through the event sink.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::codegen::CodeSynthesizer;
use crate::config::CompilerConfig;
use crate::constants::diagnostics;
use crate::document::{DocumentState, NodeRemoval, SchemaChange};
use crate::error::{CompilerError, Result};
use crate::events::{emit, CompilerEvent, EventSink, NullEventSink};
use crate::execution::{ExecutionBackend, ExecutionReport, ExecutionTracker};
use crate::library::{LibraryError, SchemaLibrary};
use crate::propagation::SchemaPropagator;
use crate::registry::{resolve_kind, SchemaRegistry};
use crate::status::{NodeStatus, StatusComputer};
use crate::store::{load_document, save_document, DocumentStore};
use crate::types::{EdgeId, GraphEdge, NodeId, NodeSchema};
use crate::undo::UndoStack;

/// A document being edited, compiled, and run
pub struct PipelineSession {
    document: Arc<RwLock<DocumentState>>,
    registry: Arc<SchemaRegistry>,
    config: CompilerConfig,
    synthesizer: CodeSynthesizer,
    statuses: StatusComputer,
    history: UndoStack,
    tracker: ExecutionTracker,
    events: Arc<dyn EventSink>,
}

impl PipelineSession {
    /// Start a session on a document
    ///
    /// The document is normalized first so hand-written or older documents
    /// get unique ordinals and bindings for every output port.
    pub fn new(
        mut document: DocumentState,
        registry: Arc<SchemaRegistry>,
        config: CompilerConfig,
    ) -> Result<Self> {
        let rebound = document.normalize()?;
        if rebound > 0 {
            log::debug!("Rebound outputs of {} node(s) in '{}'", rebound, document.id);
        }

        let mut statuses = StatusComputer::new();
        statuses.refresh(&document);

        Ok(Self {
            document: Arc::new(RwLock::new(document)),
            registry,
            synthesizer: CodeSynthesizer::new(config.synthesis_options()),
            tracker: ExecutionTracker::new(config.error_marker.clone()),
            config,
            statuses,
            history: UndoStack::default(),
            events: Arc::new(NullEventSink),
        })
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Load a session from a document store; `None` when nothing was saved
    pub async fn load(
        store: &dyn DocumentStore,
        registry: Arc<SchemaRegistry>,
        config: CompilerConfig,
    ) -> Result<Option<Self>> {
        let Some(document) = load_document(store).await? else {
            return Ok(None);
        };
        log::info!(
            "Loaded document '{}' with {} node(s)",
            document.id,
            document.nodes.len()
        );
        Self::new(document, registry, config).map(Some)
    }

    /// Shared handle to the document
    pub fn document(&self) -> &Arc<RwLock<DocumentState>> {
        &self.document
    }

    /// Copy of the document as it is now
    pub async fn snapshot(&self) -> DocumentState {
        self.document.read().await.clone()
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Create a propagator that keeps this session's document current
    pub fn propagator(&self, library: Arc<dyn SchemaLibrary>) -> SchemaPropagator {
        SchemaPropagator::new(self.document.clone(), self.registry.clone(), library)
            .with_events(self.events.clone())
            .with_cycle_policy(self.config.cycle_policy)
    }

    /// Add a node running a registered algorithm
    pub async fn add_node(&mut self, algorithm: &str) -> Result<NodeId> {
        let schema = self.schema_for(algorithm)?;
        self.insert(schema).await
    }

    /// Add a node, asking the library for schemas the registry lacks
    ///
    /// Library schemas have no column transform, so a transform-category
    /// schema from the library is rejected.
    pub async fn add_node_from_library(
        &mut self,
        library: &dyn SchemaLibrary,
        algorithm: &str,
    ) -> Result<NodeId> {
        let schema = self.library_schema_for(library, algorithm).await?;
        self.insert(schema).await
    }

    /// Add a placeholder node with no algorithm yet
    pub async fn add_unassigned_node(&mut self) -> Result<NodeId> {
        let schema = self
            .registry
            .get_schema(NodeSchema::unassigned().id.as_str())
            .cloned()
            .unwrap_or_else(NodeSchema::unassigned);
        self.mutate(|doc| doc.insert_node(schema)).await
    }

    /// Switch a node to another registered algorithm
    pub async fn assign_algorithm(&mut self, node_id: &str, algorithm: &str) -> Result<SchemaChange> {
        let schema = self.schema_for(algorithm)?;
        self.reassign(node_id, schema).await
    }

    /// Switch a node to an algorithm, falling back to the library's schemas
    pub async fn assign_algorithm_from_library(
        &mut self,
        library: &dyn SchemaLibrary,
        node_id: &str,
        algorithm: &str,
    ) -> Result<SchemaChange> {
        let schema = self.library_schema_for(library, algorithm).await?;
        self.reassign(node_id, schema).await
    }

    async fn insert(&mut self, schema: NodeSchema) -> Result<NodeId> {
        let algorithm = schema.id.clone();
        let node_id = self.mutate(|doc| doc.insert_node(schema)).await?;
        log::debug!("Added '{}' node {}", algorithm, node_id);
        Ok(node_id)
    }

    async fn reassign(&mut self, node_id: &str, schema: NodeSchema) -> Result<SchemaChange> {
        let algorithm = schema.id.clone();
        let target = node_id.to_string();
        let change = self
            .mutate_stale(
                |doc| doc.assign_schema(node_id, schema),
                |change| {
                    let mut stale = vec![target];
                    stale.extend(change.removed_edges.iter().map(|e| e.target.clone()));
                    stale
                },
            )
            .await?;
        if !change.removed_edges.is_empty() {
            log::debug!(
                "Assigning '{}' to {} removed {} edge(s)",
                algorithm,
                node_id,
                change.removed_edges.len()
            );
        }
        Ok(change)
    }

    pub async fn set_value(&mut self, node_id: &str, name: &str, value: serde_json::Value) -> Result<()> {
        self.mutate(|doc| doc.set_value(node_id, name, value)).await
    }

    pub async fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<EdgeId> {
        self.mutate(|doc| doc.connect(source, source_port, target, target_port))
            .await
    }

    pub async fn disconnect(&mut self, edge_id: &str) -> Result<GraphEdge> {
        self.mutate_stale(|doc| doc.disconnect(edge_id), |edge| vec![edge.target.clone()])
            .await
    }

    /// Delete a node together with its edges
    ///
    /// Downstream nodes that lost an input also lose their execution result.
    pub async fn delete_node(&mut self, node_id: &str) -> Result<NodeRemoval> {
        self.mutate_stale(|doc| doc.delete_node(node_id), |removal| {
            let mut stale = removal.affected.clone();
            stale.push(removal.node.id.clone());
            stale
        })
        .await
    }

    /// Status of every node, in document order
    pub async fn statuses(&self) -> Vec<(NodeId, NodeStatus)> {
        let document = self.document.read().await;
        self.statuses.compute(&document)
    }

    pub async fn status(&self, node_id: &str) -> Option<NodeStatus> {
        let document = self.document.read().await;
        let node = document.find_node(node_id)?;
        Some(self.statuses.status(&document, node))
    }

    /// Generate the full listing
    ///
    /// A cyclic graph yields only the cycle diagnostic and a
    /// [`CompilerEvent::CycleDetected`] event.
    pub async fn generate_code(&self) -> String {
        let document = self.document.read().await;
        let document_id = document.id.clone();
        let (code, event) = match self.synthesizer.try_generate_document(&document) {
            Ok(code) => {
                let event = CompilerEvent::CodeGenerated {
                    document_id,
                    node_id: None,
                    code: code.clone(),
                };
                (code, event)
            }
            Err(cycle) => {
                log::warn!("No code generated for document '{}': {}", document_id, cycle);
                let event = CompilerEvent::CycleDetected {
                    document_id,
                    unsorted: cycle.unsorted,
                };
                (diagnostics::CYCLE.to_string(), event)
            }
        };
        drop(document);

        emit(self.events.as_ref(), event);
        code
    }

    /// Source text of a single node
    pub async fn node_code(&self, node_id: &str) -> Result<String> {
        let document = self.document.read().await;
        let code = self.synthesizer.node_code(&document, node_id)?;
        let event = CompilerEvent::CodeGenerated {
            document_id: document.id.clone(),
            node_id: Some(node_id.to_string()),
            code: code.clone(),
        };
        drop(document);
        emit(self.events.as_ref(), event);
        Ok(code)
    }

    /// Write the full listing into a source cell of a store
    ///
    /// Replaces the cell at `index`, or appends when `index` is the cell count.
    pub async fn write_code_cell(&self, store: &dyn DocumentStore, index: usize) -> Result<()> {
        let code = self.generate_code().await;
        match store.set_source_text(index, &code).await {
            Ok(()) => Ok(()),
            Err(CompilerError::Store(_)) => store.insert_cell(index, &code).await,
            Err(e) => Err(e),
        }
    }

    /// Run one node's code on a backend
    ///
    /// The node shows `running` while the backend works, then `success` or
    /// `failed` until [`clear_execution`](Self::clear_execution).
    pub async fn execute_node(
        &mut self,
        backend: &dyn ExecutionBackend,
        node_id: &str,
    ) -> Result<ExecutionReport> {
        let source = self.synthesizer.node_code(&*self.document.read().await, node_id)?;

        self.tracker.begin(self.statuses.overlay_mut(), node_id);
        self.refresh_statuses().await;

        let report = self.tracker.run(backend, node_id, &source).await;

        self.tracker.finish(self.statuses.overlay_mut(), &report);
        self.refresh_statuses().await;
        Ok(report)
    }

    /// Drop the execution result of a node so its structural status shows again
    pub async fn clear_execution(&mut self, node_id: &str) {
        if self.statuses.overlay_mut().clear(node_id).is_some() {
            self.refresh_statuses().await;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Revert the last mutation; returns whether anything was undone
    pub async fn undo(&mut self) -> Result<bool> {
        self.restore(true).await
    }

    /// Reapply the last undone mutation; returns whether anything was redone
    pub async fn redo(&mut self) -> Result<bool> {
        self.restore(false).await
    }

    /// Persist the document into a store
    pub async fn save(&self, store: &dyn DocumentStore) -> Result<()> {
        let document = self.snapshot().await;
        save_document(store, &document).await
    }

    fn schema_for(&self, algorithm: &str) -> Result<NodeSchema> {
        self.registry
            .get_schema(algorithm)
            .cloned()
            .ok_or_else(|| CompilerError::UnknownAlgorithm(algorithm.to_string()))
    }

    async fn library_schema_for(&self, library: &dyn SchemaLibrary, algorithm: &str) -> Result<NodeSchema> {
        if let Some(schema) = self.registry.get_schema(algorithm) {
            return Ok(schema.clone());
        }
        let schema = match library.schema(algorithm).await {
            Ok(schema) => schema,
            Err(LibraryError::NotFound(_)) => {
                return Err(CompilerError::UnknownAlgorithm(algorithm.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        resolve_kind(&schema, None)?;
        log::debug!("Using library schema for '{}'", algorithm);
        Ok(schema)
    }

    /// Apply a mutation, checkpointing the prior state when it succeeds
    async fn mutate<T>(&mut self, f: impl FnOnce(&mut DocumentState) -> Result<T>) -> Result<T> {
        self.mutate_stale(f, |_| Vec::new()).await
    }

    /// Apply a mutation and drop the execution results it made stale
    async fn mutate_stale<T>(
        &mut self,
        f: impl FnOnce(&mut DocumentState) -> Result<T>,
        stale: impl FnOnce(&T) -> Vec<NodeId>,
    ) -> Result<T> {
        let mut document = self.document.write().await;
        let before = document.clone();
        let result = f(&mut *document)?;
        self.history.checkpoint(&before)?;

        let overlay = self.statuses.overlay_mut();
        for node_id in stale(&result) {
            overlay.clear(&node_id);
        }

        let changed = self.statuses.refresh(&document);
        let document_id = document.id.clone();
        drop(document);

        self.emit_statuses(&document_id, changed);
        Ok(result)
    }

    async fn restore(&mut self, backwards: bool) -> Result<bool> {
        let mut document = self.document.write().await;
        let step = if backwards {
            self.history.undo(&document)
        } else {
            self.history.redo(&document)
        };
        let Some(restored) = step else {
            return Ok(false);
        };
        let mut restored = restored?;

        // Ordinals handed out after the snapshot was taken stay used
        restored.advance_ordinal_to(document.next_ordinal());
        *document = restored;

        let changed = self.statuses.refresh(&document);
        let document_id = document.id.clone();
        drop(document);

        self.emit_statuses(&document_id, changed);
        Ok(true)
    }

    async fn refresh_statuses(&mut self) {
        let document = self.document.read().await;
        let changed = self.statuses.refresh(&document);
        let document_id = document.id.clone();
        drop(document);
        self.emit_statuses(&document_id, changed);
    }

    fn emit_statuses(&self, document_id: &str, changed: Vec<(NodeId, NodeStatus)>) {
        for (node_id, status) in changed {
            emit(
                self.events.as_ref(),
                CompilerEvent::status_changed(document_id, &node_id, status),
            );
        }
    }
}

impl std::fmt::Debug for PipelineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSession")
            .field("registry", &self.registry.len())
            .field("config", &self.config)
            .field("can_undo", &self.history.can_undo())
            .finish_non_exhaustive()
    }
}
