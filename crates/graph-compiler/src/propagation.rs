//! Column metadata propagation
//!
//! A pass walks the document in dependency order and computes, for every
//! node, the columns available on each input port and produced on each
//! output port. Source nodes fetch their columns from the schema library;
//! transform nodes run their registered [`ColumnTransform`]; sinks and free
//! nodes publish nothing.
//!
//! Passes are exclusive. A trigger that arrives while a pass is running is
//! dropped rather than queued, and a trigger that finds the document's
//! inputs unchanged since the last pass does nothing. The document lock is
//! held only to snapshot and to apply, never while waiting on the library.
//!
//! [`ColumnTransform`]: crate::registry::ColumnTransform

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::RwLock;

use crate::config::CyclePolicy;
use crate::document::DocumentState;
use crate::events::{emit, CompilerEvent, EventSink, NullEventSink};
use crate::library::SchemaLibrary;
use crate::registry::{publish, NodeKind, SchemaRegistry};
use crate::topology::{depth_first_order, topological_sort, CycleDetected};
use crate::types::{
    Column, FetchDescriptor, FetchSource, GraphNode, NodeCategory, NodeId, NodeMetadata, PortColumns,
    PropagationStatus, Values,
};

/// Per-node results of a completed pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Nodes whose metadata changed and was written
    pub updated: Vec<NodeId>,
    /// Nodes whose fetch or transform failed
    pub errors: Vec<NodeId>,
    /// Nodes deleted while the pass was running
    pub discarded: Vec<NodeId>,
}

/// What a propagation trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was in flight
    Dropped,
    /// Nothing that affects propagation changed since the last pass
    Unchanged,
    /// The graph has a cycle and nothing was written
    CycleDetected(CycleDetected),
    Completed(PassReport),
}

/// Releases the in-flight flag when a pass ends, however it ends
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps column metadata of a shared document current
pub struct SchemaPropagator {
    document: Arc<RwLock<DocumentState>>,
    registry: Arc<SchemaRegistry>,
    library: Arc<dyn SchemaLibrary>,
    events: Arc<dyn EventSink>,
    policy: CyclePolicy,
    in_flight: AtomicBool,
    last_fingerprint: Mutex<Option<u64>>,
}

impl SchemaPropagator {
    pub fn new(
        document: Arc<RwLock<DocumentState>>,
        registry: Arc<SchemaRegistry>,
        library: Arc<dyn SchemaLibrary>,
    ) -> Self {
        Self {
            document,
            registry,
            library,
            events: Arc::new(NullEventSink),
            policy: CyclePolicy::default(),
            in_flight: AtomicBool::new(false),
            last_fingerprint: Mutex::new(None),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Whether a pass is currently running
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Forget the last fingerprint so the next trigger always runs a pass
    pub fn invalidate(&self) {
        *self.last_fingerprint.lock() = None;
    }

    /// Run a pass unless one is in flight or nothing changed
    pub async fn trigger(&self) -> PassOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let document_id = self.document.read().await.id.clone();
            log::debug!("Propagation for '{}' dropped: pass in flight", document_id);
            emit(
                self.events.as_ref(),
                CompilerEvent::propagation_skipped(&document_id, "pass in flight"),
            );
            return PassOutcome::Dropped;
        }
        let _guard = PassGuard(&self.in_flight);

        let (snapshot, fingerprint) = {
            let document = self.document.read().await;
            (document.clone(), document.propagation_fingerprint())
        };

        if *self.last_fingerprint.lock() == Some(fingerprint) {
            emit(
                self.events.as_ref(),
                CompilerEvent::propagation_skipped(&snapshot.id, "unchanged"),
            );
            return PassOutcome::Unchanged;
        }

        let order = match self.policy {
            CyclePolicy::FailFast => match topological_sort(&snapshot.nodes, &snapshot.edges) {
                Ok(order) => order,
                Err(cycle) => {
                    log::warn!("Propagation for '{}' stopped: {}", snapshot.id, cycle);
                    *self.last_fingerprint.lock() = Some(fingerprint);
                    emit(
                        self.events.as_ref(),
                        CompilerEvent::CycleDetected {
                            document_id: snapshot.id.clone(),
                            unsorted: cycle.unsorted.clone(),
                        },
                    );
                    return PassOutcome::CycleDetected(cycle);
                }
            },
            CyclePolicy::SilentStop => depth_first_order(&snapshot.nodes, &snapshot.edges),
        };

        let fetched = self.prefetch(&snapshot).await;
        let results = self.walk(&snapshot, &order, fetched);
        let report = self.apply(results).await;

        *self.last_fingerprint.lock() = Some(fingerprint);
        log::info!(
            "Propagation for '{}' complete: {} updated, {} error(s), {} discarded",
            snapshot.id,
            report.updated.len(),
            report.errors.len(),
            report.discarded.len()
        );
        emit(
            self.events.as_ref(),
            CompilerEvent::PropagationCompleted {
                document_id: snapshot.id.clone(),
                updated: report.updated.len(),
                errors: report.errors.len(),
            },
        );
        PassOutcome::Completed(report)
    }

    fn fetch_descriptor<'a>(&'a self, node: &'a GraphNode) -> Option<&'a FetchDescriptor> {
        match self.registry.kind(node.algorithm()) {
            Some(NodeKind::Source(fetch)) => Some(fetch),
            _ => node.schema.fetch.as_ref(),
        }
    }

    /// Fetch the columns of every source node concurrently
    async fn prefetch(&self, snapshot: &DocumentState) -> HashMap<NodeId, Result<Vec<Column>, String>> {
        let fetches = snapshot
            .nodes
            .iter()
            .filter(|node| node.category() == NodeCategory::Source)
            .map(|node| async move {
                let result = match self.fetch_descriptor(node) {
                    Some(fetch) => self.fetch_columns(node, fetch).await,
                    None => Err(format!("source '{}' has no fetch descriptor", node.algorithm())),
                };
                (node.id.clone(), result)
            });
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_columns(&self, node: &GraphNode, fetch: &FetchDescriptor) -> Result<Vec<Column>, String> {
        let key = match node.value_or_default(fetch.source.parameter()) {
            serde_json::Value::String(s) if !s.is_empty() => s,
            _ => return Err(format!("parameter '{}' is not set", fetch.source.parameter())),
        };

        let fetched = match &fetch.source {
            FetchSource::File { .. } => self.library.file_columns(&key).await,
            FetchSource::Variable { .. } => self.library.variable_columns(&key).await,
        };
        let mut columns = fetched.map_err(|e| e.to_string())?;

        if let Some(index_parameter) = &fetch.index_parameter {
            let index = index_names(&node.value_or_default(index_parameter));
            columns.retain(|c| !index.contains(&c.name.to_lowercase()));
        }
        Ok(columns)
    }

    /// Compute metadata for every node in order, without touching the shared document
    fn walk(
        &self,
        snapshot: &DocumentState,
        order: &[NodeId],
        mut fetched: HashMap<NodeId, Result<Vec<Column>, String>>,
    ) -> Vec<(NodeId, NodeMetadata)> {
        let mut computed: HashMap<NodeId, NodeMetadata> = HashMap::with_capacity(order.len());
        let mut results = Vec::with_capacity(order.len());

        for node_id in order {
            let Some(node) = snapshot.find_node(node_id) else {
                continue;
            };

            let mut input_columns = PortColumns::new();
            for edge in snapshot.incoming_edges(node_id) {
                let upstream = computed
                    .get(&edge.source)
                    .or_else(|| snapshot.find_node(&edge.source).map(|n| &n.metadata));
                if let Some(upstream) = upstream {
                    let columns = upstream
                        .output_columns
                        .get(&edge.source_port)
                        .cloned()
                        .unwrap_or_default();
                    input_columns.insert(edge.target_port.clone(), columns);
                }
            }

            let outputs = match node.category() {
                NodeCategory::Source => fetched
                    .remove(node_id)
                    .unwrap_or_else(|| Err("columns were not fetched".to_string()))
                    .map(|columns| publish(&node.schema, columns)),
                NodeCategory::Transform => self.transform(node, &input_columns),
                NodeCategory::Sink | NodeCategory::Free => Ok(PortColumns::new()),
            };

            let metadata = match outputs {
                Ok(output_columns) => NodeMetadata {
                    input_columns,
                    output_columns,
                    status: PropagationStatus::Ready,
                },
                Err(message) => {
                    log::debug!("Propagation failed for node '{}': {}", node_id, message);
                    NodeMetadata {
                        input_columns,
                        output_columns: PortColumns::new(),
                        status: PropagationStatus::Error { message },
                    }
                }
            };
            computed.insert(node_id.clone(), metadata.clone());
            results.push((node_id.clone(), metadata));
        }
        results
    }

    fn transform(&self, node: &GraphNode, inputs: &PortColumns) -> Result<PortColumns, String> {
        match self.registry.kind(node.algorithm()) {
            Some(NodeKind::Transform(transform)) => transform
                .output_columns(inputs, &effective_values(node), &node.schema)
                .map_err(|e| e.to_string()),
            _ => Err(format!(
                "no column transform registered for '{}'",
                node.algorithm()
            )),
        }
    }

    /// Write changed metadata back, skipping nodes deleted mid-pass
    async fn apply(&self, results: Vec<(NodeId, NodeMetadata)>) -> PassReport {
        let mut report = PassReport::default();
        let mut events = Vec::new();
        {
            let mut document = self.document.write().await;
            let document_id = document.id.clone();
            for (node_id, metadata) in results {
                let Some(node) = document.find_node_mut(&node_id) else {
                    report.discarded.push(node_id);
                    continue;
                };
                if matches!(metadata.status, PropagationStatus::Error { .. }) {
                    report.errors.push(node_id.clone());
                }
                if node.metadata == metadata {
                    continue;
                }
                node.metadata = metadata.clone();
                events.push(CompilerEvent::ColumnsUpdated {
                    document_id: document_id.clone(),
                    node_id: node_id.clone(),
                    metadata,
                });
                report.updated.push(node_id);
            }
        }
        for event in events {
            emit(self.events.as_ref(), event);
        }
        report
    }
}

/// Node values with schema defaults filled in
fn effective_values(node: &GraphNode) -> Values {
    let mut values = node.values.clone();
    for parameter in &node.schema.parameters {
        values
            .entry(parameter.name.clone())
            .or_insert_with(|| parameter.default.clone());
    }
    values
}

/// Lowercased index column names held by a name or a list of names
fn index_names(value: &serde_json::Value) -> Vec<String> {
    let names: Vec<&str> = match value {
        serde_json::Value::String(name) => vec![name.as_str()],
        serde_json::Value::Array(items) => items.iter().filter_map(serde_json::Value::as_str).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase)
        .collect()
}
