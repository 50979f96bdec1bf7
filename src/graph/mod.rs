// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! User-facing graph model and the compiler producing the task plan.

pub mod compile;
pub mod node;
pub mod plan;

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::CallDescriptor;
use crate::values::ParamMap;

pub use compile::{compile_plan, resolve_graph};
pub use node::{FieldValue, NodeId};
pub use plan::{Task, TaskId, TaskPlan};

/// Attributes attached to one graph node: the required call descriptor and
/// free-form node properties.
#[derive(Debug, Clone, Default)]
pub struct NodeAttrs {
    pub call: Option<CallDescriptor>,
    pub properties: ParamMap,
}

impl NodeAttrs {
    pub fn new(call: CallDescriptor) -> Self {
        Self {
            call: Some(call),
            properties: ParamMap::new(),
        }
    }

    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A directed graph of pipeline nodes with insertion-ordered adjacency.
///
/// Insertion order is preserved for nodes and for each node's predecessor
/// list: predecessor order determines the order of a task's positional
/// inputs, so it must be deterministic.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    order: Vec<NodeId>,
    attrs: HashMap<NodeId, NodeAttrs>,
    successors: HashMap<NodeId, Vec<NodeId>>,
    predecessors: HashMap<NodeId, Vec<NodeId>>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with its attributes. Re-adding an existing node replaces
    /// its attributes and keeps its position and edges.
    pub fn add_node(&mut self, id: NodeId, attrs: NodeAttrs) {
        if !self.attrs.contains_key(&id) {
            self.order.push(id.clone());
            self.successors.entry(id.clone()).or_default();
            self.predecessors.entry(id.clone()).or_default();
        }
        self.attrs.insert(id, attrs);
    }

    /// Add a directed edge. Endpoints missing from the graph are created
    /// with default attributes; duplicate edges are ignored.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.ensure_node(&from);
        self.ensure_node(&to);
        let dependents = self.successors.entry(from.clone()).or_default();
        if !dependents.contains(&to) {
            dependents.push(to.clone());
            self.predecessors.entry(to).or_default().push(from);
        }
    }

    fn ensure_node(&mut self, id: &NodeId) {
        if !self.attrs.contains_key(id) {
            self.add_node(id.clone(), NodeAttrs::default());
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.order.iter()
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn attrs(&self, id: &NodeId) -> Option<&NodeAttrs> {
        self.attrs.get(id)
    }

    pub fn attrs_mut(&mut self, id: &NodeId) -> Option<&mut NodeAttrs> {
        self.attrs.get_mut(id)
    }

    pub fn predecessors(&self, id: &NodeId) -> &[NodeId] {
        self.predecessors.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn successors(&self, id: &NodeId) -> &[NodeId] {
        self.successors.get(id).map_or(&[], Vec::as_slice)
    }

    /// Build a graph from an edge list and a per-node attribute map. Each
    /// node's own identifier fields are first copied into its properties
    /// (the attribute map wins on key conflicts), then edges are added in
    /// list order.
    pub fn from_edges(
        edges: Vec<(NodeId, NodeId)>,
        attrs: HashMap<NodeId, NodeAttrs>,
    ) -> Self {
        let mut graph = PipelineGraph::new();
        for (id, node_attrs) in attrs {
            let mut merged = node_attrs;
            for (key, field) in id.fields() {
                if !merged.properties.contains_key(key) {
                    merged
                        .properties
                        .insert(key.clone(), field_to_json(field));
                }
            }
            graph.add_node(id, merged);
        }
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }
}

fn field_to_json(field: &FieldValue) -> serde_json::Value {
    match field {
        FieldValue::Str(s) => serde_json::Value::String(s.clone()),
        FieldValue::Int(i) => serde_json::json!(i),
        FieldValue::Bool(b) => serde_json::Value::Bool(*b),
    }
}

/// A callable producing a graph, optionally parameterised by the run
/// coordinator's graph params.
pub trait GraphFactory: Send + Sync {
    fn build(&self, params: &ParamMap) -> anyhow::Result<PipelineGraph>;
}

impl<F> GraphFactory for F
where
    F: Fn(&ParamMap) -> anyhow::Result<PipelineGraph> + Send + Sync,
{
    fn build(&self, params: &ParamMap) -> anyhow::Result<PipelineGraph> {
        self(params)
    }
}

/// The accepted forms of a user-supplied graph.
pub enum GraphSource {
    /// A ready graph value.
    Graph(PipelineGraph),
    /// A dotted-path string resolved through the graph registry.
    Path(String),
    /// A factory invoked with the run's graph params.
    Factory(Arc<dyn GraphFactory>),
    /// An edge list plus per-node attributes.
    EdgesAttrs(Vec<(NodeId, NodeId)>, HashMap<NodeId, NodeAttrs>),
}
