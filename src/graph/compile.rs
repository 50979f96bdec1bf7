// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Graph resolution and plan compilation.
//!
//! `resolve_graph` normalises the accepted graph forms into a
//! [`PipelineGraph`]; `compile_plan` validates it (self-edges, missing
//! call descriptors, cycles) and flattens it into a [`TaskPlan`] keyed by
//! node fingerprints.

use crate::config::registry::GraphRegistry;
use crate::errors::GraphValidationError;
use crate::graph::plan::{Task, TaskId, TaskPlan};
use crate::graph::{GraphSource, PipelineGraph};
use crate::values::ParamMap;

/// Normalise a [`GraphSource`] into a ready graph. Factories receive the
/// run's graph params; dotted paths are looked up in the graph registry.
pub fn resolve_graph(
    source: GraphSource,
    params: &ParamMap,
    graphs: &GraphRegistry,
) -> Result<PipelineGraph, GraphValidationError> {
    match source {
        GraphSource::Graph(graph) => Ok(graph),
        GraphSource::Factory(factory) => factory
            .build(params)
            .map_err(|err| GraphValidationError::Factory { source: err.into() }),
        GraphSource::Path(path) => {
            let factory = graphs
                .resolve(&path)
                .ok_or(GraphValidationError::UnknownGraph { path })?;
            factory
                .build(params)
                .map_err(|err| GraphValidationError::Factory { source: err.into() })
        }
        GraphSource::EdgesAttrs(edges, attrs) => {
            if edges
                .iter()
                .any(|(from, to)| from.is_empty() || to.is_empty())
            {
                return Err(GraphValidationError::MalformedEdges {
                    reason: "edge endpoint with an empty node identifier".to_string(),
                });
            }
            Ok(PipelineGraph::from_edges(edges, attrs))
        }
    }
}

/// Flatten a graph into a task plan.
///
/// For every node, the task ID is the node fingerprint and the predecessor
/// IDs follow the graph's adjacency order. Node properties are copied into
/// the task with the originating node injected under `node_id`. Validation
/// rejects self-edges, nodes without a `call` descriptor and cyclic graphs.
pub fn compile_plan(graph: &PipelineGraph) -> Result<TaskPlan, GraphValidationError> {
    let mut plan = TaskPlan::new();

    for node in graph.nodes() {
        if graph.successors(node).contains(node) {
            return Err(GraphValidationError::SelfEdge {
                node: node.to_string(),
            });
        }

        let attrs = graph.attrs(node).cloned().unwrap_or_default();
        let call = attrs.call.ok_or_else(|| GraphValidationError::MissingCall {
            node: node.to_string(),
        })?;

        let mut properties = attrs.properties;
        properties.insert(
            "node_id".to_string(),
            serde_json::to_value(node).unwrap_or(serde_json::Value::Null),
        );

        plan.insert(Task {
            id: TaskId::fingerprint(node),
            predecessors: graph
                .predecessors(node)
                .iter()
                .map(TaskId::fingerprint)
                .collect(),
            call,
            properties,
            node: Some(node.clone()),
        });
    }

    // Cycle check before handing the plan to any scheduler.
    plan.topological_order()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CallDescriptor, UnitRef};
    use crate::graph::{NodeAttrs, NodeId};
    use crate::values::Value;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct NoOp;

    #[async_trait]
    impl crate::traits::Unit for NoOp {
        async fn call(
            &self,
            _args: Vec<Value>,
            _params: &ParamMap,
        ) -> anyhow::Result<Value> {
            Ok(Value::None)
        }

        fn name(&self) -> &str {
            "no_op"
        }
    }

    fn callable() -> NodeAttrs {
        NodeAttrs::new(CallDescriptor::bare(UnitRef::invocable(NoOp)))
    }

    fn chain() -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        graph.add_node(NodeId::named("a"), callable());
        graph.add_node(NodeId::named("b"), callable());
        graph.add_edge(NodeId::named("a"), NodeId::named("b"));
        graph
    }

    #[test]
    fn test_compile_builds_fingerprinted_tasks() {
        let plan = compile_plan(&chain()).unwrap();
        assert_eq!(plan.len(), 2);

        let b_id = TaskId::fingerprint(&NodeId::named("b"));
        let b = plan.get(&b_id).unwrap();
        assert_eq!(
            b.predecessors,
            vec![TaskId::fingerprint(&NodeId::named("a"))]
        );
        assert_eq!(b.node, Some(NodeId::named("b")));
    }

    #[test]
    fn test_compile_injects_node_id_property() {
        let plan = compile_plan(&chain()).unwrap();
        let a = plan.get(&TaskId::fingerprint(&NodeId::named("a"))).unwrap();
        assert_eq!(
            a.properties.get("node_id"),
            Some(&serde_json::json!({"id": "a"}))
        );
    }

    #[test]
    fn test_compile_rejects_missing_call() {
        let mut graph = chain();
        graph.add_node(NodeId::named("c"), NodeAttrs::default());
        assert!(matches!(
            compile_plan(&graph),
            Err(GraphValidationError::MissingCall { node }) if node == "id=c"
        ));
    }

    #[test]
    fn test_compile_rejects_self_edge() {
        let mut graph = chain();
        graph.add_edge(NodeId::named("a"), NodeId::named("a"));
        assert!(matches!(
            compile_plan(&graph),
            Err(GraphValidationError::SelfEdge { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_cycle() {
        let mut graph = chain();
        graph.add_edge(NodeId::named("b"), NodeId::named("a"));
        assert!(matches!(
            compile_plan(&graph),
            Err(GraphValidationError::Cycle { .. })
        ));
    }

    #[test]
    fn test_compiling_twice_yields_equal_plans() {
        let graph = chain();
        let first = compile_plan(&graph).unwrap();
        let second = compile_plan(&graph).unwrap();
        assert_eq!(first.task_ids(), second.task_ids());
        for task in first.iter() {
            let twin = second.get(&task.id).unwrap();
            assert_eq!(task.predecessors, twin.predecessors);
            assert_eq!(task.node, twin.node);
        }
    }

    #[test]
    fn test_resolve_unknown_path_fails() {
        let graphs = GraphRegistry::new();
        let result = resolve_graph(
            GraphSource::Path("missing.graph".into()),
            &ParamMap::new(),
            &graphs,
        );
        assert!(matches!(
            result,
            Err(GraphValidationError::UnknownGraph { path }) if path == "missing.graph"
        ));
    }

    #[test]
    fn test_resolve_factory_receives_params() {
        let graphs = GraphRegistry::new();
        let factory = Arc::new(|params: &ParamMap| -> anyhow::Result<PipelineGraph> {
            let mut graph = PipelineGraph::new();
            let name = params
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("default");
            graph.add_node(NodeId::named(name), callable());
            Ok(graph)
        });
        let mut params = ParamMap::new();
        params.insert("name".into(), serde_json::json!("root"));

        let graph =
            resolve_graph(GraphSource::Factory(factory), &params, &graphs).unwrap();
        assert!(graph.attrs(&NodeId::named("root")).is_some());
    }

    #[test]
    fn test_resolve_rejects_empty_edge_endpoint() {
        let source = GraphSource::EdgesAttrs(
            vec![(NodeId::new(), NodeId::named("b"))],
            HashMap::new(),
        );
        assert!(matches!(
            resolve_graph(source, &ParamMap::new(), &GraphRegistry::new()),
            Err(GraphValidationError::MalformedEdges { .. })
        ));
    }

    #[test]
    fn test_resolve_edges_attrs() {
        let mut attrs = HashMap::new();
        attrs.insert(NodeId::named("a"), callable());
        attrs.insert(NodeId::named("b"), callable());
        let source = GraphSource::EdgesAttrs(
            vec![(NodeId::named("a"), NodeId::named("b"))],
            attrs,
        );
        let graph =
            resolve_graph(source, &ParamMap::new(), &GraphRegistry::new()).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.predecessors(&NodeId::named("b")).len(), 1);
    }
}
