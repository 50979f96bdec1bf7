// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while turning a user graph into an executable task plan,
//! and while selecting a scheduling backend.

use thiserror::Error;

use super::BoxedCause;

/// The user-supplied graph cannot be compiled into a task plan.
#[derive(Debug, Error)]
pub enum GraphValidationError {
    /// The graph contains at least one dependency cycle. Nodes that could
    /// not be ordered are listed.
    #[error("dependency cycle detected; unresolvable nodes: [{}]", .remaining.join(", "))]
    Cycle { remaining: Vec<String> },

    /// An edge points from a node to itself.
    #[error("self-referencing edge on node '{node}'")]
    SelfEdge { node: String },

    /// A node lacks the required `call` descriptor attribute.
    #[error("node '{node}' has no 'call' descriptor")]
    MissingCall { node: String },

    /// An `(edges, attrs)` pair could not be assembled into a graph.
    #[error("malformed (edges, attrs) graph: {reason}")]
    MalformedEdges { reason: String },

    /// A dotted-path graph reference is not present in the graph registry.
    #[error("graph '{path}' is not registered")]
    UnknownGraph { path: String },

    /// A graph factory was invoked and failed.
    #[error("graph factory failed: {source}")]
    Factory {
        #[source]
        source: BoxedCause,
    },
}

/// The requested scheduling backend cannot be built.
#[derive(Debug, Error)]
pub enum SchedulerConfigError {
    #[error("scheduler '{name}' not recognised, please choose from: {known}")]
    UnknownBackend { name: String, known: &'static str },

    #[error("num_workers must be a positive integer (got {got})")]
    InvalidWorkerCount { got: usize },
}
