// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while executing a single node and while running the plan.
//!
//! Unit failures are wrapped exactly once, close to the failure, with the
//! full invocation context (unit name, parameters, node properties). The
//! schedulers then wrap whatever reached them in a [`TaskExecutionError`]
//! carrying the task identity; nothing is swallowed or retried.

use thiserror::Error;

use super::BoxedCause;
use crate::values::ParamMap;

/// A call descriptor shape that is incompatible with the kind of unit it
/// names (e.g. the three-element init shape applied to a plain invocable).
#[derive(Debug, Error)]
#[error("call descriptor of arity {arity} is invalid for unit '{unit}': {reason}")]
pub struct InitArityError {
    pub arity: usize,
    pub unit: String,
    pub reason: &'static str,
}

/// A constructible unit's builder failed.
#[derive(Debug, Error)]
#[error(
    "failed to construct unit '{unit}' (init_params={init_params:?}, \
     node_properties={node_properties:?}): {source}"
)]
pub struct UnitInitError {
    pub unit: String,
    pub init_params: ParamMap,
    pub node_properties: ParamMap,
    #[source]
    pub source: BoxedCause,
}

/// A unit invocation failed.
#[derive(Debug, Error)]
#[error(
    "unit '{unit}' failed (args=[{}], call_params={call_params:?}, \
     node_properties={node_properties:?}): {source}", .args.join(", ")
)]
pub struct UnitCallError {
    pub unit: String,
    /// Short renderings of the positional inputs at failure time.
    pub args: Vec<String>,
    pub call_params: ParamMap,
    pub node_properties: ParamMap,
    #[source]
    pub source: BoxedCause,
}

/// Any failure produced by the node-execution contract.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Arity(#[from] InitArityError),
    #[error(transparent)]
    Init(#[from] UnitInitError),
    #[error(transparent)]
    Call(#[from] UnitCallError),
}

/// A failure observed by a scheduler while running the task plan.
#[derive(Debug, Error)]
pub enum TaskExecutionError {
    /// A single task failed; wraps the unit-level error with the task
    /// identity and a summary of its call descriptor.
    #[error("task '{task_id}' ({node}) running {descriptor} failed: {source}")]
    Task {
        task_id: String,
        node: String,
        descriptor: String,
        #[source]
        source: UnitError,
    },

    /// Several tasks failed before the in-flight set drained
    /// (non-fail-fast runs).
    #[error("{} task(s) failed during plan execution", .failures.len())]
    Aggregate { failures: Vec<TaskExecutionError> },

    /// The scheduler itself misbehaved (worker panic, wire fault).
    #[error("scheduler internal error: {message}")]
    Internal { message: String },
}
