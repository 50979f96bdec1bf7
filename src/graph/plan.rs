// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The compiled task plan: scheduler-agnostic task records keyed by
//! deterministic fingerprints of the user's node identifiers.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::descriptor::{CallDescriptor, UnitRef};
use crate::errors::GraphValidationError;
use crate::graph::node::NodeId;
use crate::traits::Unit;
use crate::values::ParamMap;

/// Scheduler key for one task: a stable fingerprint of its node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Fingerprint a node identifier. The canonical (sorted-field) JSON
    /// form is hashed with SHA-256 and truncated, so the same NodeId maps
    /// to the same TaskId in every process.
    pub fn fingerprint(node: &NodeId) -> Self {
        let canonical =
            serde_json::to_vec(node).expect("NodeId serialization cannot fail");
        let digest = Sha256::digest(&canonical);
        let mut hex = String::with_capacity(32);
        for byte in &digest[..16] {
            hex.push_str(&format!("{:02x}", byte));
        }
        TaskId(hex)
    }

    /// Identifier for an engine-injected task (dummy sinks). Namespaced so
    /// it can never collide with a fingerprint.
    pub fn synthetic(name: &str) -> Self {
        TaskId(format!("waiter-{}", name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of the compiled plan. Created once by the compiler and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    /// Predecessor task IDs in the graph's adjacency order; their values
    /// become this task's positional inputs, in this order.
    pub predecessors: Vec<TaskId>,
    pub call: CallDescriptor,
    /// Node properties plus the injected `node_id` entry.
    pub properties: ParamMap,
    /// The originating node; `None` for engine-injected sinks.
    pub node: Option<NodeId>,
}

impl Task {
    pub fn is_synthetic(&self) -> bool {
        self.node.is_none()
    }

    /// Human-readable node label for logs and errors.
    pub fn node_label(&self) -> String {
        match &self.node {
            Some(node) => node.to_string(),
            None => self.id.to_string(),
        }
    }
}

/// The full plan: tasks by ID plus a deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct TaskPlan {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
}

impl TaskPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task; a task with an already-present ID replaces the
    /// previous record without changing the plan order.
    pub fn insert(&mut self, task: Task) {
        if !self.tasks.contains_key(&task.id) {
            self.order.push(task.id.clone());
        }
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let removed = self.tasks.remove(id);
        if removed.is_some() {
            self.order.retain(|other| other != id);
        }
        removed
    }

    /// Successor adjacency derived from the predecessor lists. Predecessor
    /// references that are not in the plan (e.g. pruned by the cache
    /// filter) are ignored.
    pub fn successors(&self) -> HashMap<TaskId, Vec<TaskId>> {
        let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        for id in &self.order {
            successors.entry(id.clone()).or_default();
        }
        for task in self.iter() {
            for pred in &task.predecessors {
                if self.tasks.contains_key(pred) {
                    successors
                        .entry(pred.clone())
                        .or_default()
                        .push(task.id.clone());
                }
            }
        }
        successors
    }

    /// Number of in-plan predecessors per task.
    pub fn dependency_counts(&self) -> HashMap<TaskId, usize> {
        self.iter()
            .map(|task| {
                let count = task
                    .predecessors
                    .iter()
                    .filter(|pred| self.tasks.contains_key(pred))
                    .count();
                (task.id.clone(), count)
            })
            .collect()
    }

    /// Tasks with no in-plan predecessors, in plan order.
    pub fn entry_tasks(&self) -> Vec<TaskId> {
        let counts = self.dependency_counts();
        self.order
            .iter()
            .filter(|id| counts.get(*id).copied() == Some(0))
            .cloned()
            .collect()
    }

    /// Kahn's algorithm. Deterministic: ready tasks are processed in plan
    /// order. Fails if any task remains unordered (a cycle).
    pub fn topological_order(&self) -> Result<Vec<TaskId>, GraphValidationError> {
        let mut counts = self.dependency_counts();
        let successors = self.successors();
        let mut queue: VecDeque<TaskId> = self
            .order
            .iter()
            .filter(|id| counts.get(*id).copied() == Some(0))
            .cloned()
            .collect();
        let mut sorted = Vec::with_capacity(self.order.len());

        while let Some(id) = queue.pop_front() {
            sorted.push(id.clone());
            if let Some(dependents) = successors.get(&id) {
                for dependent in dependents {
                    if let Some(count) = counts.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(dependent.clone());
                        }
                    }
                }
            }
        }

        if sorted.len() == self.order.len() {
            Ok(sorted)
        } else {
            let ordered: std::collections::HashSet<_> = sorted.into_iter().collect();
            let remaining = self
                .iter()
                .filter(|task| !ordered.contains(&task.id))
                .map(|task| task.node_label())
                .collect();
            Err(GraphValidationError::Cycle { remaining })
        }
    }

    /// Inject one no-op sink per terminal task, then a global sink when
    /// more than one branch exists. The global sink is the plan's single
    /// terminal: forcing it forces every task, while per-branch sinks keep
    /// each branch's data on its producing worker instead of gathering all
    /// outputs in one place. Returns the terminal's ID, or `None` for an
    /// empty plan.
    pub fn inject_dummy_sinks(&mut self, no_op: Arc<dyn Unit>) -> Option<TaskId> {
        if self.is_empty() {
            return None;
        }

        let successors = self.successors();
        let terminals: Vec<TaskId> = self
            .order
            .iter()
            .filter(|id| successors.get(*id).map_or(true, Vec::is_empty))
            .cloned()
            .collect();

        let mut sink_ids = Vec::with_capacity(terminals.len());
        for terminal in &terminals {
            let sink_id = TaskId::synthetic(terminal.as_str());
            self.insert(Task {
                id: sink_id.clone(),
                predecessors: vec![terminal.clone()],
                call: CallDescriptor::bare(UnitRef::Invocable(no_op.clone())),
                properties: ParamMap::new(),
                node: None,
            });
            sink_ids.push(sink_id);
        }

        if sink_ids.len() == 1 {
            sink_ids.pop()
        } else {
            let terminal_id = TaskId::synthetic("terminal");
            self.insert(Task {
                id: terminal_id.clone(),
                predecessors: sink_ids,
                call: CallDescriptor::bare(UnitRef::Invocable(no_op)),
                properties: ParamMap::new(),
                node: None,
            });
            Some(terminal_id)
        }
    }
}
