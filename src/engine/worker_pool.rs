// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency-driven asynchronous worker-pool scheduler.
//!
//! The coordinator owns all bookkeeping: per-task state
//! (`Pending → Ready → Running → Done | Failed`), remaining dependency
//! counts, the ready queue and the in-memory result map. Ready tasks are
//! submitted to a fixed-size logical pool of spawned workers with their
//! positional inputs materialised *by value* before submission;
//! completions drain through a `JoinSet` in a polling loop.
//!
//! Memory hygiene: a task's value is evicted from the result map the
//! moment every consumer has finished, which keeps long chains with large
//! intermediate values from accumulating. Values whose consumers have all
//! been satisfied but that never had a consumer (terminal tasks) are kept
//! and returned to the caller.
//!
//! Failure handling: in fail-fast mode the first failure aborts the pool
//! (in-flight workers are cancelled on drop) and is returned as-is.
//! Otherwise no further task is submitted, the in-flight set drains, and
//! a single error aggregating every captured failure is returned.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::engine::node_executor::execute_node;
use crate::errors::{TaskExecutionError, UnitError};
use crate::graph::plan::{Task, TaskId, TaskPlan};
use crate::observability::messages::engine::ExecutionStarted;
use crate::observability::messages::StructuredLog;
use crate::traits::{RunContext, Scheduler};
use crate::values::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    Pending,
    Ready,
    Running,
    Done,
    Failed,
}

pub struct WorkerPoolScheduler {
    num_workers: usize,
    fail_fast: bool,
}

impl WorkerPoolScheduler {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            fail_fast: true,
        }
    }

    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Materialise a task's positional inputs from the result map. Inputs of
/// predecessors pruned from the plan are loaded from the cache store;
/// anything else missing resolves to an absent value.
fn materialise_inputs(
    task: &Task,
    results: &HashMap<TaskId, Value>,
    plan: &TaskPlan,
    ctx: &RunContext,
) -> Vec<Value> {
    task.predecessors
        .iter()
        .map(|pred| {
            if let Some(value) = results.get(pred) {
                return value.clone();
            }
            if !plan.contains(pred) {
                if let Some(cache) = &ctx.cache {
                    if let Some(value) = cache.load(pred) {
                        return value;
                    }
                }
            }
            Value::None
        })
        .collect()
}

fn wrap_failure(task: &Task, source: UnitError) -> TaskExecutionError {
    TaskExecutionError::Task {
        task_id: task.id.to_string(),
        node: task.node_label(),
        descriptor: task.call.summary(),
        source,
    }
}

#[async_trait]
impl Scheduler for WorkerPoolScheduler {
    async fn run(
        &self,
        plan: TaskPlan,
        ctx: Arc<RunContext>,
    ) -> Result<HashMap<TaskId, Value>, TaskExecutionError> {
        if ctx.profiler_path.is_some() {
            tracing::warn!("profiler output is not supported by the worker-pool scheduler");
        }
        ExecutionStarted {
            scheduler: self.name(),
            task_count: plan.len(),
            num_workers: self.num_workers,
        }
        .log();

        let successors = plan.successors();
        let mut dep_counts = plan.dependency_counts();
        let mut states: HashMap<TaskId, TaskState> = plan
            .task_ids()
            .iter()
            .map(|id| (id.clone(), TaskState::Pending))
            .collect();

        let mut ready: VecDeque<TaskId> = VecDeque::new();
        for id in plan.entry_tasks() {
            states.insert(id.clone(), TaskState::Ready);
            ready.push_back(id);
        }

        let mut results: HashMap<TaskId, Value> = HashMap::new();
        let mut failures: Vec<TaskExecutionError> = Vec::new();
        let mut halted = false;
        let mut running = 0usize;
        // The pool lives for the duration of this call; dropping the set
        // on any exit path cancels whatever is still in flight.
        let mut pool: JoinSet<(TaskId, Result<Value, UnitError>)> = JoinSet::new();

        loop {
            while running < self.num_workers && !halted {
                let Some(task_id) = ready.pop_front() else {
                    break;
                };
                let Some(task) = plan.get(&task_id) else {
                    continue;
                };
                let inputs = materialise_inputs(task, &results, &plan, &ctx);
                states.insert(task_id.clone(), TaskState::Running);
                running += 1;

                let task = task.clone();
                let ctx = ctx.clone();
                pool.spawn(async move {
                    let result = execute_node(&task, inputs, &ctx).await;
                    (task.id.clone(), result)
                });
            }

            let mut progressed = false;
            while let Some(joined) = pool.try_join_next() {
                progressed = true;
                running -= 1;
                match joined {
                    Ok((task_id, Ok(value))) => {
                        states.insert(task_id.clone(), TaskState::Done);
                        if let Some(cache) = &ctx.cache {
                            if let Err(err) = cache.store(&task_id, &value) {
                                tracing::warn!(
                                    task_id = %task_id,
                                    error = %err,
                                    "failed to persist cache artifact"
                                );
                            }
                        }
                        results.insert(task_id.clone(), value);

                        if let Some(dependents) = successors.get(&task_id) {
                            for dependent in dependents {
                                if let Some(count) = dep_counts.get_mut(dependent) {
                                    *count -= 1;
                                    if *count == 0 && !halted {
                                        states.insert(dependent.clone(), TaskState::Ready);
                                        ready.push_back(dependent.clone());
                                    }
                                }
                            }
                        }

                        // Evict values every consumer has finished with.
                        results.retain(|id, _| {
                            successors.get(id).map_or(true, |dependents| {
                                dependents.is_empty()
                                    || dependents.iter().any(|d| {
                                        states.get(d).copied() != Some(TaskState::Done)
                                    })
                            })
                        });
                    }
                    Ok((task_id, Err(unit_err))) => {
                        states.insert(task_id.clone(), TaskState::Failed);
                        let error = match plan.get(&task_id) {
                            Some(task) => wrap_failure(task, unit_err),
                            None => TaskExecutionError::Internal {
                                message: format!("unknown task '{task_id}' failed"),
                            },
                        };
                        if self.fail_fast {
                            return Err(error);
                        }
                        failures.push(error);
                        halted = true;
                        ready.clear();
                    }
                    Err(join_err) => {
                        let error = TaskExecutionError::Internal {
                            message: format!("worker task join failure: {join_err}"),
                        };
                        if self.fail_fast {
                            return Err(error);
                        }
                        failures.push(error);
                        halted = true;
                        ready.clear();
                    }
                }
            }

            if running == 0 && (ready.is_empty() || halted) {
                break;
            }
            if !progressed && running > 0 {
                tokio::time::sleep(ctx.poll_interval).await;
            }
        }

        if !failures.is_empty() {
            return Err(if failures.len() == 1 {
                failures.remove(0)
            } else {
                TaskExecutionError::Aggregate { failures }
            });
        }
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "worker-pool"
    }
}
