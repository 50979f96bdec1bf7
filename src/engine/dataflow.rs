// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Single-machine dataflow scheduler with dummy-sink injection.
//!
//! Before execution the plan receives one no-op sink per output branch
//! and, when several branches exist, a global terminal sink depending on
//! all of them. The run then forces that single terminal, which
//! transitively executes every task while keeping each branch's data with
//! its producing worker rather than gathering all outputs in one place.
//!
//! Variants:
//! * [`DataflowVariant::Threads`] — tasks spawned on the tokio runtime,
//!   bounded by a semaphore of `num_workers` permits;
//! * [`DataflowVariant::Processes`] — same submission contract with chunk
//!   size 1 (one permit acquired per task, never batched) and every task
//!   value round-tripped through the serde wire format, preserving the
//!   process-boundary behaviour of control tokens;
//! * [`DataflowVariant::SingleThreaded`] — one worker, sequential
//!   execution in deterministic topological order.
//!
//! Failure cancels the dataflow: the cancellation token stops queued work
//! and in-flight tasks are aborted best-effort.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::engine::node_executor::execute_node;
use crate::errors::TaskExecutionError;
use crate::graph::plan::{Task, TaskId, TaskPlan};
use crate::observability::messages::engine::ExecutionStarted;
use crate::observability::messages::StructuredLog;
use crate::traits::{RunContext, Scheduler, Unit};
use crate::utils::Stopwatch;
use crate::values::{ParamMap, Value};

/// The terminating no-op consumed by injected sinks.
struct NoOpSink;

#[async_trait]
impl Unit for NoOpSink {
    async fn call(&self, _args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
        Ok(Value::None)
    }

    fn name(&self) -> &str {
        "no_op"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataflowVariant {
    Threads,
    Processes,
    SingleThreaded,
}

impl DataflowVariant {
    fn as_str(&self) -> &'static str {
        match self {
            DataflowVariant::Threads => "threads",
            DataflowVariant::Processes => "processes",
            DataflowVariant::SingleThreaded => "single-threaded",
        }
    }
}

pub struct DataflowScheduler {
    variant: DataflowVariant,
    num_workers: usize,
}

impl DataflowScheduler {
    pub fn new(variant: DataflowVariant, num_workers: usize) -> Self {
        let num_workers = match variant {
            DataflowVariant::SingleThreaded => 1,
            _ => num_workers.max(1),
        };
        Self {
            variant,
            num_workers,
        }
    }
}

/// Push a value through the serde wire format, as it would travel between
/// worker processes.
fn wire_round_trip(value: Value) -> Result<Value, TaskExecutionError> {
    let bytes = serde_json::to_vec(&value).map_err(|err| TaskExecutionError::Internal {
        message: format!("failed to serialize task value: {err}"),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| TaskExecutionError::Internal {
        message: format!("failed to deserialize task value: {err}"),
    })
}

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

fn wrap_failure(task: &Task, source: crate::errors::UnitError) -> TaskExecutionError {
    TaskExecutionError::Task {
        task_id: task.id.to_string(),
        node: task.node_label(),
        descriptor: task.call.summary(),
        source,
    }
}

fn persist(ctx: &RunContext, task: &Task, value: &Value) {
    if task.is_synthetic() {
        return;
    }
    if let Some(cache) = &ctx.cache {
        if let Err(err) = cache.store(&task.id, value) {
            tracing::warn!(task_id = %task.id, error = %err, "failed to persist cache artifact");
        }
    }
}

fn write_profile(ctx: &RunContext, timings: &HashMap<TaskId, Duration>) {
    let Some(path) = &ctx.profiler_path else {
        return;
    };
    let profile: serde_json::Map<String, serde_json::Value> = timings
        .iter()
        .map(|(id, elapsed)| {
            (
                id.to_string(),
                serde_json::json!(elapsed.as_secs_f64()),
            )
        })
        .collect();
    match serde_json::to_vec_pretty(&serde_json::Value::Object(profile)) {
        Ok(bytes) => {
            if let Err(err) = std::fs::write(path, bytes) {
                tracing::warn!(path = %path.display(), error = %err, "failed to write profile");
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to encode profile"),
    }
}

impl DataflowScheduler {
    async fn run_sequential(
        &self,
        plan: &TaskPlan,
        order: Vec<TaskId>,
        ctx: &RunContext,
    ) -> Result<HashMap<TaskId, Value>, TaskExecutionError> {
        let mut results = HashMap::new();
        let mut timings = HashMap::new();
        for task_id in order {
            let Some(task) = plan.get(&task_id) else {
                continue;
            };
            let inputs = materialise_inputs(task, &results, plan, ctx);
            let watch = Stopwatch::start();
            let value = execute_node(task, inputs, ctx)
                .await
                .map_err(|err| wrap_failure(task, err))?;
            timings.insert(task_id.clone(), watch.elapsed());
            persist(ctx, task, &value);
            results.insert(task_id, value);
        }
        write_profile(ctx, &timings);
        Ok(results)
    }

    async fn run_bounded(
        &self,
        plan: &TaskPlan,
        ctx: &Arc<RunContext>,
    ) -> Result<HashMap<TaskId, Value>, TaskExecutionError> {
        let successors = plan.successors();
        let mut dep_counts = plan.dependency_counts();
        let mut ready: VecDeque<TaskId> = plan.entry_tasks().into();
        let mut results: HashMap<TaskId, Value> = HashMap::new();
        let mut timings: HashMap<TaskId, Duration> = HashMap::new();

        let semaphore = Arc::new(Semaphore::new(self.num_workers));
        let cancel = CancellationToken::new();
        let round_trip = self.variant == DataflowVariant::Processes;
        let mut in_flight: JoinSet<(TaskId, Result<Value, TaskExecutionError>, Duration)> =
            JoinSet::new();

        loop {
            while let Some(task_id) = ready.pop_front() {
                let Some(task) = plan.get(&task_id) else {
                    continue;
                };
                let inputs = materialise_inputs(task, &results, plan, ctx);
                let task = task.clone();
                let ctx = ctx.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();
                in_flight.spawn(async move {
                    // One permit per task: submissions are never batched,
                    // so short tasks cannot starve behind a long chunk.
                    let permit = semaphore.acquire_owned().await;
                    if permit.is_err() || cancel.is_cancelled() {
                        return (
                            task.id.clone(),
                            Err(TaskExecutionError::Internal {
                                message: "dataflow cancelled".to_string(),
                            }),
                            Duration::ZERO,
                        );
                    }
                    let watch = Stopwatch::start();
                    let result = match execute_node(&task, inputs, &ctx).await {
                        Ok(value) if round_trip => wire_round_trip(value),
                        Ok(value) => Ok(value),
                        Err(err) => Err(wrap_failure(&task, err)),
                    };
                    (task.id.clone(), result, watch.elapsed())
                });
            }

            match in_flight.join_next().await {
                None => break,
                Some(Ok((task_id, Ok(value), elapsed))) => {
                    timings.insert(task_id.clone(), elapsed);
                    if let Some(task) = plan.get(&task_id) {
                        persist(ctx, task, &value);
                    }
                    results.insert(task_id.clone(), value);
                    if let Some(dependents) = successors.get(&task_id) {
                        for dependent in dependents {
                            if let Some(count) = dep_counts.get_mut(dependent) {
                                *count -= 1;
                                if *count == 0 {
                                    ready.push_back(dependent.clone());
                                }
                            }
                        }
                    }
                }
                Some(Ok((_task_id, Err(error), _elapsed))) => {
                    cancel.cancel();
                    in_flight.abort_all();
                    while in_flight.join_next().await.is_some() {}
                    return Err(error);
                }
                Some(Err(join_err)) => {
                    cancel.cancel();
                    in_flight.abort_all();
                    while in_flight.join_next().await.is_some() {}
                    return Err(TaskExecutionError::Internal {
                        message: format!("worker task join failure: {join_err}"),
                    });
                }
            }
        }

        write_profile(ctx, &timings);
        Ok(results)
    }
}

#[async_trait]
impl Scheduler for DataflowScheduler {
    async fn run(
        &self,
        plan: TaskPlan,
        ctx: Arc<RunContext>,
    ) -> Result<HashMap<TaskId, Value>, TaskExecutionError> {
        let mut plan = plan;
        let terminal = plan.inject_dummy_sinks(Arc::new(NoOpSink));
        if terminal.is_none() {
            return Ok(HashMap::new());
        }

        ExecutionStarted {
            scheduler: self.name(),
            task_count: plan.len(),
            num_workers: self.num_workers,
        }
        .log();

        let mut results = match self.variant {
            DataflowVariant::SingleThreaded => {
                let order = plan.topological_order().map_err(|err| {
                    TaskExecutionError::Internal {
                        message: format!("plan became unorderable after sink injection: {err}"),
                    }
                })?;
                self.run_sequential(&plan, order, &ctx).await?
            }
            _ => self.run_bounded(&plan, &ctx).await?,
        };

        // Synthetic sinks carry no data; drop them from the outcome.
        results.retain(|id, _| plan.get(id).is_some_and(|task| !task.is_synthetic()));
        Ok(results)
    }

    fn name(&self) -> &'static str {
        self.variant.as_str()
    }
}
