// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::str::FromStr;

use crate::engine::dataflow::{DataflowScheduler, DataflowVariant};
use crate::engine::worker_pool::WorkerPoolScheduler;
use crate::errors::SchedulerConfigError;
use crate::traits::Scheduler;

/// The recognised scheduling backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    WorkerPool,
    Threads,
    Processes,
    SingleThreaded,
    DataflowDistributed,
    Ray,
}

pub const KNOWN_SCHEDULERS: &str =
    "threads, processes, single-threaded, worker-pool, dataflow-distributed, ray";

impl SchedulerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::WorkerPool => "worker-pool",
            SchedulerKind::Threads => "threads",
            SchedulerKind::Processes => "processes",
            SchedulerKind::SingleThreaded => "single-threaded",
            SchedulerKind::DataflowDistributed => "dataflow-distributed",
            SchedulerKind::Ray => "ray",
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = SchedulerConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "worker-pool" => Ok(SchedulerKind::WorkerPool),
            "threads" => Ok(SchedulerKind::Threads),
            "processes" => Ok(SchedulerKind::Processes),
            "single-threaded" => Ok(SchedulerKind::SingleThreaded),
            "dataflow-distributed" => Ok(SchedulerKind::DataflowDistributed),
            "ray" => Ok(SchedulerKind::Ray),
            other => Err(SchedulerConfigError::UnknownBackend {
                name: other.to_string(),
                known: KNOWN_SCHEDULERS,
            }),
        }
    }
}

/// Build the scheduler for a backend name.
///
/// The distributed and ray backends run as single-machine stand-ins on
/// the local runtime, keeping their submission contracts.
pub fn build_scheduler(
    kind: SchedulerKind,
    num_workers: usize,
) -> Result<Box<dyn Scheduler>, SchedulerConfigError> {
    if num_workers == 0 {
        return Err(SchedulerConfigError::InvalidWorkerCount { got: num_workers });
    }
    Ok(match kind {
        SchedulerKind::WorkerPool => Box::new(WorkerPoolScheduler::new(num_workers)),
        SchedulerKind::Threads => {
            Box::new(DataflowScheduler::new(DataflowVariant::Threads, num_workers))
        }
        SchedulerKind::Processes => Box::new(DataflowScheduler::new(
            DataflowVariant::Processes,
            num_workers,
        )),
        SchedulerKind::SingleThreaded => Box::new(DataflowScheduler::new(
            DataflowVariant::SingleThreaded,
            num_workers,
        )),
        SchedulerKind::DataflowDistributed => {
            tracing::info!("running 'dataflow-distributed' on the local runtime");
            Box::new(DataflowScheduler::new(DataflowVariant::Threads, num_workers))
        }
        SchedulerKind::Ray => {
            tracing::info!("running 'ray' as a local process-contract dataflow");
            Box::new(DataflowScheduler::new(
                DataflowVariant::Processes,
                num_workers,
            ))
        }
    })
}
