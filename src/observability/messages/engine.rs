// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Messages for plan compilation and scheduler lifecycle events.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::observability::messages::StructuredLog;

/// A compiled plan is about to execute.
pub struct ExecutionStarted<'a> {
    pub scheduler: &'a str,
    pub task_count: usize,
    pub num_workers: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "starting plan execution on '{}': {} tasks, num_workers={}",
            self.scheduler, self.task_count, self.num_workers
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            scheduler = self.scheduler,
            task_count = self.task_count,
            num_workers = self.num_workers,
            "{}",
            self
        );
    }
}

/// The whole plan completed.
pub struct ExecutionCompleted<'a> {
    pub scheduler: &'a str,
    pub task_count: usize,
    pub duration: Duration,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "plan execution completed on '{}': {} tasks in {:?}",
            self.scheduler, self.task_count, self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            scheduler = self.scheduler,
            task_count = self.task_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}",
            self
        );
    }
}

/// Tasks elided by the cache filter before scheduling.
pub struct TasksPruned {
    pub pruned: usize,
    pub remaining: usize,
}

impl Display for TasksPruned {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "cache filter pruned {} fresh task(s), {} remaining",
            self.pruned, self.remaining
        )
    }
}

impl StructuredLog for TasksPruned {
    fn log(&self) {
        tracing::info!(pruned = self.pruned, remaining = self.remaining, "{}", self);
    }
}

/// A task failed inside a scheduler.
pub struct TaskFailed<'a> {
    pub task_id: &'a str,
    pub node: &'a str,
    pub error: &'a dyn std::fmt::Display,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "task '{}' ({}) failed: {}",
            self.task_id, self.node, self.error
        )
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        tracing::error!(task_id = self.task_id, node = self.node, "{}", self);
    }
}
