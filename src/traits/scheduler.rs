// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::config::registry::UnitRegistry;
use crate::errors::TaskExecutionError;
use crate::graph::plan::{TaskId, TaskPlan};
use crate::values::{ParamMap, Value};

/// Run-wide state handed to every scheduler and node invocation.
#[derive(Clone)]
pub struct RunContext {
    /// Resolves dotted-path unit references at execution time.
    pub registry: Arc<UnitRegistry>,
    /// Parameters merged into every unit invocation, restricted to each
    /// unit's accepted parameter names.
    pub common_params: ParamMap,
    /// Artifact store; present only when caching is enabled for the run.
    pub cache: Option<CacheStore>,
    /// Log the would-be invocation instead of running units.
    pub dry_run: bool,
    pub verbose: bool,
    /// Frequency at which the worker-pool coordinator polls completions.
    pub poll_interval: Duration,
    /// Backend-specific profile artifact destination.
    pub profiler_path: Option<PathBuf>,
}

impl RunContext {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self {
            registry,
            common_params: ParamMap::new(),
            cache: None,
            dry_run: false,
            verbose: false,
            poll_interval: Duration::from_millis(500),
            profiler_path: None,
        }
    }
}

/// A scheduling backend executing a compiled task plan.
///
/// Implementations guarantee that a task's predecessors complete before the
/// task starts; sibling ordering is unspecified. The backend owns its pool
/// for the duration of `run` and releases it on every exit path. The first
/// observed failure is propagated as a [`TaskExecutionError`]; completed
/// task values that still have no consumer when the run ends are returned.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn run(
        &self,
        plan: TaskPlan,
        ctx: Arc<RunContext>,
    ) -> Result<HashMap<TaskId, Value>, TaskExecutionError>;

    fn name(&self) -> &'static str;
}
