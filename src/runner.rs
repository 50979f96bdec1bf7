// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The run coordinator: from a graph source to executed results.
//!
//! `Runner::run` resolves the graph, compiles and validates the plan,
//! applies the cache filter when enabled, builds the selected scheduler
//! and executes. The scheduler is a scoped acquisition: it is constructed
//! on entry and its pool is released on every exit path; the first error
//! raised anywhere is propagated unmodified.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{prune_fresh_tasks, CacheStore};
use crate::config::loader::{load_global_config, ConfigError, RuntimeConfig};
use crate::config::registry::{GraphRegistry, UnitRegistry};
use crate::engine::factory::{build_scheduler, SchedulerKind};
use crate::errors::{GraphValidationError, SchedulerConfigError, TaskExecutionError};
use crate::graph::compile::{compile_plan, resolve_graph};
use crate::graph::plan::TaskId;
use crate::graph::GraphSource;
use crate::observability::messages::engine::{ExecutionCompleted, TasksPruned};
use crate::observability::messages::StructuredLog;
use crate::traits::RunContext;
use crate::utils::Stopwatch;
use crate::values::{ParamMap, Value};

/// Everything one pipeline run needs.
pub struct RunOptions {
    pub graph: GraphSource,
    /// Passed to the graph factory when the source is callable.
    pub graph_params: ParamMap,
    pub scheduler: SchedulerKind,
    pub num_workers: usize,
    pub dry_run: bool,
    pub verbose: bool,
    pub profiler_path: Option<PathBuf>,
    /// Merged into every unit invocation, restricted per unit signature.
    pub common_params: ParamMap,
    /// Optional global configuration file (common params, cache settings).
    pub config_path: Option<PathBuf>,
    /// Cache settings given directly, overriding the configuration file.
    pub cache: Option<CacheSettings>,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(graph: GraphSource) -> Self {
        Self {
            graph,
            graph_params: ParamMap::new(),
            scheduler: SchedulerKind::Processes,
            num_workers: 1,
            dry_run: false,
            verbose: false,
            profiler_path: None,
            common_params: ParamMap::new(),
            config_path: None,
            cache: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Graph(#[from] GraphValidationError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerConfigError),
    #[error(transparent)]
    Execution(#[from] TaskExecutionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Executes pipeline runs against a pair of registries.
pub struct Runner {
    units: Arc<UnitRegistry>,
    graphs: Arc<GraphRegistry>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// A runner with the built-in unit library and no registered graphs.
    pub fn new() -> Self {
        Self {
            units: Arc::new(UnitRegistry::with_builtins()),
            graphs: Arc::new(GraphRegistry::new()),
        }
    }

    pub fn with_registries(units: Arc<UnitRegistry>, graphs: Arc<GraphRegistry>) -> Self {
        Self { units, graphs }
    }

    pub async fn run(
        &self,
        options: RunOptions,
    ) -> Result<HashMap<TaskId, Value>, RunError> {
        // Process-wide configuration first, explicit options on top.
        let mut common_params = ParamMap::new();
        let mut runtime = RuntimeConfig::default();
        if let Some(path) = &options.config_path {
            let global = load_global_config(path)?;
            common_params.extend(global.common_params);
            runtime = global.runtime;
        }
        if let Some(cache) = &options.cache {
            runtime.cache_enabled = cache.enabled;
            if cache.dir.is_some() {
                runtime.cache_dir = cache.dir.clone();
            }
        }
        common_params.extend(options.common_params);
        common_params.insert("verbose".to_string(), serde_json::json!(options.verbose));
        common_params.insert("dry_run".to_string(), serde_json::json!(options.dry_run));

        let graph = resolve_graph(options.graph, &options.graph_params, &self.graphs)?;
        let mut plan = compile_plan(&graph)?;

        let cache = if runtime.cache_enabled {
            let dir = runtime
                .cache_dir
                .unwrap_or_else(|| std::env::temp_dir().join("skein-cache"));
            Some(CacheStore::new(dir))
        } else {
            None
        };
        if let Some(store) = &cache {
            let pruned = prune_fresh_tasks(&mut plan, store);
            TasksPruned {
                pruned: pruned.len(),
                remaining: plan.len(),
            }
            .log();
        }

        let scheduler = build_scheduler(options.scheduler, options.num_workers)?;
        let ctx = Arc::new(RunContext {
            registry: self.units.clone(),
            common_params,
            cache,
            dry_run: options.dry_run,
            verbose: options.verbose,
            poll_interval: options.poll_interval,
            profiler_path: options.profiler_path,
        });

        let task_count = plan.len();
        let watch = Stopwatch::start();
        let results = scheduler.run(plan, ctx).await?;
        ExecutionCompleted {
            scheduler: scheduler.name(),
            task_count,
            duration: watch.elapsed(),
        }
        .log();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CallDescriptor, UnitRef};
    use crate::graph::{NodeAttrs, NodeId, PipelineGraph};
    use crate::traits::Unit;
    use crate::values::Value;
    use async_trait::async_trait;

    struct Tag(&'static str);

    #[async_trait]
    impl Unit for Tag {
        async fn call(&self, args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
            let mut parts: Vec<String> = args
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            parts.push(self.0.to_string());
            Ok(Value::from(parts.join("_")))
        }

        fn name(&self) -> &str {
            "tag"
        }
    }

    fn small_graph() -> PipelineGraph {
        let mut graph = PipelineGraph::new();
        graph.add_node(
            NodeId::named("a"),
            NodeAttrs::new(CallDescriptor::bare(UnitRef::invocable(Tag("a")))),
        );
        graph.add_node(
            NodeId::named("b"),
            NodeAttrs::new(CallDescriptor::bare(UnitRef::invocable(Tag("b")))),
        );
        graph.add_edge(NodeId::named("a"), NodeId::named("b"));
        graph
    }

    #[tokio::test]
    async fn test_run_executes_graph_source() {
        let runner = Runner::new();
        let results = runner
            .run(RunOptions::new(GraphSource::Graph(small_graph())))
            .await
            .unwrap();
        let b = TaskId::fingerprint(&NodeId::named("b"));
        assert_eq!(results.get(&b).and_then(Value::as_str), Some("a_b"));
    }

    #[tokio::test]
    async fn test_run_unknown_scheduler_path_is_graph_error() {
        let runner = Runner::new();
        let err = runner
            .run(RunOptions::new(GraphSource::Path("nope".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Graph(_)));
    }

    #[tokio::test]
    async fn test_run_rejects_zero_workers() {
        let runner = Runner::new();
        let mut options = RunOptions::new(GraphSource::Graph(small_graph()));
        options.num_workers = 0;
        let err = runner.run(options).await.unwrap_err();
        assert!(matches!(err, RunError::Scheduler(_)));
    }

    #[tokio::test]
    async fn test_dry_run_invokes_nothing() {
        let runner = Runner::new();
        let mut options = RunOptions::new(GraphSource::Graph(small_graph()));
        options.dry_run = true;
        options.scheduler = SchedulerKind::SingleThreaded;
        let results = runner.run(options).await.unwrap();
        // Every task resolves to an absent value under dry-run.
        assert!(results.values().all(Value::is_none));
    }

    #[tokio::test]
    async fn test_registered_graph_factory_by_path() {
        let mut graphs = GraphRegistry::new();
        graphs.register(
            "demo.graphs.small",
            Arc::new(|_params: &ParamMap| -> anyhow::Result<PipelineGraph> {
                Ok(small_graph())
            }),
        );
        let runner = Runner::with_registries(
            Arc::new(UnitRegistry::with_builtins()),
            Arc::new(graphs),
        );
        let results = runner
            .run(RunOptions::new(GraphSource::Path("demo.graphs.small".into())))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }
}
