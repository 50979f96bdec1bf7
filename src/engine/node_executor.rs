// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The node-execution contract: how one task invokes its unit.
//!
//! Given the predecessors' values, the call descriptor, the run-wide
//! common parameters and the node's properties, this module:
//!
//! 1. filters absent inputs, applies `IGNORE` filtering, then the `SKIP`
//!    short-circuit;
//! 2. resolves the unit reference and validates the descriptor shape
//!    against the unit kind;
//! 3. builds constructible units (common params restricted to the
//!    constructor signature override descriptor init params);
//! 4. merges call parameters (node properties, then common params, fill
//!    only keys the descriptor did not pin and only where the unit's
//!    signature accepts them) and injects `node_properties` for
//!    node-aware units;
//! 5. honours dry-run, otherwise invokes the unit under a wall-clock
//!    timer and a best-effort memory sampler, emitting one structured log
//!    record per invocation.
//!
//! Failures are wrapped exactly once with their full context. Units are
//! awaited inline on the calling worker and receive no engine handle, so
//! an invocation cannot re-enter the scheduler.

use std::sync::Arc;

use crate::config::registry::RegistryEntry;
use crate::descriptor::{CallDescriptor, UnitRef};
use crate::errors::{InitArityError, UnitCallError, UnitError, UnitInitError};
use crate::graph::plan::Task;
use crate::observability::messages::unit::{UnitDryRun, UnitInvoked, UnitShortCircuited};
use crate::observability::messages::StructuredLog;
use crate::traits::{RunContext, Unit};
use crate::utils::{peak_rss_bytes, Stopwatch};
use crate::values::{ParamMap, Value};

/// Execute one task with its materialised positional inputs.
pub async fn execute_node(
    task: &Task,
    inputs: Vec<Value>,
    ctx: &RunContext,
) -> Result<Value, UnitError> {
    // Absent results are dropped silently; units that return nothing
    // contribute ordering, not data.
    let inputs: Vec<Value> = inputs.into_iter().filter(|v| !v.is_none()).collect();
    let present = inputs.len();

    // IGNORE filtering happens before the SKIP check.
    let inputs: Vec<Value> = inputs.into_iter().filter(|v| !v.is_ignore()).collect();
    if present >= 2 && inputs.is_empty() {
        UnitShortCircuited {
            unit: &task.call.unit_ref().describe(),
            node: &task.node_label(),
            token: "all inputs IGNORE_EVENT",
        }
        .log();
        return Ok(Value::Ignore);
    }

    if inputs.iter().any(Value::is_skip) {
        UnitShortCircuited {
            unit: &task.call.unit_ref().describe(),
            node: &task.node_label(),
            token: "SKIP_EVENT input",
        }
        .log();
        return Ok(Value::Skip);
    }

    let unit = resolve_and_build(task, ctx)?;
    let call_params = assemble_call_params(&task.call, unit.as_ref(), task, ctx);

    if ctx.dry_run {
        UnitDryRun {
            unit: unit.name(),
            node: &task.node_label(),
        }
        .log();
        return Ok(Value::None);
    }

    let arg_summaries: Vec<String> = inputs.iter().map(Value::summary).collect();
    let watch = Stopwatch::start();
    let result = unit
        .call(inputs, &call_params)
        .await
        .map_err(|err| UnitCallError {
            unit: unit.name().to_string(),
            args: arg_summaries,
            call_params: call_params.clone(),
            node_properties: task.properties.clone(),
            source: err.into(),
        })?;

    UnitInvoked {
        unit: unit.name(),
        node: &task.node_label(),
        descriptor_arity: task.call.arity(),
        elapsed: watch.elapsed(),
        peak_rss: peak_rss_bytes(),
    }
    .log();
    Ok(result)
}

/// Resolve the unit reference and, for constructible units, build the
/// instance from descriptor init params overlaid with restricted common
/// params.
fn resolve_and_build(task: &Task, ctx: &RunContext) -> Result<Arc<dyn Unit>, UnitError> {
    let entry = match task.call.unit_ref() {
        UnitRef::Invocable(unit) => RegistryEntry::Invocable(unit.clone()),
        UnitRef::Constructible(builder) => RegistryEntry::Constructible(builder.clone()),
        UnitRef::Path(path) => {
            ctx.registry
                .resolve(path)
                .ok_or_else(|| UnitInitError {
                    unit: path.clone(),
                    init_params: ParamMap::new(),
                    node_properties: task.properties.clone(),
                    source: anyhow::anyhow!("unit path is not registered").into(),
                })?
        }
    };

    match entry {
        RegistryEntry::Invocable(unit) => {
            if task.call.arity() == 3 {
                return Err(InitArityError {
                    arity: 3,
                    unit: unit.name().to_string(),
                    reason: "unit is not constructible",
                }
                .into());
            }
            Ok(unit)
        }
        RegistryEntry::Constructible(builder) => {
            let mut init = task.call.init_params().cloned().unwrap_or_default();
            for key in builder.accepted_init_params() {
                if let Some(value) = ctx.common_params.get(*key) {
                    init.insert((*key).to_string(), value.clone());
                }
            }
            builder.build(&init).map_err(|err| {
                UnitError::Init(UnitInitError {
                    unit: builder.name().to_string(),
                    init_params: init,
                    node_properties: task.properties.clone(),
                    source: err.into(),
                })
            })
        }
    }
}

/// Descriptor call params, filled for keys the descriptor did not pin:
/// node properties first (node-specific), then common params (run-wide),
/// both restricted to the unit's accepted parameter names. Properties
/// with no matching parameter are dropped here; node-aware units receive
/// the full set under `node_properties` instead.
fn assemble_call_params(
    descriptor: &CallDescriptor,
    unit: &dyn Unit,
    task: &Task,
    ctx: &RunContext,
) -> ParamMap {
    let mut params = descriptor.call_params().cloned().unwrap_or_default();
    for key in unit.accepted_params() {
        if !params.contains_key(*key) {
            if let Some(value) = task.properties.get(*key) {
                params.insert((*key).to_string(), value.clone());
            } else if let Some(value) = ctx.common_params.get(*key) {
                params.insert((*key).to_string(), value.clone());
            }
        }
    }
    if unit.node_aware() {
        params.insert(
            "node_properties".to_string(),
            serde_json::Value::Object(task.properties.clone().into_iter().collect()),
        );
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::registry::UnitRegistry;
    use crate::graph::plan::TaskId;
    use crate::graph::NodeId;
    use crate::traits::UnitBuilder;
    use async_trait::async_trait;

    /// Reports the parameters it observed.
    struct Echo;

    #[async_trait]
    impl Unit for Echo {
        async fn call(&self, args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
            let args: Vec<serde_json::Value> = args
                .iter()
                .map(|v| v.data().cloned().unwrap_or(serde_json::Value::Null))
                .collect();
            let params: serde_json::Map<String, serde_json::Value> =
                params.clone().into_iter().collect();
            Ok(Value::Data(serde_json::json!({
                "args": args,
                "params": params,
            })))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn accepted_params(&self) -> &'static [&'static str] {
            &["verbose", "mode"]
        }
    }

    struct NodeAwareEcho;

    #[async_trait]
    impl Unit for NodeAwareEcho {
        async fn call(&self, _args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
            Ok(Value::Data(
                params
                    .get("node_properties")
                    .cloned()
                    .unwrap_or(serde_json::Value::Null),
            ))
        }

        fn name(&self) -> &str {
            "node_aware_echo"
        }

        fn node_aware(&self) -> bool {
            true
        }
    }

    /// Constructible unit recording its init params.
    struct Suffixer {
        suffix: String,
    }

    #[async_trait]
    impl Unit for Suffixer {
        async fn call(&self, args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
            let base = args.first().and_then(Value::as_str).unwrap_or("");
            Ok(Value::from(format!("{}{}", base, self.suffix)))
        }

        fn name(&self) -> &str {
            "suffixer"
        }
    }

    struct SuffixerBuilder;

    impl UnitBuilder for SuffixerBuilder {
        fn build(&self, init: &ParamMap) -> anyhow::Result<Arc<dyn Unit>> {
            let suffix = init
                .get("suffix")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow::anyhow!("suffix is required"))?
                .to_string();
            Ok(Arc::new(Suffixer { suffix }))
        }

        fn name(&self) -> &str {
            "suffixer"
        }

        fn accepted_init_params(&self) -> &'static [&'static str] {
            &["suffix"]
        }
    }

    fn task_for(call: CallDescriptor) -> Task {
        let node = NodeId::named("n");
        Task {
            id: TaskId::fingerprint(&node),
            predecessors: vec![],
            call,
            properties: ParamMap::new(),
            node: Some(node),
        }
    }

    fn ctx() -> RunContext {
        RunContext::new(Arc::new(UnitRegistry::with_builtins()))
    }

    fn echoed_param(result: &Value, key: &str) -> Option<serde_json::Value> {
        result
            .data()
            .and_then(|d| d.get("params"))
            .and_then(|p| p.get(key))
            .cloned()
    }

    #[tokio::test]
    async fn test_null_inputs_are_filtered() {
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let out = execute_node(
            &task,
            vec![Value::None, Value::from("a"), Value::None],
            &ctx(),
        )
        .await
        .unwrap();
        assert_eq!(
            out.data().and_then(|d| d.get("args")).cloned(),
            Some(serde_json::json!(["a"]))
        );
    }

    #[tokio::test]
    async fn test_skip_short_circuits_without_invoking() {
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let out = execute_node(&task, vec![Value::from("a"), Value::Skip], &ctx())
            .await
            .unwrap();
        assert_eq!(out, Value::Skip);
    }

    #[tokio::test]
    async fn test_single_ignore_invokes_with_no_args() {
        // One IGNORE input is filtered; with fewer than two inputs the
        // node still runs.
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let out = execute_node(&task, vec![Value::Ignore], &ctx()).await.unwrap();
        assert_eq!(
            out.data().and_then(|d| d.get("args")).cloned(),
            Some(serde_json::json!([]))
        );
    }

    #[tokio::test]
    async fn test_all_ignore_with_two_inputs_returns_ignore() {
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let out = execute_node(&task, vec![Value::Ignore, Value::Ignore], &ctx())
            .await
            .unwrap();
        assert_eq!(out, Value::Ignore);
    }

    #[tokio::test]
    async fn test_ignore_filtering_precedes_skip_check() {
        // SKIP beneath an all-IGNORE set never fires; but SKIP beside an
        // IGNORE does.
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let out = execute_node(&task, vec![Value::Ignore, Value::Skip], &ctx())
            .await
            .unwrap();
        assert_eq!(out, Value::Skip);
    }

    #[tokio::test]
    async fn test_common_param_fills_unpinned_key() {
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let mut ctx = ctx();
        ctx.common_params
            .insert("mode".into(), serde_json::json!("fast"));
        let out = execute_node(&task, vec![], &ctx).await.unwrap();
        assert_eq!(echoed_param(&out, "mode"), Some(serde_json::json!("fast")));
    }

    #[tokio::test]
    async fn test_pinned_call_param_beats_common_param() {
        let mut pinned = ParamMap::new();
        pinned.insert("mode".into(), serde_json::json!("exact"));
        let task = task_for(CallDescriptor::with_params(
            UnitRef::invocable(Echo),
            pinned,
        ));
        let mut ctx = ctx();
        ctx.common_params
            .insert("mode".into(), serde_json::json!("fast"));
        let out = execute_node(&task, vec![], &ctx).await.unwrap();
        assert_eq!(echoed_param(&out, "mode"), Some(serde_json::json!("exact")));
    }

    #[tokio::test]
    async fn test_matching_node_property_flows_into_params() {
        let mut task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        task.properties
            .insert("mode".into(), serde_json::json!("from-node"));
        task.properties
            .insert("unrelated".into(), serde_json::json!("dropped"));
        let out = execute_node(&task, vec![], &ctx()).await.unwrap();
        // Properties matching the signature flow in; the rest are dropped
        // for a non-node-aware unit.
        assert_eq!(
            echoed_param(&out, "mode"),
            Some(serde_json::json!("from-node"))
        );
        assert_eq!(echoed_param(&out, "unrelated"), None);
    }

    #[tokio::test]
    async fn test_node_property_beats_common_param() {
        let mut task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        task.properties
            .insert("mode".into(), serde_json::json!("node"));
        let mut ctx = ctx();
        ctx.common_params
            .insert("mode".into(), serde_json::json!("common"));
        let out = execute_node(&task, vec![], &ctx).await.unwrap();
        assert_eq!(echoed_param(&out, "mode"), Some(serde_json::json!("node")));
    }

    #[tokio::test]
    async fn test_unknown_common_params_are_dropped() {
        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Echo)));
        let mut ctx = ctx();
        ctx.common_params
            .insert("unrelated".into(), serde_json::json!(1));
        let out = execute_node(&task, vec![], &ctx).await.unwrap();
        assert_eq!(echoed_param(&out, "unrelated"), None);
    }

    #[tokio::test]
    async fn test_node_aware_unit_receives_properties() {
        let mut task = task_for(CallDescriptor::bare(UnitRef::invocable(NodeAwareEcho)));
        task.properties
            .insert("leadtime".into(), serde_json::json!(3600));
        let out = execute_node(&task, vec![], &ctx()).await.unwrap();
        assert_eq!(
            out.data().and_then(|d| d.get("leadtime")).cloned(),
            Some(serde_json::json!(3600))
        );
    }

    #[tokio::test]
    async fn test_init_shape_builds_instance() {
        let mut init = ParamMap::new();
        init.insert("suffix".into(), serde_json::json!("_built"));
        let task = task_for(CallDescriptor::with_init(
            UnitRef::constructible(SuffixerBuilder),
            Some(init),
            None,
        ));
        let out = execute_node(&task, vec![Value::from("x")], &ctx())
            .await
            .unwrap();
        assert_eq!(out.as_str(), Some("x_built"));
    }

    #[tokio::test]
    async fn test_common_init_param_overrides_descriptor() {
        let mut init = ParamMap::new();
        init.insert("suffix".into(), serde_json::json!("_descriptor"));
        let task = task_for(CallDescriptor::with_init(
            UnitRef::constructible(SuffixerBuilder),
            Some(init),
            None,
        ));
        let mut ctx = ctx();
        ctx.common_params
            .insert("suffix".into(), serde_json::json!("_common"));
        let out = execute_node(&task, vec![Value::from("x")], &ctx)
            .await
            .unwrap();
        assert_eq!(out.as_str(), Some("x_common"));
    }

    #[tokio::test]
    async fn test_init_shape_on_invocable_is_arity_error() {
        let task = task_for(CallDescriptor::with_init(
            UnitRef::invocable(Echo),
            None,
            None,
        ));
        let err = execute_node(&task, vec![], &ctx()).await.unwrap_err();
        assert!(matches!(err, UnitError::Arity(InitArityError { arity: 3, .. })));
    }

    #[tokio::test]
    async fn test_builder_failure_wraps_init_error() {
        // No suffix anywhere: the builder rejects its init params.
        let task = task_for(CallDescriptor::with_init(
            UnitRef::constructible(SuffixerBuilder),
            None,
            None,
        ));
        let err = execute_node(&task, vec![], &ctx()).await.unwrap_err();
        assert!(matches!(err, UnitError::Init(_)));
    }

    #[tokio::test]
    async fn test_unregistered_path_fails() {
        let task = task_for(CallDescriptor::bare(UnitRef::path("no.such.unit")));
        let err = execute_node(&task, vec![], &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("no.such.unit"));
    }

    #[tokio::test]
    async fn test_path_resolution_through_registry() {
        let task = task_for(CallDescriptor::bare(UnitRef::path("passthrough")));
        let out = execute_node(&task, vec![Value::from("via-path")], &ctx())
            .await
            .unwrap();
        assert_eq!(out.as_str(), Some("via-path"));
    }

    #[tokio::test]
    async fn test_dry_run_returns_none_without_invoking() {
        struct Panicking;

        #[async_trait]
        impl Unit for Panicking {
            async fn call(&self, _args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
                panic!("must not run under dry_run");
            }

            fn name(&self) -> &str {
                "panicking"
            }
        }

        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Panicking)));
        let mut ctx = ctx();
        ctx.dry_run = true;
        let out = execute_node(&task, vec![], &ctx).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_call_failure_wraps_context() {
        struct Failing;

        #[async_trait]
        impl Unit for Failing {
            async fn call(&self, _args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
                anyhow::bail!("deliberate failure")
            }

            fn name(&self) -> &str {
                "failing"
            }
        }

        let task = task_for(CallDescriptor::bare(UnitRef::invocable(Failing)));
        let err = execute_node(&task, vec![Value::from("ctx")], &ctx())
            .await
            .unwrap_err();
        match err {
            UnitError::Call(call_err) => {
                assert_eq!(call_err.unit, "failing");
                assert_eq!(call_err.args, vec!["\"ctx\"".to_string()]);
                assert!(call_err.source.to_string().contains("deliberate failure"));
            }
            other => panic!("expected UnitCallError, got {other:?}"),
        }
    }
}
