// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;

use crate::values::{ParamMap, Value};

/// A processing unit: the user-supplied body of a pipeline node.
///
/// Units receive their predecessors' outputs as positional inputs (control
/// tokens and absent results already filtered by the node executor) plus a
/// keyword parameter map assembled from the call descriptor and the
/// run-wide common parameters. Units must not re-enter the engine; they run
/// to completion on their worker and communicate only through their return
/// value.
#[async_trait]
pub trait Unit: Send + Sync {
    async fn call(&self, args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value>;

    fn name(&self) -> &str;

    /// Parameter names this unit accepts. Common parameters are restricted
    /// to this set before injection; unknown keys are dropped.
    fn accepted_params(&self) -> &'static [&'static str] {
        &[]
    }

    /// Marker capability: a node-aware unit receives its node's properties
    /// under the `node_properties` key of its parameter map.
    fn node_aware(&self) -> bool {
        false
    }
}

/// Builder for a constructible unit, used by the three-shape call
/// descriptor: the instance is built from init parameters, then invoked.
pub trait UnitBuilder: Send + Sync {
    fn build(&self, init: &ParamMap) -> anyhow::Result<Arc<dyn Unit>>;

    fn name(&self) -> &str;

    /// Constructor parameter names, for common-parameter restriction.
    fn accepted_init_params(&self) -> &'static [&'static str] {
        &[]
    }
}
