// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::traits::Unit;
use crate::values::{ParamMap, Value};

/// Forwards its input unchanged. With several inputs, the inner data
/// values are collected into a JSON array.
pub struct Passthrough;

#[async_trait]
impl Unit for Passthrough {
    async fn call(&self, args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
        let mut args = args;
        match args.len() {
            0 => Ok(Value::None),
            1 => Ok(args.remove(0)),
            _ => Ok(Value::Data(serde_json::Value::Array(
                args.into_iter()
                    .map(|value| value.data().cloned().unwrap_or(serde_json::Value::Null))
                    .collect(),
            ))),
        }
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
