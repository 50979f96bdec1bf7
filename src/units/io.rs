// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! JSON persistence units and node-aware path expansion.
//!
//! All three units are node-aware: their `filepath` parameter is a
//! template expanded from the node's properties and the environment, so a
//! single graph definition can address per-node output files
//! (`/out/result_{leadtime}.json`).

use anyhow::{bail, Context};
use async_trait::async_trait;

use super::{expand_template, node_properties};
use crate::traits::Unit;
use crate::values::{ParamMap, Value};

fn expanded_filepath(params: &ParamMap, unit: &str) -> anyhow::Result<String> {
    let template = params
        .get("filepath")
        .and_then(|v| v.as_str())
        .with_context(|| format!("{unit} needs a 'filepath' parameter"))?;
    expand_template(template, &node_properties(params))
}

/// Expands its `filepath` template and returns the resulting path. Pure
/// string work; pairs with a polling or loading unit downstream.
pub struct Input;

#[async_trait]
impl Unit for Input {
    async fn call(&self, args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
        if !args.is_empty() {
            bail!("input unit does not accept positional inputs");
        }
        Ok(Value::from(expanded_filepath(params, "input unit")?))
    }

    fn name(&self) -> &str {
        "input"
    }

    fn accepted_params(&self) -> &'static [&'static str] {
        &["filepath"]
    }

    fn node_aware(&self) -> bool {
        true
    }
}

/// Writes its positional inputs to the expanded `filepath` as a JSON
/// array and returns nothing.
pub struct SaveJson;

#[async_trait]
impl Unit for SaveJson {
    async fn call(&self, args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
        let path = expanded_filepath(params, "save_json")?;
        let body: Vec<serde_json::Value> = args
            .iter()
            .map(|value| value.data().cloned().unwrap_or(serde_json::Value::Null))
            .collect();

        if let Some(parent) = std::path::Path::new(&path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating parent directories of '{path}'"))?;
        }
        let bytes = serde_json::to_vec(&body)?;
        std::fs::write(&path, bytes).with_context(|| format!("writing '{path}'"))?;
        Ok(Value::None)
    }

    fn name(&self) -> &str {
        "save_json"
    }

    fn accepted_params(&self) -> &'static [&'static str] {
        &["filepath"]
    }

    fn node_aware(&self) -> bool {
        true
    }
}

/// Reads the expanded `filepath` and returns its parsed JSON body.
pub struct LoadJson;

#[async_trait]
impl Unit for LoadJson {
    async fn call(&self, _args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
        let path = expanded_filepath(params, "load_json")?;
        let bytes =
            std::fs::read(&path).with_context(|| format!("reading '{path}'"))?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing '{path}' as JSON"))?;
        Ok(Value::Data(body))
    }

    fn name(&self) -> &str {
        "load_json"
    }

    fn accepted_params(&self) -> &'static [&'static str] {
        &["filepath"]
    }

    fn node_aware(&self) -> bool {
        true
    }
}
