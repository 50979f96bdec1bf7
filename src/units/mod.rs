// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in processing units.
//!
//! These cover the staple node bodies of file-driven pipelines: waiting
//! for files, shelling out, JSON persistence and node-aware path
//! expansion. They double as reference implementations of the [`Unit`]
//! contract.
//!
//! [`Unit`]: crate::traits::Unit

pub mod io;
pub mod passthrough;
pub mod polling;
pub mod shell;

pub use io::{Input, LoadJson, SaveJson};
pub use passthrough::Passthrough;
pub use polling::DataPolling;
pub use shell::Shell;

use anyhow::bail;

use crate::values::ParamMap;

/// Node properties as handed to node-aware units under `node_properties`.
pub(crate) fn node_properties(
    params: &ParamMap,
) -> serde_json::Map<String, serde_json::Value> {
    match params.get("node_properties") {
        Some(serde_json::Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    }
}

/// Expand `{property}` placeholders from node properties, then `${VAR}`
/// references from the process environment.
pub fn expand_template(
    template: &str,
    properties: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '{' {
            expanded.push(ch);
            continue;
        }
        let mut key = String::new();
        let mut closed = false;
        for inner in chars.by_ref() {
            if inner == '}' {
                closed = true;
                break;
            }
            key.push(inner);
        }
        if !closed {
            bail!("unterminated '{{' in template '{template}'");
        }
        match properties.get(&key) {
            Some(serde_json::Value::String(s)) => expanded.push_str(s),
            Some(other) => expanded.push_str(&other.to_string()),
            None => bail!("unknown node property '{key}' in template '{template}'"),
        }
    }
    expand_env(&expanded)
}

fn expand_env(text: &str) -> anyhow::Result<String> {
    let mut expanded = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            expanded.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if braced && next == '}' {
                chars.next();
                break;
            }
            if !braced && !(next.is_ascii_alphanumeric() || next == '_') {
                break;
            }
            name.push(next);
            chars.next();
        }
        if name.is_empty() {
            expanded.push('$');
            if braced {
                expanded.push_str("{}");
            }
            continue;
        }
        match std::env::var(&name) {
            Ok(value) => expanded.push_str(&value),
            Err(_) => bail!("environment variable '{name}' is not set"),
        }
    }
    Ok(expanded)
}
