// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::bail;
use async_trait::async_trait;

use crate::traits::Unit;
use crate::values::{ParamMap, Value};

/// Runs a command line through `sh -c` and returns its stdout.
///
/// The command comes from the `command` parameter, or from the first
/// positional input when the parameter is absent. A non-zero exit status
/// is an error carrying the captured stderr.
pub struct Shell;

#[async_trait]
impl Unit for Shell {
    async fn call(&self, args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
        let command = match params.get("command").and_then(|v| v.as_str()) {
            Some(command) => command.to_string(),
            None => match args.first().and_then(Value::as_str) {
                Some(command) => command.to_string(),
                None => bail!("shell unit needs a 'command' parameter or a string input"),
            },
        };

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .await?;

        if !output.status.success() {
            bail!(
                "command '{}' exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(Value::from(
            String::from_utf8_lossy(&output.stdout).to_string(),
        ))
    }

    fn name(&self) -> &str {
        "shell"
    }

    fn accepted_params(&self) -> &'static [&'static str] {
        &["command"]
    }
}
