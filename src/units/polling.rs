// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use crate::traits::Unit;
use crate::values::{ParamMap, Value};

/// Waits until every input file pattern matches on disk.
///
/// Positional inputs are glob patterns. Each pattern must produce at
/// least one match; `file_count` additionally raises the total number of
/// files expected across all patterns. Returns no value, so downstream
/// units see the polled node as a pure ordering constraint.
pub struct DataPolling;

impl DataPolling {
    fn patterns(args: &[Value]) -> Vec<String> {
        args.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Unit for DataPolling {
    async fn call(&self, args: Vec<Value>, params: &ParamMap) -> anyhow::Result<Value> {
        let patterns = Self::patterns(&args);
        if patterns.is_empty() {
            return Ok(Value::None);
        }

        let timeout = params
            .get("timeout")
            .and_then(|v| v.as_f64())
            .unwrap_or(120.0);
        let polling = params
            .get("polling")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0);
        let expected_files = params
            .get("file_count")
            .and_then(|v| v.as_u64())
            .map(|count| (count as usize).max(patterns.len()))
            .unwrap_or(patterns.len());

        let mut elapsed = 0.0;
        let mut files_found = 0usize;
        let mut pending = patterns.iter();
        let mut current = pending.next();

        while let Some(pattern) = current {
            let matches: Vec<_> = glob::glob(pattern)?.filter_map(Result::ok).collect();
            if !matches.is_empty() {
                files_found += matches.len();
                tracing::debug!(pattern = %pattern, matches = matches.len(), "pattern satisfied");
                current = pending.next();
                continue;
            }
            if elapsed >= timeout {
                bail!("timeout after {elapsed}s waiting for '{pattern}'");
            }
            tokio::time::sleep(Duration::from_secs_f64(polling)).await;
            elapsed += polling;
        }

        if files_found < expected_files {
            bail!(
                "expected {expected_files} file(s), found {files_found} across {} pattern(s)",
                patterns.len()
            );
        }
        Ok(Value::None)
    }

    fn name(&self) -> &str {
        "data_polling"
    }

    fn accepted_params(&self) -> &'static [&'static str] {
        &["timeout", "polling", "file_count"]
    }
}
