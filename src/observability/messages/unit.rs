// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Messages for individual unit invocations.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::observability::messages::StructuredLog;
use crate::utils::format_bytes;

/// One completed unit invocation: the per-node execution record.
pub struct UnitInvoked<'a> {
    pub unit: &'a str,
    pub node: &'a str,
    /// Call descriptor shape (1, 2 or 3).
    pub descriptor_arity: usize,
    pub elapsed: Duration,
    /// Best-effort peak RSS sample, when available.
    pub peak_rss: Option<u64>,
}

impl Display for UnitInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "unit '{}' on node ({}) completed in {:?}",
            self.unit, self.node, self.elapsed
        )?;
        if let Some(rss) = self.peak_rss {
            write!(f, ", peak rss {}", format_bytes(rss))?;
        }
        Ok(())
    }
}

impl StructuredLog for UnitInvoked<'_> {
    fn log(&self) {
        tracing::info!(
            unit = self.unit,
            node = self.node,
            descriptor_arity = self.descriptor_arity,
            elapsed_ms = self.elapsed.as_millis() as u64,
            peak_rss = self.peak_rss,
            "{}",
            self
        );
    }
}

/// A dry run elided the invocation.
pub struct UnitDryRun<'a> {
    pub unit: &'a str,
    pub node: &'a str,
}

impl Display for UnitDryRun<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "dry-run: skipping unit '{}' on node ({})", self.unit, self.node)
    }
}

impl StructuredLog for UnitDryRun<'_> {
    fn log(&self) {
        tracing::info!(unit = self.unit, node = self.node, "{}", self);
    }
}

/// A branch was short-circuited by a control token.
pub struct UnitShortCircuited<'a> {
    pub unit: &'a str,
    pub node: &'a str,
    pub token: &'a str,
}

impl Display for UnitShortCircuited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "unit '{}' on node ({}) not invoked: {}",
            self.unit, self.node, self.token
        )
    }
}

impl StructuredLog for UnitShortCircuited<'_> {
    fn log(&self) {
        tracing::debug!(unit = self.unit, node = self.node, token = self.token, "{}", self);
    }
}
