// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Static registries resolving dotted-path strings to units and graphs.
//!
//! Call descriptors and run configurations may name units and graphs by
//! string instead of holding instances. Both registries are built at
//! program start: the unit registry is seeded with the built-in unit
//! library, and applications register their own entries before handing
//! the registries to the runner.

use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::GraphFactory;
use crate::traits::{Unit, UnitBuilder};
use crate::units;

/// A registered unit: either a ready invocable or a constructible builder.
#[derive(Clone)]
pub enum RegistryEntry {
    Invocable(Arc<dyn Unit>),
    Constructible(Arc<dyn UnitBuilder>),
}

/// Lookup table from dotted-path strings to processing units.
#[derive(Default)]
pub struct UnitRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in unit library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_unit("passthrough", Arc::new(units::Passthrough));
        registry.register_unit("shell", Arc::new(units::Shell));
        registry.register_unit("data_polling", Arc::new(units::DataPolling));
        registry.register_unit("save_json", Arc::new(units::SaveJson));
        registry.register_unit("load_json", Arc::new(units::LoadJson));
        registry.register_unit("input", Arc::new(units::Input));
        registry
    }

    pub fn register_unit(&mut self, path: impl Into<String>, unit: Arc<dyn Unit>) {
        self.entries
            .insert(path.into(), RegistryEntry::Invocable(unit));
    }

    pub fn register_builder(
        &mut self,
        path: impl Into<String>,
        builder: Arc<dyn UnitBuilder>,
    ) {
        self.entries
            .insert(path.into(), RegistryEntry::Constructible(builder));
    }

    pub fn resolve(&self, path: &str) -> Option<RegistryEntry> {
        self.entries.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lookup table from dotted-path strings to graph factories.
#[derive(Default)]
pub struct GraphRegistry {
    factories: HashMap<String, Arc<dyn GraphFactory>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<String>, factory: Arc<dyn GraphFactory>) {
        self.factories.insert(path.into(), factory);
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<dyn GraphFactory>> {
        self.factories.get(path).cloned()
    }
}
