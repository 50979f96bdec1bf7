// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Artifact cache and the skip filter that elides fresh tasks.
//!
//! Every completed task may persist its value as one JSON artifact under
//! the cache directory, keyed by task ID. Before scheduling, the filter
//! walks the plan from its source tasks and removes every task whose
//! artifact exists and is at least as new as all of its predecessors'
//! artifacts; the moment a task cannot be skipped, it and all of its
//! transitive successors are kept, even if individually fresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::graph::plan::{TaskId, TaskPlan};
use crate::values::Value;

/// Filesystem store holding one artifact per task ID.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, id: &TaskId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Modification time of the task's artifact, if it exists.
    pub fn mtime(&self, id: &TaskId) -> Option<SystemTime> {
        std::fs::metadata(self.artifact_path(id))
            .and_then(|meta| meta.modified())
            .ok()
    }

    /// Load a persisted value. Unreadable or unparsable artifacts are
    /// treated as absent.
    pub fn load(&self, id: &TaskId) -> Option<Value> {
        let bytes = std::fs::read(self.artifact_path(id)).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(task_id = %id, error = %err, "discarding unparsable cache artifact");
                None
            }
        }
    }

    pub fn store(&self, id: &TaskId, value: &Value) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(self.artifact_path(id), bytes)
    }
}

/// Remove every skippable task from the plan. Returns the pruned IDs.
///
/// A task is skippable iff its artifact exists and every predecessor
/// either has no artifact (treated as "no newer input") or has one no
/// newer than the task's own. A non-skippable task poisons all of its
/// transitive successors.
pub fn prune_fresh_tasks(plan: &mut TaskPlan, store: &CacheStore) -> Vec<TaskId> {
    let successors = plan.successors();
    let mut keep_marks: HashMap<TaskId, bool> = HashMap::new();

    for entry in plan.entry_tasks() {
        visit(&entry, plan, store, &successors, &mut keep_marks);
    }

    let pruned: Vec<TaskId> = plan
        .task_ids()
        .iter()
        .filter(|id| keep_marks.get(*id).copied() == Some(true))
        .cloned()
        .collect();
    for id in &pruned {
        plan.remove(id);
    }
    pruned
}

fn visit(
    id: &TaskId,
    plan: &TaskPlan,
    store: &CacheStore,
    successors: &HashMap<TaskId, Vec<TaskId>>,
    marks: &mut HashMap<TaskId, bool>,
) {
    match marks.get(id) {
        // Already poisoned from another path: re-propagate downstream.
        Some(false) => {
            mark_kept(id, successors, marks);
            return;
        }
        // Already decided skippable; successors were handled then.
        Some(true) => return,
        None => {}
    }

    if is_skippable(id, plan, store) {
        marks.insert(id.clone(), true);
        if let Some(dependents) = successors.get(id) {
            for dependent in dependents {
                visit(dependent, plan, store, successors, marks);
            }
        }
    } else {
        mark_kept(id, successors, marks);
    }
}

fn is_skippable(id: &TaskId, plan: &TaskPlan, store: &CacheStore) -> bool {
    let Some(own_mtime) = store.mtime(id) else {
        return false;
    };
    let Some(task) = plan.get(id) else {
        return false;
    };
    task.predecessors.iter().all(|pred| match store.mtime(pred) {
        Some(pred_mtime) => pred_mtime <= own_mtime,
        None => true,
    })
}

fn mark_kept(
    id: &TaskId,
    successors: &HashMap<TaskId, Vec<TaskId>>,
    marks: &mut HashMap<TaskId, bool>,
) {
    if marks.insert(id.clone(), false) == Some(false) {
        return;
    }
    if let Some(dependents) = successors.get(id) {
        for dependent in dependents {
            mark_kept(dependent, successors, marks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{CallDescriptor, UnitRef};
    use crate::graph::plan::Task;
    use crate::graph::NodeId;
    use crate::traits::Unit;
    use crate::values::ParamMap;
    use async_trait::async_trait;

    struct NoOp;

    #[async_trait]
    impl Unit for NoOp {
        async fn call(&self, _args: Vec<Value>, _params: &ParamMap) -> anyhow::Result<Value> {
            Ok(Value::None)
        }

        fn name(&self) -> &str {
            "no_op"
        }
    }

    fn task(id: &TaskId, preds: Vec<TaskId>) -> Task {
        Task {
            id: id.clone(),
            predecessors: preds,
            call: CallDescriptor::bare(UnitRef::invocable(NoOp)),
            properties: ParamMap::new(),
            node: Some(NodeId::named(id.as_str())),
        }
    }

    fn chain_plan() -> (TaskPlan, TaskId, TaskId, TaskId) {
        let a = TaskId::fingerprint(&NodeId::named("a"));
        let b = TaskId::fingerprint(&NodeId::named("b"));
        let c = TaskId::fingerprint(&NodeId::named("c"));
        let mut plan = TaskPlan::new();
        plan.insert(task(&a, vec![]));
        plan.insert(task(&b, vec![a.clone()]));
        plan.insert(task(&c, vec![b.clone()]));
        (plan, a, b, c)
    }

    #[test]
    fn test_store_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let id = TaskId::fingerprint(&NodeId::named("a"));

        store.store(&id, &Value::from("payload")).unwrap();
        assert_eq!(store.load(&id), Some(Value::from("payload")));
        assert!(store.mtime(&id).is_some());
    }

    #[test]
    fn test_tokens_survive_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let id = TaskId::fingerprint(&NodeId::named("skip"));

        store.store(&id, &Value::Skip).unwrap();
        assert_eq!(store.load(&id), Some(Value::Skip));
    }

    #[test]
    fn test_all_fresh_tasks_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let (mut plan, a, b, c) = chain_plan();
        for id in [&a, &b, &c] {
            store.store(id, &Value::from("cached")).unwrap();
        }

        let pruned = prune_fresh_tasks(&mut plan, &store);
        assert_eq!(pruned.len(), 3);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_missing_artifact_keeps_task_and_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let (mut plan, a, b, c) = chain_plan();
        // Only the head has an artifact: b must run, so c must run too.
        store.store(&a, &Value::from("cached")).unwrap();

        let pruned = prune_fresh_tasks(&mut plan, &store);
        assert_eq!(pruned, vec![a]);
        assert!(plan.contains(&b));
        assert!(plan.contains(&c));
    }

    #[test]
    fn test_stale_task_keeps_descendants_even_if_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let (mut plan, a, b, c) = chain_plan();
        store.store(&b, &Value::from("cached")).unwrap();
        store.store(&c, &Value::from("cached")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        // a's artifact is newer than b's: b is stale, and c is poisoned
        // despite having the newest artifact of the chain.
        store.store(&a, &Value::from("recomputed")).unwrap();

        let pruned = prune_fresh_tasks(&mut plan, &store);
        assert_eq!(pruned, vec![a]);
        assert!(plan.contains(&b));
        assert!(plan.contains(&c));
    }

    #[test]
    fn test_predecessor_without_artifact_counts_as_not_newer() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        let a = TaskId::fingerprint(&NodeId::named("a"));
        let b = TaskId::fingerprint(&NodeId::named("b"));
        let mut plan = TaskPlan::new();
        plan.insert(task(&a, vec![]));
        plan.insert(task(&b, vec![a.clone()]));
        // Upstream has no artifact at all; downstream's own artifact makes
        // it skippable, but the stale upstream poisons it anyway.
        store.store(&b, &Value::from("cached")).unwrap();

        let pruned = prune_fresh_tasks(&mut plan, &store);
        assert!(pruned.is_empty());
        assert!(plan.contains(&a));
        assert!(plan.contains(&b));
    }
}
