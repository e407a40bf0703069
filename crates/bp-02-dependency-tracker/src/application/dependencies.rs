//! Per-component satisfaction map.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::domain::satisfiable::{SatisfactionListener, Satisfiable};

/// Component name → the distinct satisfiables it directly depends on.
///
/// Components without satisfiable dependencies are not present.
#[derive(Clone, Default)]
pub struct SatisfiableDependencies {
    by_component: BTreeMap<String, Vec<Arc<dyn Satisfiable>>>,
}

impl SatisfiableDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dependencies of one component, dropping duplicates by name.
    pub fn insert(&mut self, component: impl Into<String>, dependencies: Vec<Arc<dyn Satisfiable>>) {
        let mut seen = HashSet::new();
        let unique: Vec<_> = dependencies
            .into_iter()
            .filter(|s| seen.insert(s.name().to_string()))
            .collect();
        if !unique.is_empty() {
            self.by_component.insert(component.into(), unique);
        }
    }

    /// Names of components with at least one satisfiable dependency.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.by_component.keys().map(String::as_str)
    }

    pub fn dependencies_of(&self, component: &str) -> &[Arc<dyn Satisfiable>] {
        self.by_component
            .get(component)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every distinct satisfiable, each once.
    pub fn distinct(&self) -> Vec<Arc<dyn Satisfiable>> {
        let mut seen = HashSet::new();
        self.by_component
            .values()
            .flatten()
            .filter(|s| seen.insert(s.name().to_string()))
            .cloned()
            .collect()
    }

    /// Start every distinct satisfiable exactly once.
    pub fn track_all(&self, listener: Arc<dyn SatisfactionListener>) {
        let distinct = self.distinct();
        for satisfiable in &distinct {
            satisfiable.start(Arc::clone(&listener));
        }
        debug!(count = distinct.len(), "[Tracker] Tracking service references");
    }

    /// Stop every distinct satisfiable exactly once.
    pub fn untrack_all(&self) {
        for satisfiable in self.distinct() {
            satisfiable.stop();
        }
    }

    pub fn all_satisfied(&self) -> bool {
        self.by_component.values().flatten().all(|s| s.is_satisfied())
    }

    /// AND over the component's direct dependencies; true when it has none.
    pub fn is_component_satisfied(&self, component: &str) -> bool {
        self.dependencies_of(component).iter().all(|s| s.is_satisfied())
    }

    /// Filters of every unsatisfied dependency, sorted and deduplicated.
    pub fn missing_filters(&self) -> Vec<String> {
        self.by_component
            .values()
            .flatten()
            .filter(|s| !s.is_satisfied())
            .map(|s| s.filter())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_component.is_empty()
    }
}

impl std::fmt::Debug for SatisfiableDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.by_component.iter().map(|(k, v)| {
                (k, v.iter().map(|s| s.name().to_string()).collect::<Vec<_>>())
            }))
            .finish()
    }
}
