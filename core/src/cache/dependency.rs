//! Bidirectional dependent/dependency mapping and transitive-closure
//! invalidation support (spec §4.2 "Dependency tracker").
//!
//! Grounded on `original_source/.../cache_manager.py::DependencyTracker`:
//! same `add_dependency`/`get_dependents`/`get_transitively_affected` shape,
//! ported from a Python dict-of-sets to a `HashMap<String, HashSet<String>>`
//! pair kept in sync by [`DependencyTracker::add_dependency`] /
//! [`DependencyTracker::remove_dependencies`].

use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Default)]
pub struct DependencyTracker {
    /// dependent -> the set of keys it depends on.
    dependencies: HashMap<String, HashSet<String>>,
    /// dependency -> the set of keys that depend on it.
    dependents: HashMap<String, HashSet<String>>,
    /// dependent -> set of imported symbol names from each dependency, used
    /// by selective invalidation (spec §4.2).
    imported_symbols: HashMap<(String, String), HashSet<String>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        self.dependencies
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        self.dependents
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    pub fn add_dependency_with_imports(
        &mut self,
        dependent: &str,
        dependency: &str,
        imported_names: impl IntoIterator<Item = String>,
    ) {
        self.add_dependency(dependent, dependency);
        self.imported_symbols
            .entry((dependent.to_string(), dependency.to_string()))
            .or_default()
            .extend(imported_names);
    }

    /// Removes every dependency edge originating at `item` (called when
    /// `item` is reanalyzed and its import list may have changed).
    pub fn remove_dependencies(&mut self, item: &str) {
        if let Some(deps) = self.dependencies.remove(item) {
            for dep in deps {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(item);
                }
            }
        }
        self.imported_symbols
            .retain(|(dependent, _), _| dependent != item);
    }

    /// Removes `item` entirely: as a dependent and as a dependency of
    /// others (used when a file is deleted).
    pub fn remove_item(&mut self, item: &str) {
        self.remove_dependencies(item);
        if let Some(dependents) = self.dependents.remove(item) {
            for dep in dependents {
                if let Some(set) = self.dependencies.get_mut(&dep) {
                    set.remove(item);
                }
            }
        }
        self.imported_symbols
            .retain(|(_, dependency), _| dependency != item);
    }

    pub fn get_dependencies(&self, item: &str) -> HashSet<String> {
        self.dependencies.get(item).cloned().unwrap_or_default()
    }

    pub fn get_dependents(&self, item: &str) -> HashSet<String> {
        self.dependents.get(item).cloned().unwrap_or_default()
    }

    pub fn imported_names(&self, dependent: &str, dependency: &str) -> HashSet<String> {
        self.imported_symbols
            .get(&(dependent.to_string(), dependency.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Breadth-first closure of "depends on `item`, directly or
    /// indirectly" (spec §4.2: `transitively_affected(key)`).
    pub fn transitively_affected(&self, item: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(item.to_string());
        while let Some(current) = queue.pop_front() {
            for dependent in self.get_dependents(&current) {
                if visited.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }
        visited
    }

    /// Selective-mode filter (spec §4.2): of the keys transitively affected
    /// by `item`, keep only those whose imported-symbol set from `item`
    /// intersects `changed_exports`. Falls back to the full closure when a
    /// dependent's imported-symbol set was never recorded (conservative).
    pub fn selectively_affected(&self, item: &str, changed_exports: &HashSet<String>) -> HashSet<String> {
        let direct_dependents = self.get_dependents(item);
        let mut affected = HashSet::new();
        let mut frontier = VecDeque::new();
        for dependent in direct_dependents {
            let imported = self.imported_names(&dependent, item);
            if imported.is_empty() || !imported.is_disjoint(changed_exports) {
                if affected.insert(dependent.clone()) {
                    frontier.push_back(dependent);
                }
            }
        }
        // Propagate transitively: a dependent's own dependents are affected
        // unconditionally once the dependent itself is affected, since we
        // don't know which of *its* exports changed.
        while let Some(current) = frontier.pop_front() {
            for dependent in self.get_dependents(&current) {
                if affected.insert(dependent.clone()) {
                    frontier.push_back(dependent);
                }
            }
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitive_closure_follows_chain() {
        let mut tracker = DependencyTracker::new();
        tracker.add_dependency("b.ts", "a.ts");
        tracker.add_dependency("c.ts", "b.ts");
        let affected = tracker.transitively_affected("a.ts");
        assert!(affected.contains("b.ts"));
        assert!(affected.contains("c.ts"));
    }

    #[test]
    fn remove_item_clears_both_directions() {
        let mut tracker = DependencyTracker::new();
        tracker.add_dependency("b.ts", "a.ts");
        tracker.remove_item("a.ts");
        assert!(tracker.get_dependents("a.ts").is_empty());
        assert!(tracker.get_dependencies("b.ts").is_empty());
    }

    #[test]
    fn selective_invalidation_filters_by_imported_symbols() {
        let mut tracker = DependencyTracker::new();
        tracker.add_dependency_with_imports("b.ts", "a.ts", vec!["Foo".to_string()]);
        tracker.add_dependency_with_imports("c.ts", "a.ts", vec!["Bar".to_string()]);
        let mut changed = HashSet::new();
        changed.insert("Foo".to_string());
        let affected = tracker.selectively_affected("a.ts", &changed);
        assert!(affected.contains("b.ts"));
        assert!(!affected.contains("c.ts"));
    }
}
