//! The dependency graph: every reachable module, keyed by canonical id

use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};

use crate::types::{FxIndexMap, ModuleId};

/// One module with its rewritten code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: ModuleId,
    pub code: String,
    /// Specifier as written -> canonical id
    pub dependencies: FxIndexMap<String, ModuleId>,
}

/// All modules reachable from the entry
///
/// Modules are kept in discovery order. An id is inserted once; a module that
/// is reached again through another path or a cycle is never reprocessed.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    entry: ModuleId,
    modules: FxIndexMap<ModuleId, Module>,
}

impl DependencyGraph {
    pub fn new(entry: ModuleId) -> Self {
        Self {
            entry,
            modules: FxIndexMap::default(),
        }
    }

    pub fn entry(&self) -> &ModuleId {
        &self.entry
    }

    /// Insert a module; returns false and keeps the existing module if the id is taken
    pub fn insert(&mut self, module: Module) -> bool {
        if self.modules.contains_key(&module.id) {
            return false;
        }
        self.modules.insert(module.id.clone(), module);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in discovery order
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    /// Dependency edges that point at an id missing from the graph
    ///
    /// Empty for any graph produced by a successful build.
    pub fn unresolved_dependencies(&self) -> Vec<(&ModuleId, &ModuleId)> {
        self.modules
            .values()
            .flat_map(|module| {
                module
                    .dependencies
                    .values()
                    .filter(|dep| !self.modules.contains_key(*dep))
                    .map(move |dep| (&module.id, dep))
            })
            .collect()
    }

    /// Groups of modules that depend on each other, directly or transitively
    ///
    /// Each group lists its members in discovery order, and groups are ordered
    /// by their first member. A module that requires itself forms a group of one.
    pub fn circular_groups(&self) -> Vec<Vec<ModuleId>> {
        let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(self.modules.len(), 0);
        for _ in 0..self.modules.len() {
            graph.add_node(());
        }
        for (from, module) in self.modules.values().enumerate() {
            for dep in module.dependencies.values() {
                if let Some(to) = self.modules.get_index_of(dep) {
                    graph.update_edge(NodeIndex::new(from), NodeIndex::new(to), ());
                }
            }
        }

        let mut groups: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut members: Vec<usize> =
                    component.into_iter().map(NodeIndex::index).collect();
                members.sort_unstable();
                members
            })
            .collect();
        groups.sort_unstable();

        groups
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|idx| self.modules.get_index(idx).map(|(id, _)| id.clone()))
                    .collect()
            })
            .collect()
    }
}
