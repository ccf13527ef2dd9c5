//! Builds the dependency graph by walking outward from the entry module

use std::collections::VecDeque;

use log::{debug, info};

use crate::{
    error::Result,
    extractor::extract,
    graph::{DependencyGraph, Module},
    loader::SourceLoader,
    resolver::ModuleResolver,
    types::{FxIndexSet, ModuleId},
};

/// Discovers every module reachable from an entry
///
/// Work proceeds from a FIFO worklist of canonical ids. Before a module is
/// loaded its id is checked against the graph, so a module reached through
/// several paths or a cycle is loaded and extracted exactly once. The walk
/// stops at the first error.
#[derive(Debug)]
pub struct GraphBuilder<'a> {
    loader: &'a SourceLoader,
    resolver: &'a ModuleResolver,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(loader: &'a SourceLoader, resolver: &'a ModuleResolver) -> Self {
        Self { loader, resolver }
    }

    pub fn build(&self, entry: ModuleId) -> Result<DependencyGraph> {
        self.build_with(entry, |_| {})
    }

    /// Like [`Self::build`], calling `on_extracted` once for each module
    /// after it has been loaded and extracted
    pub fn build_with<F>(&self, entry: ModuleId, mut on_extracted: F) -> Result<DependencyGraph>
    where
        F: FnMut(&Module),
    {
        info!("Building dependency graph from {entry}");
        let mut graph = DependencyGraph::new(entry.clone());
        let mut queued: FxIndexSet<ModuleId> = FxIndexSet::default();
        let mut worklist = VecDeque::from([entry.clone()]);
        queued.insert(entry);

        while let Some(id) = worklist.pop_front() {
            if graph.contains(id.as_str()) {
                continue;
            }

            let path = self.resolver.path_of(&id);
            let source = self.loader.load(&id, &path)?;
            let extracted = extract(&source, &id, |specifier| {
                self.resolver.resolve(&id, specifier)
            })?;

            for dep in extracted.dependencies.values() {
                if queued.insert(dep.clone()) {
                    worklist.push_back(dep.clone());
                } else {
                    debug!("{dep} already queued, skipping");
                }
            }

            let module = Module {
                id,
                code: extracted.code,
                dependencies: extracted.dependencies,
            };
            on_extracted(&module);
            graph.insert(module);
        }

        info!("Dependency graph has {} modules", graph.len());
        Ok(graph)
    }
}
