//! Compile driver
//!
//! Fires the lifecycle hooks around the three stages of a run: build the
//! dependency graph, generate the artifact, write it. The graph lives only
//! for the duration of [`Compiler::run`] and is passed from the graph builder
//! to the code generator as a plain value.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::{
    code_generator::CodeGenerator,
    config::Config,
    error::{BundleError, Result},
    graph::DependencyGraph,
    graph_builder::GraphBuilder,
    hooks::{BuildInfo, CompileSummary, CompilerHooks, EmitSummary},
    loader::{SourceLoader, TransformRegistry},
    plugin::Plugin,
    resolver::ModuleResolver,
};

/// Number of hex characters kept from the artifact digest
const BUILD_ID_LEN: usize = 20;

/// What a completed run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub output_file: PathBuf,
    /// Final value of the `after_emit` pipeline
    pub build_id: String,
    pub module_count: usize,
}

#[derive(Debug)]
pub struct Compiler {
    config: Config,
    loader: SourceLoader,
    resolver: ModuleResolver,
    hooks: CompilerHooks,
}

impl Compiler {
    pub fn new(config: Config, transforms: TransformRegistry) -> Result<Self> {
        config.validate()?;
        let loader = SourceLoader::new(&config.module.rules, transforms)?;
        let resolver = ModuleResolver::from_config(&config)?;
        Ok(Self {
            config,
            loader,
            resolver,
            hooks: CompilerHooks::default(),
        })
    }

    /// Create a compiler and install `plugins` in order
    pub fn with_plugins(
        config: Config,
        transforms: TransformRegistry,
        plugins: &[Box<dyn Plugin>],
    ) -> Result<Self> {
        let mut compiler = Self::new(config, transforms)?;
        for plugin in plugins {
            compiler.install(plugin.as_ref());
        }
        Ok(compiler)
    }

    pub fn install(&mut self, plugin: &dyn Plugin) {
        debug!("Installing plugin {plugin:?}");
        plugin.install(self);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hooks(&self) -> &CompilerHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut CompilerHooks {
        &mut self.hooks
    }

    /// Build the dependency graph for the configured entry without firing hooks
    pub fn build_graph(&self) -> Result<DependencyGraph> {
        let entry = self.resolver.resolve_entry(&self.config.entry)?;
        GraphBuilder::new(&self.loader, &self.resolver).build(entry)
    }

    /// Run a full compile and write the artifact
    pub fn run(&self) -> Result<BuildOutput> {
        let output_file = self.config.output_file();
        let build = BuildInfo {
            entry: self.config.entry.clone(),
            output_file: output_file.clone(),
            mode: self.config.mode,
        };

        self.hooks.run.call(&build)?;
        self.hooks.before_compile.call(&build)?;

        let graph = self.build_graph()?;
        self.hooks.after_compile.call(&CompileSummary {
            entry: graph.entry().clone(),
            module_count: graph.len(),
            circular_groups: graph.circular_groups(),
        })?;

        let artifact = CodeGenerator::new(self.config.mode).emit(&graph);
        write_artifact(&output_file, &artifact)?;
        info!(
            "Wrote {} ({} modules, {} bytes)",
            output_file.display(),
            graph.len(),
            artifact.len()
        );

        self.hooks.after_plugins.call(&EmitSummary {
            output_file: output_file.clone(),
            bytes: artifact.len(),
        })?;
        let build_id = self.hooks.after_emit.call(build_id(&artifact))?;

        Ok(BuildOutput {
            output_file,
            build_id,
            module_count: graph.len(),
        })
    }
}

fn write_artifact(output_file: &Path, artifact: &str) -> Result<()> {
    if let Some(dir) = output_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|err| BundleError::io(dir, err))?;
    }
    fs::write(output_file, artifact).map_err(|err| BundleError::io(output_file, err))
}

/// Identifier of an artifact: a prefix of its SHA-256 digest in hex
pub fn build_id(artifact: &str) -> String {
    let digest = Sha256::digest(artifact.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(BUILD_ID_LEN);
    hex
}
