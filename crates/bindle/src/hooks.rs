//! Lifecycle hooks plugins can tap into
//!
//! A hook is a named, ordered list of handlers. Broadcast hooks hand every
//! handler the same read-only payload. Pipeline hooks thread a value through
//! the handlers, each receiving what the previous one returned. Handlers run
//! in registration order and the first failure stops the hook.

use std::{fmt, path::PathBuf};

use log::trace;

use crate::{
    config::Mode,
    error::{BundleError, Result},
    types::ModuleId,
};

type BroadcastHandler<T> = Box<dyn Fn(&T) -> anyhow::Result<()>>;
type PipelineHandler<V> = Box<dyn Fn(V) -> anyhow::Result<V>>;

struct Tap<H> {
    plugin: String,
    handler: H,
}

fn plugin_error(hook: &'static str, plugin: &str, err: &anyhow::Error) -> BundleError {
    BundleError::Plugin {
        hook,
        plugin: plugin.to_owned(),
        message: format!("{err:#}"),
    }
}

/// Hook whose handlers observe a shared payload
pub struct BroadcastHook<T> {
    name: &'static str,
    taps: Vec<Tap<BroadcastHandler<T>>>,
}

impl<T> BroadcastHook<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a handler registered by `plugin`
    pub fn tap<F>(&mut self, plugin: impl Into<String>, handler: F)
    where
        F: Fn(&T) -> anyhow::Result<()> + 'static,
    {
        self.taps.push(Tap {
            plugin: plugin.into(),
            handler: Box::new(handler),
        });
    }

    /// Run every handler in registration order
    pub fn call(&self, payload: &T) -> Result<()> {
        for tap in &self.taps {
            trace!("Hook {}: running handler from {}", self.name, tap.plugin);
            (tap.handler)(payload).map_err(|err| plugin_error(self.name, &tap.plugin, &err))?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

impl<T> fmt::Debug for BroadcastHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHook")
            .field("name", &self.name)
            .field("plugins", &self.taps.iter().map(|tap| &tap.plugin).collect::<Vec<_>>())
            .finish()
    }
}

/// Hook whose handlers each transform the value produced by the previous one
pub struct PipelineHook<V> {
    name: &'static str,
    taps: Vec<Tap<PipelineHandler<V>>>,
}

impl<V> PipelineHook<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tap<F>(&mut self, plugin: impl Into<String>, handler: F)
    where
        F: Fn(V) -> anyhow::Result<V> + 'static,
    {
        self.taps.push(Tap {
            plugin: plugin.into(),
            handler: Box::new(handler),
        });
    }

    /// Thread `seed` through every handler and return the final value
    pub fn call(&self, seed: V) -> Result<V> {
        let mut value = seed;
        for tap in &self.taps {
            trace!("Hook {}: running handler from {}", self.name, tap.plugin);
            value = (tap.handler)(value).map_err(|err| plugin_error(self.name, &tap.plugin, &err))?;
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

impl<V> fmt::Debug for PipelineHook<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHook")
            .field("name", &self.name)
            .field("plugins", &self.taps.iter().map(|tap| &tap.plugin).collect::<Vec<_>>())
            .finish()
    }
}

/// Payload of the `run` and `before_compile` hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub entry: PathBuf,
    pub output_file: PathBuf,
    pub mode: Mode,
}

/// Payload of the `after_compile` hook, fired once the graph is complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSummary {
    pub entry: ModuleId,
    pub module_count: usize,
    /// Mutually dependent module groups, see `DependencyGraph::circular_groups`
    pub circular_groups: Vec<Vec<ModuleId>>,
}

/// Payload of the `after_plugins` hook, fired once the artifact has been written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitSummary {
    pub output_file: PathBuf,
    pub bytes: usize,
}

/// Every lifecycle hook, in firing order
///
/// `after_emit` is a pipeline seeded with the build id of the written
/// artifact; whatever the last handler returns is reported as the build id.
#[derive(Debug)]
pub struct CompilerHooks {
    pub run: BroadcastHook<BuildInfo>,
    pub before_compile: BroadcastHook<BuildInfo>,
    pub after_compile: BroadcastHook<CompileSummary>,
    pub after_plugins: BroadcastHook<EmitSummary>,
    pub after_emit: PipelineHook<String>,
}

impl Default for CompilerHooks {
    fn default() -> Self {
        Self {
            run: BroadcastHook::new("run"),
            before_compile: BroadcastHook::new("before_compile"),
            after_compile: BroadcastHook::new("after_compile"),
            after_plugins: BroadcastHook::new("after_plugins"),
            after_emit: PipelineHook::new("after_emit"),
        }
    }
}
