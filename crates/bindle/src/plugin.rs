//! Plugin contract and the plugins that ship with the bundler

use std::fmt;

use log::info;

use crate::{
    compiler::Compiler,
    error::{BundleError, Result},
};

/// Extension installed into a [`Compiler`] before it runs
///
/// `install` registers handlers on the compiler's hooks. Hook payloads are
/// summaries, so a plugin never sees the dependency graph itself.
pub trait Plugin: fmt::Debug {
    fn install(&self, compiler: &mut Compiler);
}

/// Logs every lifecycle stage at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildLogPlugin;

impl BuildLogPlugin {
    pub const NAME: &'static str = "build-log";
}

impl Plugin for BuildLogPlugin {
    fn install(&self, compiler: &mut Compiler) {
        let hooks = compiler.hooks_mut();
        hooks.run.tap(Self::NAME, |build| {
            info!("Starting {:?} build of {}", build.mode, build.entry.display());
            Ok(())
        });
        hooks.before_compile.tap(Self::NAME, |_| {
            info!("Compiling module graph");
            Ok(())
        });
        hooks.after_compile.tap(Self::NAME, |summary| {
            info!(
                "Compiled {} modules from {}",
                summary.module_count, summary.entry
            );
            for group in &summary.circular_groups {
                let members: Vec<&str> = group.iter().map(|id| id.as_str()).collect();
                info!("Circular dependency: {}", members.join(" -> "));
            }
            Ok(())
        });
        hooks.after_plugins.tap(Self::NAME, |emitted| {
            info!(
                "Wrote {} bytes to {}",
                emitted.bytes,
                emitted.output_file.display()
            );
            Ok(())
        });
        hooks.after_emit.tap(Self::NAME, |build_id| {
            info!("Build {build_id} complete");
            Ok(build_id)
        });
    }
}

/// Look up a built-in plugin by the name used in the configuration file
pub fn builtin_plugin(name: &str) -> Result<Box<dyn Plugin>> {
    match name {
        BuildLogPlugin::NAME => Ok(Box::new(BuildLogPlugin)),
        other => Err(BundleError::Config(format!("unknown plugin '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_plugin_lookup() {
        assert!(builtin_plugin("build-log").is_ok());
        let err = builtin_plugin("minify").unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: unknown plugin 'minify'");
    }
}
