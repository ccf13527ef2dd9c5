//! Code generation: renders the graph into one self-bootstrapping artifact
//!
//! The artifact is the bootstrap template with two slots filled in: the module
//! map and the entry id. Each module becomes a record holding its dependency
//! map and a factory function whose body is the module's rewritten code, so
//! the artifact is plain JavaScript and needs no `eval` at run time.

use log::debug;

use crate::{
    config::Mode,
    downlevel::js_string,
    graph::{DependencyGraph, Module},
};

/// Runtime registry and loader the artifact is built around
const BOOTSTRAP: &str = include_str!("code_generator/bootstrap.js");

/// Renders a [`DependencyGraph`] into the final artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeGenerator {
    mode: Mode,
}

impl CodeGenerator {
    pub fn new(mode: Mode) -> Self {
        Self { mode }
    }

    /// Render the artifact for `graph`
    ///
    /// Modules appear in discovery order. Module code is embedded verbatim, so
    /// the same graph always produces byte-identical output.
    pub fn emit(&self, graph: &DependencyGraph) -> String {
        let mut modules = String::new();
        for module in graph.modules() {
            self.render_module(module, &mut modules);
        }
        debug!(
            "Rendered {} modules ({} bytes of module code)",
            graph.len(),
            modules.len()
        );
        render_template(
            BOOTSTRAP,
            &[
                ("modules", modules.as_str()),
                ("entry", js_string(graph.entry().as_str()).as_str()),
            ],
        )
    }

    fn render_module(&self, module: &Module, out: &mut String) {
        let dependencies = module
            .dependencies
            .iter()
            .map(|(specifier, id)| format!("{}: {}", js_string(specifier), js_string(id.as_str())))
            .collect::<Vec<_>>()
            .join(", ");

        out.push_str("  ");
        out.push_str(&js_string(module.id.as_str()));
        out.push_str(": {\n    dependencies: {");
        out.push_str(&dependencies);
        out.push_str("},\n    factory: function (require, exports, module) {\n");
        if self.mode == Mode::Development {
            out.push_str("// ");
            out.push_str(module.id.as_str());
            out.push('\n');
        }
        out.push_str(&module.code);
        if !module.code.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("    }\n  },\n");
    }
}

/// Fill `{{name}}` slots in one pass
///
/// Substituted text is never rescanned, so module code that happens to contain
/// `{{modules}}` is emitted as is. Unknown slots are left untouched.
fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + values.iter().map(|(_, value)| value.len()).sum::<usize>(),
    );
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let replacement = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match replacement {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
