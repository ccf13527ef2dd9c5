//! Rewrites a scanned module into a plain statement sequence
//!
//! The output runs inside the wrapper function the runtime gives every module
//! (`require`, `exports`, `module` in scope). Dependency references are
//! rewritten to canonical module ids, import declarations become hoisted
//! `require` calls and exports become getters on `exports`, so export bindings
//! stay live and a module caught in a cycle sees the values as they are
//! assigned.

use serde_json::Value;

use crate::{
    lexer::Span,
    module_syntax::{ImportClause, ModuleSyntax, ReExport, SyntaxItem, is_identifier_name},
    types::{FxIndexMap, ModuleId},
};

const ES_MODULE_MARKER: &str = r#"Object.defineProperty(exports, "__esModule", { value: true });"#;

const DEFAULT_INTEROP: &str = "(function (m) { return m && m.__esModule ? m.default : m; })";

#[derive(Debug)]
struct Edit {
    span: Span,
    text: String,
}

/// Quote a string as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    Value::String(value.to_owned()).to_string()
}

/// Produce the downleveled code for a module
///
/// `resolved` maps each specifier found by the scanner to its canonical id.
pub fn downlevel(
    source: &str,
    syntax: &ModuleSyntax,
    resolved: &FxIndexMap<String, ModuleId>,
) -> String {
    let mut rewriter = Rewriter {
        resolved,
        edits: Vec::new(),
        getters: FxIndexMap::default(),
        hoisted: Vec::new(),
        temporaries: 0,
    };
    if let Some(hashbang) = syntax.hashbang {
        rewriter.remove(hashbang);
    }
    for item in &syntax.items {
        rewriter.rewrite(item);
    }
    rewriter.finish(source, syntax)
}

struct Rewriter<'a> {
    resolved: &'a FxIndexMap<String, ModuleId>,
    edits: Vec<Edit>,
    /// Exported name -> expression the getter returns
    getters: FxIndexMap<String, String>,
    /// Statements moved to the top of the module, in source order
    hoisted: Vec<String>,
    temporaries: usize,
}

impl Rewriter<'_> {
    fn require(&self, specifier: &str) -> String {
        let id = self
            .resolved
            .get(specifier)
            .map_or(specifier, ModuleId::as_str);
        format!("require({})", js_string(id))
    }

    fn temporary(&mut self, prefix: &str) -> String {
        let name = format!("__{prefix}_{}", self.temporaries);
        self.temporaries += 1;
        name
    }

    fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(Edit {
            span,
            text: text.into(),
        });
    }

    fn remove(&mut self, span: Span) {
        self.replace(span, String::new());
    }

    fn export(&mut self, exported: &str, expression: String) {
        // First declaration wins; a second getter for the same name would throw at runtime
        self.getters.entry(exported.to_owned()).or_insert(expression);
    }

    fn rewrite(&mut self, item: &SyntaxItem) {
        match item {
            SyntaxItem::Require { specifier, literal } => {
                let id = self
                    .resolved
                    .get(specifier)
                    .map_or(specifier.as_str(), ModuleId::as_str);
                self.replace(*literal, js_string(id));
            }
            SyntaxItem::DynamicImport { specifier, span } => {
                let call = format!(
                    "Promise.resolve().then(function () {{ return {}; }})",
                    self.require(specifier)
                );
                self.replace(*span, call);
            }
            SyntaxItem::Import {
                specifier,
                span,
                clause,
            } => {
                let statements = self.import_statements(specifier, clause);
                self.hoisted.extend(statements);
                self.remove(*span);
            }
            SyntaxItem::ExportFrom {
                specifier,
                span,
                clause,
            } => {
                self.re_export(specifier, clause);
                self.remove(*span);
            }
            SyntaxItem::ExportLocal { span, specifiers } => {
                for (local, exported) in specifiers {
                    self.export(exported, local.clone());
                }
                self.remove(*span);
            }
            SyntaxItem::ExportDeclaration { keyword, names } => {
                for name in names {
                    self.export(name, name.clone());
                }
                self.remove(*keyword);
            }
            SyntaxItem::ExportDefaultNamed { keyword, name } => {
                self.export("default", name.clone());
                self.remove(*keyword);
            }
            SyntaxItem::ExportDefaultExpression {
                keyword,
                terminator,
            } => {
                self.replace(*keyword, "exports.default =");
                if let Some(at) = terminator {
                    self.replace(Span::new(*at, *at), ";");
                }
            }
        }
    }

    fn import_statements(&mut self, specifier: &str, clause: &ImportClause) -> Vec<String> {
        let require = self.require(specifier);
        if clause.is_empty() {
            return vec![format!("{require};")];
        }

        let bindings = usize::from(clause.default.is_some())
            + usize::from(clause.namespace.is_some())
            + usize::from(!clause.named.is_empty());
        let mut statements = Vec::new();
        let source = if bindings > 1 {
            let temporary = self.temporary("import");
            statements.push(format!("const {temporary} = {require};"));
            temporary
        } else {
            require
        };

        if let Some(default) = &clause.default {
            statements.push(format!("const {default} = {DEFAULT_INTEROP}({source});"));
        }
        if let Some(namespace) = &clause.namespace {
            statements.push(format!("const {namespace} = {source};"));
        }
        if !clause.named.is_empty() {
            let properties: Vec<String> = clause
                .named
                .iter()
                .map(|(imported, local)| {
                    if imported == local {
                        local.clone()
                    } else if is_identifier_name(imported) {
                        format!("{imported}: {local}")
                    } else {
                        format!("{}: {local}", js_string(imported))
                    }
                })
                .collect();
            statements.push(format!("const {{ {} }} = {source};", properties.join(", ")));
        }
        statements
    }

    fn re_export(&mut self, specifier: &str, clause: &ReExport) {
        let require = self.require(specifier);
        match clause {
            ReExport::All => {
                self.hoisted.push(format!(
                    "(function (source) {{ Object.keys(source).forEach(function (key) {{ if \
                     (key === \"default\" || key === \"__esModule\" || \
                     Object.prototype.hasOwnProperty.call(exports, key)) return; \
                     Object.defineProperty(exports, key, {{ enumerable: true, get: function () \
                     {{ return source[key]; }} }}); }}); }})({require});"
                ));
            }
            ReExport::Namespace(name) => {
                let temporary = self.temporary("reexport");
                self.hoisted.push(format!("var {temporary} = {require};"));
                self.export(name, temporary);
            }
            ReExport::Named(specifiers) => {
                let temporary = self.temporary("reexport");
                self.hoisted.push(format!("var {temporary} = {require};"));
                for (imported, exported) in specifiers {
                    self.export(exported, format!("{temporary}[{}]", js_string(imported)));
                }
            }
        }
    }

    fn finish(mut self, source: &str, syntax: &ModuleSyntax) -> String {
        let mut prologue = Vec::new();
        if syntax.has_module_syntax() {
            prologue.push("\"use strict\";".to_owned());
        }
        if syntax.has_exports() {
            prologue.push(ES_MODULE_MARKER.to_owned());
        }
        for (exported, expression) in &self.getters {
            prologue.push(format!(
                "Object.defineProperty(exports, {}, {{ enumerable: true, get: function () {{ \
                 return {expression}; }} }});",
                js_string(exported)
            ));
        }
        prologue.append(&mut self.hoisted);

        let mut code = String::with_capacity(source.len() + 64 * prologue.len());
        if !prologue.is_empty() {
            code.push_str(&prologue.join("\n"));
            code.push('\n');
        }

        self.edits.sort_by_key(|edit| (edit.span.start, edit.span.end));
        let mut cursor = 0;
        for edit in &self.edits {
            if edit.span.start < cursor {
                continue;
            }
            code.push_str(&source[cursor..edit.span.start]);
            code.push_str(&edit.text);
            cursor = edit.span.end;
        }
        code.push_str(&source[cursor..]);
        code
    }
}
