//! Dependency extraction for a single module.

use log::debug;

use crate::{
    downlevel::downlevel,
    error::{BundleError, Result},
    module_syntax::scan_module,
    types::{FxIndexMap, ModuleId},
};

/// Code ready for embedding plus the dependencies it references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedModule {
    /// Rewritten code in which every reference names a canonical id
    pub code: String,
    /// Specifier as written -> canonical id, in order of first appearance
    pub dependencies: FxIndexMap<String, ModuleId>,
}

/// Find every dependency reference in `source`, resolve it through `resolve`
/// and rewrite the code to use canonical ids.
///
/// JSON modules have no references and are wrapped as a single
/// `module.exports` assignment.
pub fn extract<F>(source: &str, module: &ModuleId, mut resolve: F) -> Result<ExtractedModule>
where
    F: FnMut(&str) -> Result<ModuleId>,
{
    if module.extension() == Some(".json") {
        return extract_json(source, module);
    }

    let syntax = scan_module(source, module.as_str())?;
    let mut dependencies = FxIndexMap::default();
    for specifier in syntax.specifiers() {
        let id = resolve(specifier)?;
        debug!("{module}: '{specifier}' -> {id}");
        dependencies.insert(specifier.to_owned(), id);
    }

    let code = downlevel(source, &syntax, &dependencies);
    Ok(ExtractedModule { code, dependencies })
}

fn extract_json(source: &str, module: &ModuleId) -> Result<ExtractedModule> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    if let Err(err) = serde_json::from_str::<serde_json::Value>(source) {
        return Err(BundleError::Parse {
            module: module.to_string(),
            line: err.line(),
            column: err.column(),
            message: format!("invalid JSON: {err}"),
        });
    }
    Ok(ExtractedModule {
        code: format!("module.exports = {};", source.trim()),
        dependencies: FxIndexMap::default(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fake_resolver(specifier: &str) -> Result<ModuleId> {
        let bare = specifier.trim_start_matches("./");
        Ok(ModuleId::new(format!("src/{bare}.js")))
    }

    #[test]
    fn test_dependencies_in_first_appearance_order() {
        let source = "\
const b = require('./b');
import a from './a';
const again = require('./b');
";
        let id = ModuleId::new("src/index.js");
        let extracted = extract(source, &id, fake_resolver).unwrap();

        let dependencies: Vec<(&str, &str)> = extracted
            .dependencies
            .iter()
            .map(|(spec, id)| (spec.as_str(), id.as_str()))
            .collect();
        assert_eq!(dependencies, vec![("./b", "src/b.js"), ("./a", "src/a.js")]);
        assert!(!extracted.code.contains("'./b'"));
        assert!(extracted.code.contains(r#"require("src/b.js")"#));
    }

    #[test]
    fn test_each_specifier_resolved_once() {
        let source = "require('./x'); require('./x'); require('./y');";
        let id = ModuleId::new("src/index.js");
        let mut calls = Vec::new();
        extract(source, &id, |specifier| {
            calls.push(specifier.to_owned());
            fake_resolver(specifier)
        })
        .unwrap();
        assert_eq!(calls, vec!["./x", "./y"]);
    }

    #[test]
    fn test_resolution_failure_propagates() {
        let id = ModuleId::new("src/index.js");
        let err = extract("require('./missing');", &id, |specifier| {
            Err(BundleError::Resolution {
                specifier: specifier.to_owned(),
                importer: "src/index.js".to_owned(),
                reason: "no file".to_owned(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, BundleError::Resolution { ref specifier, .. } if specifier == "./missing"));
    }

    #[test]
    fn test_module_without_dependencies() {
        let id = ModuleId::new("leaf.js");
        let extracted = extract("module.exports = 42;", &id, fake_resolver).unwrap();
        assert!(extracted.dependencies.is_empty());
        assert_eq!(extracted.code, "module.exports = 42;");
    }

    #[test]
    fn test_regex_literals_after_blocks_hide_references() {
        let source = "function f() {}\n/require('.\\/ghost')/.test('');\nif (x) {}\n/import/.test(s);";
        let id = ModuleId::new("src/index.js");
        let extracted = extract(source, &id, |specifier| {
            panic!("nothing should be resolved, got {specifier}")
        })
        .unwrap();
        assert!(extracted.dependencies.is_empty());
        assert_eq!(extracted.code, source);
    }

    #[test]
    fn test_computed_dynamic_import_is_untouched() {
        let source = "function later(name) { return import(name); }";
        let id = ModuleId::new("src/index.js");
        let extracted = extract(source, &id, fake_resolver).unwrap();
        assert!(extracted.dependencies.is_empty());
        assert_eq!(extracted.code, source);
    }

    #[test]
    fn test_json_module() {
        let id = ModuleId::new("data/config.json");
        let extracted = extract("{ \"port\": 8080 }\n", &id, fake_resolver).unwrap();
        assert_eq!(extracted.code, "module.exports = { \"port\": 8080 };");
        assert!(extracted.dependencies.is_empty());

        let err = extract("{ port: 8080 }", &id, fake_resolver).unwrap_err();
        assert!(matches!(err, BundleError::Parse { line: 1, .. }), "{err}");
    }

    #[test]
    fn test_parse_error_names_module() {
        let id = ModuleId::new("src/broken.js");
        let err = extract("const s = 'unterminated;", &id, fake_resolver).unwrap_err();
        assert!(err.to_string().starts_with("src/broken.js:1:"), "{err}");
    }
}
