use std::{cell::RefCell, fs, path::Path, process::Command, rc::Rc};

use bindle::{
    BundleError, Compiler, Config,
    graph_builder::GraphBuilder,
    loader::{SourceLoader, TransformRegistry},
    resolver::ModuleResolver,
    types::ModuleId,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_project(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = temp_dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    temp_dir
}

fn bundle(temp_dir: &TempDir, entry: &str) -> String {
    let config = Config::new(temp_dir.path(), entry);
    let compiler = Compiler::new(config, TransformRegistry::with_builtins()).unwrap();
    let output = compiler.run().unwrap();
    fs::read_to_string(output.output_file).unwrap()
}

/// Run a bundle with node, or return None when node is not installed
fn run_with_node(artifact: &Path) -> Option<String> {
    let Ok(output) = Command::new("node").arg(artifact).output() else {
        eprintln!("node not found on PATH, skipping execution check");
        return None;
    };
    assert!(
        output.status.success(),
        "node failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Some(String::from_utf8(output.stdout).unwrap())
}

fn bundle_and_run(files: &[(&str, &str)], entry: &str) -> Option<String> {
    let temp_dir = write_project(files);
    bundle(&temp_dir, entry);
    run_with_node(&temp_dir.path().join("dist/main.js"))
}

#[test]
fn test_require_of_module_exports() {
    let stdout = bundle_and_run(
        &[
            ("src/index.js", "const v = require('./a');\nconsole.log(v === 42, v);\n"),
            ("src/a.js", "module.exports = 42;\n"),
        ],
        "src/index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "true 42\n");
    }
}

#[test]
fn test_mutual_requires_emit_two_modules() {
    let temp_dir = write_project(&[
        (
            "a.js",
            "exports.name = 'a';\nconst b = require('./b');\nconsole.log('a sees', b.name);\n",
        ),
        (
            "b.js",
            "exports.name = 'b';\nconst a = require('./a');\nconsole.log('b sees', a.name);\n",
        ),
    ]);
    let artifact = bundle(&temp_dir, "a.js");
    assert_eq!(artifact.matches("factory: function").count(), 2);
    assert!(artifact.contains("\"a.js\": {"));
    assert!(artifact.contains("\"b.js\": {"));

    if let Some(stdout) = run_with_node(&temp_dir.path().join("dist/main.js")) {
        assert_eq!(stdout, "b sees a\na sees b\n");
    }
}

#[test]
fn test_each_module_body_runs_once() {
    let stdout = bundle_and_run(
        &[
            (
                "index.js",
                "require('./left'); require('./right');\nconsole.log(require('./counter').runs);\n",
            ),
            ("left.js", "require('./counter');\n"),
            ("right.js", "require('./lib/../counter.js');\n"),
            (
                "counter.js",
                "globalThis.runs = (globalThis.runs || 0) + 1;\nexports.runs = globalThis.runs;\n",
            ),
        ],
        "index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "1\n");
    }
}

#[test]
fn test_es_modules_and_interop() {
    let stdout = bundle_and_run(
        &[
            (
                "src/index.js",
                "import greet, { name } from './greet';\n\
                 import * as math from './math';\n\
                 import legacy from './legacy.cjs';\n\
                 import config from './config.json';\n\
                 console.log(greet(name), math.double(21), legacy.kind, config.port);\n",
            ),
            (
                "src/greet.js",
                "export const name = 'world';\n\
                 export default function greet(who) { return 'hello ' + who; }\n",
            ),
            (
                "src/math/index.js",
                "export * from './double';\nexport { double as twice } from './double';\n",
            ),
            ("src/math/double.js", "export function double(n) { return n * 2; }\n"),
            ("src/legacy.cjs", "module.exports = { kind: 'cjs' };\n"),
            ("src/config.json", "{ \"port\": 8080 }\n"),
        ],
        "src/index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "hello world 42 cjs 8080\n");
    }
}

#[test]
fn test_live_export_bindings() {
    let stdout = bundle_and_run(
        &[
            (
                "index.js",
                "import * as counter from './counter';\n\
                 counter.increment();\ncounter.increment();\n\
                 console.log(counter.count);\n",
            ),
            (
                "counter.js",
                "export let count = 0;\nexport function increment() { count += 1; }\n",
            ),
        ],
        "index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "2\n");
    }
}

#[test]
fn test_dynamic_import() {
    let stdout = bundle_and_run(
        &[
            (
                "index.js",
                "import('./lazy').then(function (m) { console.log(m.value); });\n\
                 console.log('sync');\n",
            ),
            ("lazy.js", "exports.value = 'lazy';\n"),
        ],
        "index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "sync\nlazy\n");
    }
}

#[test]
fn test_single_module_graph() {
    let temp_dir = write_project(&[("main.js", "console.log('alone');")]);
    let artifact = bundle(&temp_dir, "main.js");
    assert_eq!(artifact.matches("factory: function").count(), 1);
    assert!(artifact.contains("dependencies: {},"));
}

#[test]
fn test_dedup_counted_through_extraction_observer() {
    let temp_dir = write_project(&[
        ("index.js", "require('./a'); require('./b'); require('./a.js');"),
        ("a.js", "require('./shared'); require('./b');"),
        ("b.js", "require('./shared'); require('./a');"),
        ("shared.js", ""),
    ]);
    let loader = SourceLoader::new(&[], TransformRegistry::new()).unwrap();
    let resolver = ModuleResolver::new(temp_dir.path(), vec![".js".to_owned()]).unwrap();
    let extracted = Rc::new(RefCell::new(Vec::new()));
    let observer = Rc::clone(&extracted);

    let graph = GraphBuilder::new(&loader, &resolver)
        .build_with(ModuleId::new("index.js"), |module| {
            observer.borrow_mut().push(module.id.to_string());
        })
        .unwrap();

    assert_eq!(
        *extracted.borrow(),
        ["index.js", "a.js", "b.js", "shared.js"]
    );
    assert_eq!(graph.len(), 4);
}

#[test]
fn test_transform_chain_applies_right_to_left() {
    let temp_dir = write_project(&[("index.js", "module.exports = 'X';")]);
    let mut transforms = TransformRegistry::new();
    for name in ["a", "b", "c"] {
        // wraps the string literal: 'X' -> 'name(X)'
        transforms.register(name, move |content| {
            Ok(content
                .replacen('\'', &format!("'{name}("), 1)
                .replacen("';", ")';", 1))
        });
    }
    let config =
        Config::new(temp_dir.path(), "index.js").with_rule(r"\.js$", &["a", "b", "c"]);
    let compiler = Compiler::new(config, transforms).unwrap();
    let graph = compiler.build_graph().unwrap();
    assert_eq!(
        graph.get("index.js").unwrap().code,
        "module.exports = 'a(b(c(X)))';"
    );
}

#[test]
fn test_builtin_transforms_through_config_file() {
    let temp_dir = write_project(&[
        ("app/index.js", "\u{feff}const a = require('./a');\r\nconsole.log(a);\r\n"),
        ("app/a.js", "module.exports = 'a';"),
        (
            "bindle.toml",
            "mode = \"production\"\nentry = \"app/index.js\"\n\n[output]\npath = \"out\"\nfilename = \"app.js\"\n\n\
             [[module.rules]]\ntest = '\\.js$'\nuse = [\"normalize-newlines\", \"strip-bom\"]\n",
        ),
    ]);
    let config = Config::load(&temp_dir.path().join("bindle.toml")).unwrap();
    let output = Compiler::new(config, TransformRegistry::with_builtins())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(output.output_file, temp_dir.path().join("out/app.js"));
    let artifact = fs::read_to_string(&output.output_file).unwrap();
    assert!(!artifact.contains('\r'));
    assert!(!artifact.contains('\u{feff}'));
    assert!(!artifact.contains("// app/index.js"));
    assert!(artifact.contains("const a = require(\"app/a.js\");\nconsole.log(a);"));
}

#[test]
fn test_missing_dependency_is_resolution_error() {
    let temp_dir = write_project(&[("index.js", "require('./ghost');")]);
    let config = Config::new(temp_dir.path(), "index.js");
    let err = Compiler::new(config, TransformRegistry::with_builtins())
        .unwrap()
        .run()
        .unwrap_err();

    match err {
        BundleError::Resolution {
            specifier,
            importer,
            ..
        } => {
            assert_eq!(specifier, "./ghost");
            assert_eq!(importer, "index.js");
        }
        other => panic!("expected a resolution error, got {other}"),
    }
    assert!(!temp_dir.path().join("dist").exists());
}

#[test]
fn test_bare_specifier_is_resolution_error() {
    let temp_dir = write_project(&[
        ("src/index.js", "require('../lib/x.js');\nrequire('lib/x.js');\n"),
        ("src/lib/x.js", "module.exports = 'src/lib';"),
        ("lib/x.js", "module.exports = 'lib';"),
    ]);
    let config = Config::new(temp_dir.path(), "src/index.js");
    let err = Compiler::new(config, TransformRegistry::with_builtins())
        .unwrap()
        .run()
        .unwrap_err();

    match err {
        BundleError::Resolution { specifier, .. } => assert_eq!(specifier, "lib/x.js"),
        other => panic!("expected a resolution error, got {other}"),
    }
}

#[test]
fn test_relative_specifier_matching_another_id() {
    // `../lib/x.js` from src/ is the id `lib/x.js`, while `./lib/x.js` is `src/lib/x.js`
    let stdout = bundle_and_run(
        &[
            (
                "src/index.js",
                "console.log(require('./lib/x.js'), require('../lib/x.js'));\n",
            ),
            ("src/lib/x.js", "module.exports = 'src/lib';"),
            ("lib/x.js", "module.exports = 'lib';"),
        ],
        "src/index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "src/lib lib\n");
    }
}

#[test]
fn test_failed_module_is_not_cached() {
    let stdout = bundle_and_run(
        &[
            (
                "index.js",
                "globalThis.fail = true;\n\
                 try { require('./flaky'); } catch (err) { console.log('first:', err.message); }\n\
                 globalThis.fail = false;\n\
                 console.log('second:', JSON.stringify(require('./flaky')));\n",
            ),
            (
                "flaky.js",
                "exports.half = 1;\nif (globalThis.fail) throw new Error('boom');\nexports.full = 2;\n",
            ),
        ],
        "index.js",
    );
    if let Some(stdout) = stdout {
        assert_eq!(stdout, "first: boom\nsecond: {\"half\":1,\"full\":2}\n");
    }
}

#[test]
fn test_computed_dynamic_import_builds() {
    let temp_dir = write_project(&[(
        "index.js",
        "function later(name) { return import(name); }\nmodule.exports = later;\n",
    )]);
    let artifact = bundle(&temp_dir, "index.js");
    assert!(artifact.contains("return import(name);"));
    assert!(artifact.contains("dependencies: {},"));
}

#[test]
fn test_identical_builds_are_byte_identical() {
    let temp_dir = write_project(&[
        ("index.js", "import { a } from './a';\nconsole.log(a);"),
        ("a.js", "export const a = 1;"),
    ]);
    let first = bundle(&temp_dir, "index.js");
    let second = bundle(&temp_dir, "index.js");
    assert_eq!(first, second);
}
