//! Source loading and the rule-driven transform chain

use std::{fmt, fs, path::Path};

use log::{debug, trace};
use regex::Regex;

use crate::{
    config::LoaderRule,
    error::{BundleError, Result},
    types::{FxIndexMap, ModuleId},
};

/// A named content transform
///
/// Transforms receive the current content and return the replacement. An
/// error aborts the build with a [`BundleError::Transform`].
pub type TransformFn = dyn Fn(&str) -> anyhow::Result<String>;

/// Transforms available to loader rules, keyed by the name rules refer to
#[derive(Default)]
pub struct TransformRegistry {
    transforms: FxIndexMap<String, Box<TransformFn>>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.transforms.keys()).finish()
    }
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the transforms that ship with the bundler
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("strip-bom", strip_bom)
            .register("normalize-newlines", normalize_newlines);
        registry
    }

    /// Register a transform, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&str) -> anyhow::Result<String> + 'static,
    {
        self.transforms.insert(name.into(), Box::new(transform));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name).map(|transform| &**transform)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }
}

fn strip_bom(content: &str) -> anyhow::Result<String> {
    Ok(content.strip_prefix('\u{feff}').unwrap_or(content).to_owned())
}

fn normalize_newlines(content: &str) -> anyhow::Result<String> {
    Ok(content.replace("\r\n", "\n").replace('\r', "\n"))
}

#[derive(Debug)]
struct CompiledRule {
    test: Regex,
    uses: Vec<String>,
}

/// Reads module files and runs them through the matching loader rules
#[derive(Debug)]
pub struct SourceLoader {
    rules: Vec<CompiledRule>,
    transforms: TransformRegistry,
}

impl SourceLoader {
    pub fn new(rules: &[LoaderRule], transforms: TransformRegistry) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let test = Regex::new(&rule.test).map_err(|err| {
                    BundleError::Config(format!("invalid rule test '{}': {err}", rule.test))
                })?;
                Ok(CompiledRule {
                    test,
                    uses: rule.uses.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules, transforms })
    }

    /// Read the module at `path` and apply every matching rule
    pub fn load(&self, id: &ModuleId, path: &Path) -> Result<String> {
        debug!("Loading {id} from {}", path.display());
        let content = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
        self.apply_rules(id, content)
    }

    /// Run `content` through the rules matching `id`
    ///
    /// Rules apply in configuration order. Within a rule, the transforms in
    /// `use` run last to first.
    pub fn apply_rules(&self, id: &ModuleId, mut content: String) -> Result<String> {
        for rule in self.rules.iter().filter(|rule| rule.test.is_match(id.as_str())) {
            for name in rule.uses.iter().rev() {
                let transform =
                    self.transforms
                        .get(name)
                        .ok_or_else(|| BundleError::Transform {
                            name: name.clone(),
                            module: id.to_string(),
                            message: "no transform registered under this name".to_owned(),
                        })?;
                trace!("Applying transform '{name}' to {id}");
                content = transform(&content).map_err(|err| BundleError::Transform {
                    name: name.clone(),
                    module: id.to_string(),
                    message: format!("{err:#}"),
                })?;
            }
        }
        Ok(content)
    }
}
