use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::error::{BundleError, Result};

/// Default name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "bindle.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

/// Project configuration
///
/// All paths are anchored to the directory that holds the configuration file
/// once loaded, so the rest of the compiler never depends on the working
/// directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,
    /// Project root; module ids are relative to it
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// First module to load
    pub entry: PathBuf,
    pub output: OutputConfig,
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    /// Names of built-in plugins to install, in order
    #[serde(default)]
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    #[serde(default = "default_filename")]
    pub filename: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    #[serde(default)]
    pub rules: Vec<LoaderRule>,
}

/// Applies the `use` transforms, last to first, to every module whose id
/// matches `test`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderRule {
    pub test: String,
    #[serde(rename = "use", default)]
    pub uses: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConfig {
    /// Extensions probed, in order, for specifiers that do not name a file
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_filename() -> String {
    "main.js".to_owned()
}

fn default_extensions() -> Vec<String> {
    [".js", ".mjs", ".cjs", ".json"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

impl Config {
    /// Configuration for a project at `root` with `entry` given relative to it;
    /// output defaults to `dist/main.js`
    pub fn new(root: impl Into<PathBuf>, entry: impl AsRef<Path>) -> Self {
        let root = root.into();
        Self {
            mode: Mode::default(),
            entry: root.join(entry),
            output: OutputConfig {
                path: root.join("dist"),
                filename: default_filename(),
            },
            module: ModuleConfig::default(),
            resolve: ResolveConfig::default(),
            plugins: Vec::new(),
            root,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        self.output = OutputConfig {
            path: path.into(),
            filename: filename.into(),
        };
        self
    }

    #[must_use]
    pub fn with_rule(mut self, test: impl Into<String>, uses: &[&str]) -> Self {
        self.module.rules.push(LoaderRule {
            test: test.into(),
            uses: uses.iter().map(|name| (*name).to_owned()).collect(),
        });
        self
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&text, base_dir)
    }

    /// Parse configuration text, anchoring relative paths at `base_dir`
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|err| BundleError::Config(err.to_string()))?;
        config.root = base_dir.join(&config.root);
        config.entry = base_dir.join(&config.entry);
        config.output.path = base_dir.join(&config.output.path);
        config.validate()?;
        Ok(config)
    }

    /// Full path of the artifact
    pub fn output_file(&self) -> PathBuf {
        self.output.path.join(&self.output.filename)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output.filename.is_empty()
            || self.output.filename.contains(['/', '\\'])
        {
            return Err(BundleError::Config(format!(
                "output.filename must be a plain file name, got '{}'",
                self.output.filename
            )));
        }
        if let Some(bad) = self
            .resolve
            .extensions
            .iter()
            .find(|extension| !extension.starts_with('.') || extension.len() < 2)
        {
            return Err(BundleError::Config(format!(
                "resolve.extensions entries must start with '.', got '{bad}'"
            )));
        }
        for rule in &self.module.rules {
            Regex::new(&rule.test).map_err(|err| {
                BundleError::Config(format!("invalid rule test '{}': {err}", rule.test))
            })?;
        }
        Ok(())
    }
}
