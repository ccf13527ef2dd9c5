use std::path::{Component, Path, PathBuf};

use log::{debug, trace, warn};

use crate::{
    config::Config,
    error::{BundleError, Result},
    types::ModuleId,
};

/// Turns specifiers into canonical module ids
///
/// Resolution is a lexical `normalize(join(dirname(importer), specifier))`
/// followed by probing the filesystem for the exact file, the file with each
/// configured extension, and the directory's `index` file with each extension.
/// The file that is found is canonicalized so symlinked or differently spelled
/// paths to the same physical file share one id.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    canonical_root: PathBuf,
    extensions: Vec<String>,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Result<Self> {
        let root = root.into();
        let canonical_root = root
            .canonicalize()
            .map_err(|err| BundleError::io(&root, err))?;
        debug!(
            "Resolver rooted at {} with extensions {:?}",
            canonical_root.display(),
            extensions
        );
        Ok(Self {
            root,
            canonical_root,
            extensions,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.root, config.resolve.extensions.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing a module id
    pub fn path_of(&self, id: &ModuleId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Resolve the configured entry path into the id of the first module
    pub fn resolve_entry(&self, entry: &Path) -> Result<ModuleId> {
        let relative = entry
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .or_else(|_| {
                entry
                    .canonicalize()
                    .ok()
                    .and_then(|canonical| {
                        canonical
                            .strip_prefix(&self.canonical_root)
                            .ok()
                            .map(Path::to_path_buf)
                    })
                    .ok_or(())
            })
            .map_err(|()| self.entry_error(entry, "entry is outside the project root"))?;

        let candidate = normalize(&slash_path(&relative))
            .ok_or_else(|| self.entry_error(entry, "entry is outside the project root"))?;
        self.probe(&candidate)
            .ok_or_else(|| self.entry_error(entry, &self.missing_reason(&candidate)))
    }

    /// Resolve `specifier` as written in module `importer`
    pub fn resolve(&self, importer: &ModuleId, specifier: &str) -> Result<ModuleId> {
        if !is_path_specifier(specifier) {
            return Err(BundleError::Resolution {
                specifier: specifier.to_owned(),
                importer: importer.to_string(),
                reason: "bare specifiers are not supported, use './', '../' or '/'".to_owned(),
            });
        }
        let joined = join(importer.dirname(), specifier);
        let Some(candidate) = normalize(&joined) else {
            return Err(BundleError::Resolution {
                specifier: specifier.to_owned(),
                importer: importer.to_string(),
                reason: "path escapes the project root".to_owned(),
            });
        };
        let id = self
            .probe(&candidate)
            .ok_or_else(|| BundleError::Resolution {
                specifier: specifier.to_owned(),
                importer: importer.to_string(),
                reason: self.missing_reason(&candidate),
            })?;
        trace!("Resolved '{specifier}' from {importer} to {id}");
        Ok(id)
    }

    fn entry_error(&self, entry: &Path, reason: &str) -> BundleError {
        BundleError::Resolution {
            specifier: entry.display().to_string(),
            importer: "<entry>".to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn missing_reason(&self, candidate: &str) -> String {
        format!(
            "no file at '{candidate}' (tried extensions {} and index files)",
            self.extensions.join(", ")
        )
    }

    fn candidates(&self, base: &str) -> Vec<String> {
        let mut candidates = Vec::with_capacity(1 + 2 * self.extensions.len());
        if !base.is_empty() {
            candidates.push(base.to_owned());
            for extension in &self.extensions {
                candidates.push(format!("{base}{extension}"));
            }
        }
        for extension in &self.extensions {
            if base.is_empty() {
                candidates.push(format!("index{extension}"));
            } else {
                candidates.push(format!("{base}/index{extension}"));
            }
        }
        candidates
    }

    fn probe(&self, base: &str) -> Option<ModuleId> {
        self.candidates(base)
            .into_iter()
            .find(|candidate| self.root.join(candidate).is_file())
            .map(|found| self.canonical_id(&found))
    }

    /// Canonicalize a path, handling errors gracefully
    fn canonical_id(&self, relative: &str) -> ModuleId {
        let path = self.root.join(relative);
        match path.canonicalize() {
            Ok(canonical) => match canonical.strip_prefix(&self.canonical_root) {
                Ok(inside) => ModuleId::new(slash_path(inside)),
                Err(_) => {
                    warn!(
                        "{} resolves outside the project root, keeping id {relative}",
                        path.display()
                    );
                    ModuleId::new(relative)
                }
            },
            Err(err) => {
                // Log warning but don't fail - keep the lexical id
                warn!("Failed to canonicalize path {}: {}", path.display(), err);
                ModuleId::new(relative)
            }
        }
    }
}

/// Whether `specifier` names a path rather than a package
///
/// Module ids never start with `.` or `/`, so a path specifier can never be
/// mistaken for an id at run time.
pub fn is_path_specifier(specifier: &str) -> bool {
    matches!(specifier, "." | "..")
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
}

/// Join a specifier onto the importer's directory
///
/// A leading `/` makes the specifier relative to the project root.
pub fn join(dir: &str, specifier: &str) -> String {
    if let Some(rooted) = specifier.strip_prefix('/') {
        rooted.to_owned()
    } else if dir.is_empty() {
        specifier.to_owned()
    } else {
        format!("{dir}/{specifier}")
    }
}

/// Lexically fold `.` and `..` segments of a `/`-separated relative path
///
/// Returns `None` when the path climbs above its starting directory.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
