//! Shared type definitions for the bindle crate
//!
//! This module contains common types that are used across multiple components
//! of the bundler, ensuring consistency and avoiding circular dependencies.

use std::{borrow::Borrow, fmt, hash::BuildHasherDefault};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Type alias for FxHasher-based IndexSet
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Canonical identifier for one physical source file
///
/// The id is the file's path relative to the project root, with `/`
/// separators and no leading `./` (e.g. `src/util/math.js`). Every reference
/// to the same file resolves to the same id, which is what the graph and the
/// generated runtime key their maps on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory portion of the id, empty for modules at the project root
    pub fn dirname(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Extension including the dot, if the file name has one
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, f)| f);
        file_name
            .rfind('.')
            .filter(|&idx| idx > 0)
            .map(|idx| &file_name[idx..])
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
