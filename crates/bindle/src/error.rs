//! Error types for the bundling core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for bundling operations.
pub type Result<T, E = BundleError> = std::result::Result<T, E>;

/// Every way a compile run can fail.
///
/// None of these are recovered from inside the core: the first error aborts
/// the run and is surfaced to the caller unchanged.
#[derive(Error, Debug)]
pub enum BundleError {
    /// A specifier does not map to a loadable source file
    #[error("cannot resolve '{specifier}' from '{importer}': {reason}")]
    Resolution {
        specifier: String,
        importer: String,
        reason: String,
    },

    /// Source is not valid module syntax
    #[error("{module}:{line}:{column}: {message}")]
    Parse {
        module: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A transform is unknown or failed
    #[error("transform '{name}' failed on '{module}': {message}")]
    Transform {
        name: String,
        module: String,
        message: String,
    },

    /// Source unreadable or output unwritable
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A hook handler registered by a plugin failed
    #[error("plugin '{plugin}' failed in hook '{hook}': {message}")]
    Plugin {
        hook: &'static str,
        plugin: String,
        message: String,
    },
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a parse error, translating a byte offset into a 1-based line and column
    pub(crate) fn parse(
        module: impl Into<String>,
        source: &str,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        let (line, column) = line_column(source, offset);
        Self::Parse {
            module: module.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before, |idx| &before[idx + 1..])
        .chars()
        .count()
        + 1;
    (line, column)
}
