//! bindle: a JavaScript module bundler
//!
//! Starting from an entry module, bindle discovers every module reachable
//! through `require`, `import` and `export ... from`, rewrites each one so its
//! references name canonical module ids, and renders the whole graph into a
//! single file that carries its own module registry and loader.

pub mod code_generator;
pub mod compiler;
pub mod config;
pub mod downlevel;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod graph_builder;
pub mod hooks;
pub mod lexer;
pub mod loader;
pub mod module_syntax;
pub mod plugin;
pub mod resolver;
pub mod types;

pub use compiler::{BuildOutput, Compiler};
pub use config::Config;
pub use error::{BundleError, Result};
