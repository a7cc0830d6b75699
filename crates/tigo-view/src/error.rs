//! Error types for view composition.
//!
//! Two layers of errors exist:
//!
//! - [`ComposeError`]: what went wrong while resolving, compiling or executing
//!   templates. These are the kinds a caller matches on.
//! - [`ViewError`]: what the public [`ViewRender`](crate::ViewRender) returns.
//!   Render failures are wrapped with the template name and its resolved path
//!   so diagnostics point at a file on disk.

use std::io;
use std::path::PathBuf;

/// Failure while composing a view.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A target, master or eagerly bundled partial has no file under the root.
    #[error("template \"{name}\" not found at {}", path.display())]
    SourceNotFound {
        /// The template name that was requested
        name: String,
        /// Where the file was expected
        path: PathBuf,
    },

    /// The template file exists but is not valid template syntax.
    #[error("failed to parse template \"{name}\" ({}): {source}", path.display())]
    Parse {
        /// The template name being compiled
        name: String,
        /// The file that was read
        path: PathBuf,
        /// The syntax error reported by the engine
        source: minijinja::Error,
    },

    /// A partial was rendered more often than the per-call ceiling allows.
    #[error("render cycle detected: partial \"{name}\" rendered more than {limit} times")]
    CycleExceeded {
        /// The offending partial
        name: String,
        /// The ceiling that was exceeded
        limit: u32,
    },

    /// Partials nested deeper than the per-call ceiling, as in a cycle running
    /// through many different partials.
    #[error("render cycle detected: partial \"{name}\" nested more than {limit} levels deep")]
    NestingExceeded {
        /// The partial that would have exceeded the ceiling
        name: String,
        /// The nesting ceiling
        limit: usize,
    },

    /// Evaluating a compiled template against its data failed.
    #[error("template execution failed: {0}")]
    Execution(#[from] minijinja::Error),

    /// The data context could not be serialized.
    #[error("invalid data context: {0}")]
    Data(#[from] serde_json::Error),

    /// The name cannot map to a file inside the template root.
    #[error("invalid template name \"{name}\"")]
    InvalidName {
        /// The rejected name
        name: String,
    },

    /// Reading from the template root failed for a reason other than absence.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// The path being read
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },
}

/// Error returned by [`ViewRender`](crate::ViewRender).
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The configuration was rejected when building the renderer.
    #[error("invalid view configuration: {0}")]
    Config(String),

    /// Rendering the named template failed.
    #[error("render \"{name}\" ({}) failed: {source}", path.display())]
    Render {
        /// The template requested by the caller
        name: String,
        /// The file the name resolves to
        path: PathBuf,
        /// What went wrong
        source: ComposeError,
    },

    /// Listing the template root failed.
    #[error("failed to list templates: {0}")]
    Source(#[source] ComposeError),

    /// The composed output could not be written to the sink.
    #[error("failed to write rendered output: {0}")]
    Write(#[source] io::Error),
}

impl ViewError {
    /// Returns the composition failure behind a render or listing error, if any.
    pub fn compose_error(&self) -> Option<&ComposeError> {
        match self {
            ViewError::Render { source, .. } => Some(source),
            ViewError::Source(source) => Some(source),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for ViewError {
    fn from(err: serde_yaml::Error) -> Self {
        ViewError::Config(err.to_string())
    }
}
