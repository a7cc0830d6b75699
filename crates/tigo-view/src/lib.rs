//! # Tigo View - Layouts, Content and Partials for File-Based Views
//!
//! `tigo-view` renders named templates from a directory, composing a view with
//! an optional layout and any number of partials into a single output.
//!
//! ## Core Concepts
//!
//! - [`ViewRender`]: the renderer request handlers call (`render` / `render_file`)
//! - [`ViewConfig`]: root directory, extension, default master, eager partials,
//!   custom functions and development mode
//! - [`ArtifactCache`]: compiled templates shared by concurrent renders
//! - [`FunctionRegistry`]: composition functions merged with your own
//!
//! ## Template Names
//!
//! A template's name is its path under the root without the extension. With root
//! `views` and extension `.html`, `"admin/page"` is `views/admin/page.html`.
//!
//! ## Composition Functions
//!
//! Templates are MiniJinja. Every template can call:
//!
//! | Call | Effect |
//! |------|--------|
//! | `{{ layout("master") }}` | Wrap this view in `master` (alias `master(...)`) |
//! | `{{ content() }}` | In a layout: the wrapped view's output |
//! | `{{ render("part") }}` | Render `part` here (alias `include(...)`); missing partials render nothing |
//!
//! A partial may be rendered at most [`CYCLE_LIMIT`] times per render call, which
//! stops self-referencing partials with [`ComposeError::CycleExceeded`]. Partials
//! may also nest at most [`NESTING_LIMIT`] deep, so a cycle through many
//! partials ends in [`ComposeError::NestingExceeded`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::fs;
//! use tigo_view::{ViewConfig, ViewRender};
//!
//! let dir = tempfile::tempdir().unwrap();
//! fs::write(dir.path().join("master.html"), "HEADER{{ content() }}FOOTER").unwrap();
//! fs::write(dir.path().join("page.html"), "{{ layout(\"master\") }}BODY").unwrap();
//!
//! let views = ViewRender::new(ViewConfig::new().with_root(dir.path())).unwrap();
//!
//! let mut out = Vec::new();
//! views.render(&mut out, "page", &()).unwrap();
//! assert_eq!(out, b"HEADERBODYFOOTER");
//!
//! let mut out = Vec::new();
//! views.render_file(&mut out, "page", &()).unwrap();
//! assert_eq!(out, b"BODY");
//! ```
//!
//! ## Development Mode
//!
//! With [`ViewConfig::disable_cache`] every render recompiles from disk, so
//! edits to template files show up immediately. Otherwise each template is
//! compiled once and reused.

mod cache;
mod composer;
pub mod config;
mod error;
pub mod functions;
mod invocation;
pub mod prelude;
pub mod source;
#[cfg(test)]
mod test_support;
mod view;

pub use cache::{Artifact, ArtifactCache};
pub use config::{ViewConfig, DEFAULT_EXTENSION, DEFAULT_ROOT};
pub use error::{ComposeError, ViewError};
pub use functions::{FunctionRegistry, COMPOSITION_FUNCTIONS};
pub use invocation::{CYCLE_LIMIT, DATA_KEY, NESTING_LIMIT};
pub use source::{template_name, TemplateSource};
pub use view::ViewRender;
