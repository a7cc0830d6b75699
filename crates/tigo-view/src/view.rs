//! The public renderer.
//!
//! [`ViewRender`] is what request handlers call. It is cheap to clone and safe
//! to share between threads; clones share one artifact cache.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde::Serialize;
//! use tigo_view::{ViewConfig, ViewRender};
//!
//! #[derive(Serialize)]
//! struct Page {
//!     title: String,
//! }
//!
//! let views = ViewRender::new(ViewConfig::new().with_root("views"))?;
//!
//! let mut out = Vec::new();
//! views.render(&mut out, "admin/page", &Page { title: "Users".into() })?;
//! # Ok::<(), tigo_view::ViewError>(())
//! ```
//!
//! Output is buffered until the whole composition succeeds and then written
//! in one call, so a failed render writes nothing.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::ArtifactCache;
use crate::composer::Composer;
use crate::config::ViewConfig;
use crate::error::{ComposeError, ViewError};
use crate::functions::FunctionRegistry;
use crate::invocation::data_context;

/// Renders file-based views with layouts and partials.
#[derive(Debug, Clone)]
pub struct ViewRender {
    composer: Arc<Composer>,
}

impl ViewRender {
    /// Creates a renderer. No files are read until the first render or
    /// [`preload`](Self::preload).
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Config`] for an empty extension, names that escape
    /// the root, or custom functions using a reserved name.
    pub fn new(config: ViewConfig) -> Result<Self, ViewError> {
        let config = config.validated()?;
        let registry = FunctionRegistry::merged(&config.functions)?;
        tracing::debug!(
            "view render rooted at {} ({}), master \"{}\", {} function(s)",
            config.root.display(),
            config.extension,
            config.master,
            registry.len()
        );
        Ok(Self {
            composer: Arc::new(Composer::new(config, registry)),
        })
    }

    /// Renders `name` wrapped in its layout and writes the result to `out`.
    ///
    /// The layout is the one the view selects with `layout(...)`, otherwise the
    /// configured master. Without either, this matches [`render_file`](Self::render_file).
    pub fn render<W, T>(&self, out: &mut W, name: &str, data: &T) -> Result<(), ViewError>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let output = self.render_to_string(name, data)?;
        out.write_all(output.as_bytes()).map_err(ViewError::Write)
    }

    /// Renders `name` without any layout and writes the result to `out`.
    pub fn render_file<W, T>(&self, out: &mut W, name: &str, data: &T) -> Result<(), ViewError>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let output = self.render_file_to_string(name, data)?;
        out.write_all(output.as_bytes()).map_err(ViewError::Write)
    }

    /// Like [`render`](Self::render), returning the output.
    pub fn render_to_string<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
    ) -> Result<String, ViewError> {
        tracing::debug!("render \"{}\"", name);
        data_context(data)
            .and_then(|context| self.composer.render_with_master(name, context))
            .map_err(|e| self.wrap(name, e))
    }

    /// Like [`render_file`](Self::render_file), returning the output.
    pub fn render_file_to_string<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
    ) -> Result<String, ViewError> {
        tracing::debug!("render file \"{}\"", name);
        data_context(data)
            .and_then(|context| self.composer.render_file(name, context))
            .map_err(|e| self.wrap(name, e))
    }

    /// Compiles every template under the root into the cache.
    ///
    /// Useful at startup to surface missing partials and syntax errors before
    /// the first request. Returns the number of templates compiled.
    pub fn preload(&self) -> Result<usize, ViewError> {
        let root = self.composer.source().root();
        if !root.is_dir() {
            return Err(ViewError::Config(format!(
                "view root {} is not a directory",
                root.display()
            )));
        }

        let names = self.template_names()?;
        for name in &names {
            self.composer
                .cache()
                .load(name)
                .map_err(|e| self.wrap(name, e))?;
        }
        tracing::debug!("preloaded {} template(s)", names.len());
        Ok(names.len())
    }

    /// Lists the template names available under the root.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Source`] wrapping [`ComposeError::Io`] when the
    /// root cannot be read.
    pub fn template_names(&self) -> Result<Vec<String>, ViewError> {
        self.composer.source().walk().map_err(ViewError::Source)
    }

    /// Forgets every compiled artifact.
    pub fn clear_cache(&self) {
        self.composer.cache().clear();
    }

    /// Number of compiled artifacts currently cached.
    pub fn cached_count(&self) -> usize {
        self.composer.cache().len()
    }

    /// The artifact cache shared by this renderer and its clones.
    pub fn cache(&self) -> &ArtifactCache {
        self.composer.cache()
    }

    pub fn root(&self) -> &std::path::Path {
        self.composer.source().root()
    }

    pub fn extension(&self) -> &str {
        self.composer.source().extension()
    }

    pub fn master(&self) -> &str {
        self.composer.master()
    }

    fn wrap(&self, name: &str, source: ComposeError) -> ViewError {
        tracing::debug!("render \"{}\" failed: {}", name, source);
        ViewError::Render {
            name: name.to_string(),
            path: self.composer.source().path_for(name),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_template_file;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_render_writes_to_sink() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "Hello {{ name }}");

        let views = ViewRender::new(ViewConfig::new().with_root(dir.path())).unwrap();
        let mut out = Vec::new();
        views
            .render(&mut out, "page", &serde_json::json!({"name": "tigo"}))
            .unwrap();
        assert_eq!(out, b"Hello tigo");
    }

    #[test]
    fn test_failed_render_writes_nothing() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "{{ render('a') }}{{ missing_field }}");
        create_template_file(dir.path(), "a.html", "PARTIAL");

        let views = ViewRender::new(ViewConfig::new().with_root(dir.path())).unwrap();
        let mut out = Vec::new();
        let err = views.render(&mut out, "page", &()).unwrap_err();
        assert!(out.is_empty());
        assert!(matches!(err.compose_error(), Some(ComposeError::Execution(_))));
    }

    #[test]
    fn test_error_wraps_template_path() {
        let dir = TempDir::new().unwrap();
        let views = ViewRender::new(ViewConfig::new().with_root(dir.path())).unwrap();

        match views.render_file_to_string("admin/missing", &()) {
            Err(ViewError::Render { name, path, source }) => {
                assert_eq!(name, "admin/missing");
                assert!(path.ends_with(Path::new("admin").join("missing.html")));
                assert!(matches!(source, ComposeError::SourceNotFound { .. }));
            }
            other => panic!("expected render error, got {:?}", other),
        }
    }

    #[test]
    fn test_preload_compiles_every_template() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "a.html", "A");
        create_template_file(dir.path(), "nested/b.html", "B");
        create_template_file(dir.path(), "ignored.txt", "{{ broken");

        let views = ViewRender::new(ViewConfig::new().with_root(dir.path())).unwrap();
        assert_eq!(views.preload().unwrap(), 2);
        assert_eq!(views.cached_count(), 2);

        views.clear_cache();
        assert_eq!(views.cached_count(), 0);
    }

    #[test]
    fn test_preload_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "bad.html", "{% for %}");

        let views = ViewRender::new(ViewConfig::new().with_root(dir.path())).unwrap();
        let err = views.preload().unwrap_err();
        assert!(matches!(err.compose_error(), Some(ComposeError::Parse { .. })));
    }

    #[test]
    fn test_preload_requires_directory() {
        let views =
            ViewRender::new(ViewConfig::new().with_root("/nonexistent/path/that/does/not/exist"))
                .unwrap();
        assert!(matches!(views.preload(), Err(ViewError::Config(_))));
    }

    #[test]
    fn test_template_names_reports_unreadable_root() {
        let views =
            ViewRender::new(ViewConfig::new().with_root("/nonexistent/path/that/does/not/exist"))
                .unwrap();
        let err = views.template_names().unwrap_err();
        assert!(matches!(err, ViewError::Source(_)));
        assert!(matches!(err.compose_error(), Some(ComposeError::Io { .. })));
    }

    #[test]
    fn test_accessors() {
        let views = ViewRender::new(
            ViewConfig::new()
                .with_root("templates")
                .with_extension("tpl")
                .with_master("layout"),
        )
        .unwrap();
        assert_eq!(views.root(), Path::new("templates"));
        assert_eq!(views.extension(), ".tpl");
        assert_eq!(views.master(), "layout");
    }
}
