//! View configuration.
//!
//! [`ViewConfig`] is set once when a [`ViewRender`](crate::ViewRender) is built and
//! never changes afterwards. It can be assembled in code:
//!
//! ```rust
//! use tigo_view::ViewConfig;
//!
//! let config = ViewConfig::new()
//!     .with_root("views")
//!     .with_extension(".html")
//!     .with_master("layouts/master")
//!     .with_partial("shared/nav")
//!     .with_function("shout", |s: String| s.to_uppercase());
//! ```
//!
//! or loaded from YAML (custom functions are code-only):
//!
//! ```rust
//! use tigo_view::ViewConfig;
//!
//! let config = ViewConfig::from_yaml(r#"
//! root: views
//! extension: html
//! master: layouts/master
//! partials: [shared/nav]
//! disable_cache: true
//! "#).unwrap();
//! assert_eq!(config.root, std::path::PathBuf::from("views"));
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use serde::Deserialize;

use crate::error::ViewError;
use crate::source::validate_name;

/// Default template root directory.
pub const DEFAULT_ROOT: &str = "views";

/// Default template file extension.
pub const DEFAULT_EXTENSION: &str = ".html";

/// Settings for a [`ViewRender`](crate::ViewRender).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Directory holding the template files.
    pub root: PathBuf,

    /// File suffix selecting template files. A missing leading dot is added.
    pub extension: String,

    /// Default layout for [`ViewRender::render`](crate::ViewRender::render).
    /// Empty means no layout unless a template declares one.
    pub master: String,

    /// Templates compiled into every artifact alongside the target.
    pub partials: Vec<String>,

    /// Recompile from disk on every render.
    pub disable_cache: bool,

    /// Treat references to absent data fields as errors.
    pub strict_undefined: bool,

    #[serde(skip)]
    pub(crate) functions: BTreeMap<String, Value>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            extension: DEFAULT_EXTENSION.to_string(),
            master: String::new(),
            partials: Vec::new(),
            disable_cache: false,
            strict_undefined: true,
            functions: BTreeMap::new(),
        }
    }
}

impl ViewConfig {
    /// Creates a configuration with the defaults: root `views`, extension
    /// `.html`, no master, caching enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ViewError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_master(mut self, master: impl Into<String>) -> Self {
        self.master = master.into();
        self
    }

    /// Adds a template to bundle into every compilation.
    pub fn with_partial(mut self, partial: impl Into<String>) -> Self {
        self.partials.push(partial.into());
        self
    }

    /// Registers a function callable from every template.
    ///
    /// Composition function names (`content`, `layout`, `master`, `render`,
    /// `include`) are reserved; using one fails when the renderer is built.
    pub fn with_function<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.insert(name.into(), Value::from_function(f));
        self
    }

    /// Recompile templates from disk on every render (development mode).
    pub fn disable_cache(mut self, disable: bool) -> Self {
        self.disable_cache = disable;
        self
    }

    pub fn strict_undefined(mut self, strict: bool) -> Self {
        self.strict_undefined = strict;
        self
    }

    /// Names of the custom functions.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    /// Normalises the extension and rejects unusable names. Reserved function
    /// names are rejected by [`FunctionRegistry::merged`](crate::FunctionRegistry::merged).
    pub(crate) fn validated(mut self) -> Result<Self, ViewError> {
        if self.extension.is_empty() {
            return Err(ViewError::Config("extension must not be empty".into()));
        }
        if !self.extension.starts_with('.') {
            self.extension.insert(0, '.');
        }

        if !self.master.is_empty() {
            validate_name(&self.master)
                .map_err(|_| ViewError::Config(format!("invalid master name \"{}\"", self.master)))?;
        }

        for partial in &self.partials {
            validate_name(partial)
                .map_err(|_| ViewError::Config(format!("invalid partial name \"{}\"", partial)))?;
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewConfig::new();
        assert_eq!(config.root, PathBuf::from("views"));
        assert_eq!(config.extension, ".html");
        assert!(config.master.is_empty());
        assert!(config.partials.is_empty());
        assert!(!config.disable_cache);
        assert!(config.strict_undefined);
    }

    #[test]
    fn test_from_yaml_partial_keys() {
        let config = ViewConfig::from_yaml("master: layout\npartials: [head, foot]\n").unwrap();
        assert_eq!(config.master, "layout");
        assert_eq!(config.partials, vec!["head", "foot"]);
        assert_eq!(config.extension, ".html");
    }

    #[test]
    fn test_from_yaml_rejects_garbage() {
        let result = ViewConfig::from_yaml("partials: 12\n");
        assert!(matches!(result, Err(ViewError::Config(_))));
    }

    #[test]
    fn test_validated_adds_leading_dot() {
        let config = ViewConfig::new().with_extension("tpl").validated().unwrap();
        assert_eq!(config.extension, ".tpl");
    }

    #[test]
    fn test_validated_rejects_empty_extension() {
        let result = ViewConfig::new().with_extension("").validated();
        assert!(matches!(result, Err(ViewError::Config(_))));
    }

    #[test]
    fn test_validated_rejects_escaping_partial() {
        let result = ViewConfig::new().with_partial("../etc/passwd").validated();
        assert!(matches!(result, Err(ViewError::Config(_))));
    }

    #[test]
    fn test_function_names() {
        let config = ViewConfig::new()
            .with_function("upper", |s: String| s.to_uppercase())
            .with_function("lower", |s: String| s.to_lowercase());
        let names: Vec<&str> = config.function_names().collect();
        assert_eq!(names, vec!["lower", "upper"]);
    }
}
