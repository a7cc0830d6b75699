//! Compiled artifact cache.
//!
//! An [`Artifact`] is a MiniJinja environment holding one compilation unit: the
//! target template plus every configured eager partial, with the function
//! registry installed. Artifacts are immutable once built; a refresh replaces
//! the whole entry.
//!
//! # Locking
//!
//! Lookups take a shared lock. Compilation runs without any lock and the result
//! is inserted under the exclusive lock, so concurrent misses for the same name
//! may compile twice. The last insert wins; both results are identical because
//! compilation only depends on file contents.
//!
//! A failed compilation never touches the map.
//!
//! # Development Mode
//!
//! With caching disabled every lookup recompiles from disk, so template edits
//! show up on the next render.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};

use crate::error::ComposeError;
use crate::functions::FunctionRegistry;
use crate::source::TemplateSource;

/// One compiled unit of templates.
pub struct Artifact {
    env: Environment<'static>,
    names: Vec<String>,
}

impl Artifact {
    /// Template names compiled into this unit, target first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub(crate) fn environment(&self) -> &Environment<'static> {
        &self.env
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

/// Settings shared by every compilation.
#[derive(Debug)]
pub(crate) struct CompileOptions {
    pub source: TemplateSource,
    pub partials: Vec<String>,
    pub registry: FunctionRegistry,
    pub strict_undefined: bool,
}

/// Thread-safe map from template name to compiled artifact.
#[derive(Debug)]
pub struct ArtifactCache {
    entries: RwLock<HashMap<String, Arc<Artifact>>>,
    options: CompileOptions,
    disabled: bool,
}

impl ArtifactCache {
    pub(crate) fn new(options: CompileOptions, disabled: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            options,
            disabled,
        }
    }

    /// Returns the cached artifact for `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<Artifact>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).cloned()
    }

    /// Stores `artifact` under `name`, replacing any previous entry.
    pub fn put(&self, name: &str, artifact: Arc<Artifact>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(name.to_string(), artifact);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry; the next render of each name recompiles.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the artifact for `name`, compiling it on a miss or when caching
    /// is disabled.
    ///
    /// # Errors
    ///
    /// Propagates [`ComposeError::SourceNotFound`], [`ComposeError::Parse`] and
    /// friends from compilation; the cache is left unchanged.
    pub fn load(&self, name: &str) -> Result<Arc<Artifact>, ComposeError> {
        if !self.disabled {
            if let Some(artifact) = self.get(name) {
                tracing::debug!("artifact cache hit for \"{}\"", name);
                return Ok(artifact);
            }
        }

        tracing::debug!(
            "compiling \"{}\" (cache {})",
            name,
            if self.disabled { "disabled" } else { "miss" }
        );
        let artifact = Arc::new(self.compile(name)?);
        self.put(name, Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Builds the compilation unit for `name` from disk.
    pub fn compile(&self, name: &str) -> Result<Artifact, ComposeError> {
        let options = &self.options;
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(if options.strict_undefined {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        });
        let escape = auto_escape_for(options.source.extension());
        env.set_auto_escape_callback(move |_| escape.clone());
        options.registry.install(&mut env);

        let mut names: Vec<String> = Vec::with_capacity(1 + options.partials.len());
        let unit = std::iter::once(name).chain(options.partials.iter().map(String::as_str));
        for unit_name in unit {
            if names.iter().any(|n| n == unit_name) {
                continue;
            }
            let (path, content) = options.source.read(unit_name)?;
            env.add_template_owned(unit_name.to_string(), content)
                .map_err(|e| ComposeError::Parse {
                    name: unit_name.to_string(),
                    path,
                    source: e,
                })?;
            names.push(unit_name.to_string());
        }

        Ok(Artifact { env, names })
    }
}

/// HTML-like extensions escape interpolated values; everything else is raw.
fn auto_escape_for(extension: &str) -> AutoEscape {
    match extension.to_ascii_lowercase().as_str() {
        ".html" | ".htm" | ".xml" => AutoEscape::Html,
        _ => AutoEscape::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_template_file;
    use std::path::Path;
    use tempfile::TempDir;

    fn cache(dir: &Path, partials: &[&str], disabled: bool) -> ArtifactCache {
        let options = CompileOptions {
            source: TemplateSource::new(dir, ".html"),
            partials: partials.iter().map(|s| s.to_string()).collect(),
            registry: FunctionRegistry::base(),
            strict_undefined: true,
        };
        ArtifactCache::new(options, disabled)
    }

    #[test]
    fn test_compile_bundles_partials() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "PAGE");
        create_template_file(dir.path(), "head.html", "HEAD");
        create_template_file(dir.path(), "foot.html", "FOOT");

        let cache = cache(dir.path(), &["head", "foot", "page"], false);
        let artifact = cache.compile("page").unwrap();
        assert_eq!(artifact.names(), &["page", "head", "foot"]);
        assert!(artifact.contains("foot"));
        assert!(artifact.environment().get_template("head").is_ok());
    }

    #[test]
    fn test_missing_eager_partial_fails() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "PAGE");

        let cache = cache(dir.path(), &["head"], false);
        match cache.load("page") {
            Err(ComposeError::SourceNotFound { name, .. }) => assert_eq!(name, "head"),
            other => panic!("expected missing partial, got {:?}", other),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_parse_error_leaves_cache_unchanged() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "{{ unclosed");

        let cache = cache(dir.path(), &[], false);
        assert!(matches!(
            cache.load("page"),
            Err(ComposeError::Parse { .. })
        ));
        assert!(!cache.contains("page"));
    }

    #[test]
    fn test_load_reuses_entry() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "v1");

        let cache = cache(dir.path(), &[], false);
        let first = cache.load("page").unwrap();
        create_template_file(dir.path(), "page.html", "v2");
        let second = cache.load("page").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disabled_cache_recompiles() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "v1");

        let cache = cache(dir.path(), &[], true);
        let first = cache.load("page").unwrap();
        let second = cache.load("page").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failed_refresh_keeps_stale_entry() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "v1");

        let cache = cache(dir.path(), &[], true);
        let first = cache.load("page").unwrap();
        create_template_file(dir.path(), "page.html", "{% if %}");
        assert!(cache.load("page").is_err());
        let kept = cache.get("page").unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        create_template_file(dir.path(), "page.html", "x");

        let cache = cache(dir.path(), &[], false);
        cache.load("page").unwrap();
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_auto_escape_for_extension() {
        assert!(matches!(auto_escape_for(".html"), AutoEscape::Html));
        assert!(matches!(auto_escape_for(".HTM"), AutoEscape::Html));
        assert!(matches!(auto_escape_for(".txt"), AutoEscape::None));
    }
}
