//! Template files on disk.
//!
//! A [`TemplateSource`] maps template names to files under a root directory.
//! Names are the file's path relative to the root, with the extension removed
//! and separators normalised to `/`:
//!
//! | Root | Extension | File Path | Template Name |
//! |------|-----------|-----------|---------------|
//! | `views` | `.html` | `views/page.html` | `"page"` |
//! | `views` | `.html` | `views/admin/page.html` | `"admin/page"` |
//! | `views` | `.html` | `views/notes.txt` | (ignored) |

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::ComposeError;

/// A directory of template files filtered by extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    root: PathBuf,
    extension: String,
}

impl TemplateSource {
    /// Creates a source rooted at `root` selecting files ending in `extension`.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// The template root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file extension, including the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the file a template name resolves to.
    ///
    /// `"admin/page"` with root `views` and extension `.html` resolves to
    /// `views/admin/page.html`. The name is not validated; see [`read`](Self::read).
    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in name.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        let mut file_name = path.into_os_string();
        file_name.push(&self.extension);
        PathBuf::from(file_name)
    }

    /// Returns true if the template's file exists.
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path_for(name).is_file()
    }

    /// Reads the source text of a template.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::InvalidName`] for names that could leave the root
    /// - [`ComposeError::SourceNotFound`] when no file exists for the name
    /// - [`ComposeError::Io`] for any other read failure
    pub fn read(&self, name: &str) -> Result<(PathBuf, String), ComposeError> {
        validate_name(name)?;
        let path = self.path_for(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok((path, content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ComposeError::SourceNotFound {
                name: name.to_string(),
                path,
            }),
            Err(e) => Err(ComposeError::Io { path, source: e }),
        }
    }

    /// Lists every template name under the root, sorted.
    ///
    /// Files without the configured extension are skipped.
    pub fn walk(&self) -> Result<Vec<String>, ComposeError> {
        let mut names = Vec::new();
        walk_recursive(&self.root, &self.root, &self.extension, &mut names)?;
        names.sort();
        Ok(names)
    }
}

fn walk_recursive(
    current: &Path,
    root: &Path,
    extension: &str,
    names: &mut Vec<String>,
) -> Result<(), ComposeError> {
    let entries = std::fs::read_dir(current).map_err(|e| ComposeError::Io {
        path: current.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ComposeError::Io {
            path: current.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();

        if path.is_dir() {
            walk_recursive(&path, root, extension, names)?;
        } else if path.is_file() {
            if let Some(name) = template_name(root, &path, extension) {
                names.push(name);
            }
        }
    }

    Ok(())
}

/// Derives the template name of `path` relative to `root`.
///
/// Returns `None` if the file does not end in `extension` or is not under `root`.
pub fn template_name(root: &Path, path: &Path, extension: &str) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let joined = segments.join("/");
    let name = joined.strip_suffix(extension)?;
    if name.is_empty() || name.ends_with('/') {
        return None;
    }
    Some(name.to_string())
}

/// Rejects names that are empty, absolute, or step outside the root.
pub(crate) fn validate_name(name: &str) -> Result<(), ComposeError> {
    let invalid = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|s| s == ".." || s == ".")
        || Path::new(name).is_absolute();

    if invalid {
        return Err(ComposeError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
