//! Fixtures shared by the unit tests.

use std::io::Write;
use std::path::Path;

/// Writes `content` to `relative_path` under `dir`, creating parent directories.
pub(crate) fn create_template_file(dir: &Path, relative_path: &str, content: &str) {
    let full_path = dir.join(relative_path);
    if let Some(parent) = full_path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = std::fs::File::create(&full_path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}
