//! Input file listing.

use std::path::{Path, PathBuf};

use crate::ConfigLoadError;

/// Lists the files in `dir` to process, sorted case-insensitively by name.
///
/// Hidden files and subdirectories are ignored. When `extension` is
/// given, only names ending with it (case-insensitive) are kept.
///
/// # Errors
///
/// Returns [`ConfigLoadError::Io`] if the directory cannot be listed.
pub fn list_input_files(
    dir: &Path,
    extension: Option<&str>,
) -> Result<Vec<PathBuf>, ConfigLoadError> {
    let io_err = |source| ConfigLoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let suffix = extension.map(str::to_ascii_lowercase);

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if suffix.as_ref().is_some_and(|s| !name.ends_with(s.as_str())) {
            continue;
        }

        files.push((name, path));
    }

    files.sort();
    log::info!("Found {} input file(s) in {}", files.len(), dir.display());

    Ok(files.into_iter().map(|(_, path)| path).collect())
}
