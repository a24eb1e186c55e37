//! Directory-tree traversal with a per-file callback.
//!
//! Files are discovered with `walkdir`, filtered to the configured extensions, then handed to
//! the callback, in parallel once there are at least `parallel_threshold` of them. A callback
//! error is recorded against its file and never stops the other files.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::{config::GraphConfig, error::GraphCacheError, parallel};

#[derive(Debug, Default)]
pub struct TraversalReport {
    pub files_visited: usize,
    /// Callback errors plus entries that could not be read during the walk.
    pub failures: Vec<GraphCacheError>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Lists matching files below `root`, sorted by path. Unreadable entries below the root are
/// returned as failures; an unreadable root is an error.
pub fn matching_files(
    root: &Path,
    config: &GraphConfig,
) -> Result<(Vec<PathBuf>, Vec<GraphCacheError>), GraphCacheError> {
    let mut failures = Vec::new();
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| config.include_hidden || e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && config.matches_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) if e.depth() == 0 => {
                return Err(GraphCacheError::Build(format!(
                    "cannot read root folder {root:?}: {e}"
                )));
            }
            Err(e) => {
                tracing::warn!("[traverse] skipping unreadable entry: {e}");
                failures.push(e.into());
            }
        }
    }
    files.sort();
    Ok((files, failures))
}

pub fn for_each_file<F>(
    root: &Path,
    config: &GraphConfig,
    callback: F,
) -> Result<TraversalReport, GraphCacheError>
where
    F: Fn(&Path) -> Result<(), GraphCacheError> + Sync + Send,
{
    let (files, mut failures) = matching_files(root, config)?;
    tracing::debug!("[traverse] {} matching files under {:?}", files.len(), root);
    let results = parallel::map(&files, config.parallel_threshold(), |path| callback(path));
    failures.extend(results.into_iter().filter_map(Result::err));
    Ok(TraversalReport {
        files_visited: files.len(),
        failures,
    })
}
