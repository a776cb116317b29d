//! Source discovery for requested directories.
//!
//! Directories are walked recursively, following symlinks, and every file an
//! adapter handles is collected. Noise directories and user excludes are
//! pruned with gitignore-style patterns.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/", ".hg/", ".svn/", "__pycache__/", ".mypy_cache/", ".pytest_cache/", ".tox/",
    ".nox/", "venv/", ".venv/", "*.egg-info/", "node_modules/", "target/",
];

pub struct SourceFilter {
    inner: Gitignore,
}

impl SourceFilter {
    pub fn new(root: &Path, excludes: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        builder.add(root.join(".gitignore"));

        for pattern in DEFAULT_EXCLUDES {
            builder.add_line(None, pattern).ok();
        }
        for pattern in excludes {
            if let Err(e) = builder.add_line(None, pattern) {
                tracing::warn!("Ignoring exclude pattern {}: {}", pattern, e);
            }
        }

        Self {
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}

/// Files under `dir` with one of `extensions`, sorted by path.
pub fn source_files(dir: &Path, extensions: &[&str], excludes: &[String]) -> Vec<PathBuf> {
    let filter = SourceFilter::new(dir, excludes);
    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !filter.is_excluded(entry.path(), is_dir)
        })
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.contains(&ext))
        })
        .collect();
    files.sort();
    files
}
