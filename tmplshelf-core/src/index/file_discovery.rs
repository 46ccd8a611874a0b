//! File discovery: walk the templates root with the ignore crate.

use crate::config::IndexConfig;
use crate::error::TemplateError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extension of the files we index, compared case-insensitively.
pub const TEMPLATE_EXTENSION: &str = "json";

/// Walker over the templates root honouring the configured exclusions.
pub struct FileDiscovery {
    root: PathBuf,
    exclude_dirs: Arc<HashSet<String>>,
    exclude_files: GlobSet,
}

impl FileDiscovery {
    pub fn new(config: &IndexConfig) -> crate::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclude_files {
            let glob = Glob::new(pattern).map_err(|e| TemplateError::IndexBuild {
                root: config.root.clone(),
                message: format!("bad exclude_files pattern '{pattern}': {e}"),
            })?;
            builder.add(glob);
        }
        let exclude_files = builder.build().map_err(|e| TemplateError::IndexBuild {
            root: config.root.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: config.root.clone(),
            exclude_dirs: Arc::new(config.exclude_dirs.iter().cloned().collect()),
            exclude_files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths of every template file below the root, in walk order.
    pub fn walk_files(&self) -> crate::Result<Vec<PathBuf>> {
        let meta = std::fs::metadata(&self.root).map_err(|e| TemplateError::IndexBuild {
            root: self.root.clone(),
            message: e.to_string(),
        })?;
        if !meta.is_dir() {
            return Err(TemplateError::IndexBuild {
                root: self.root.clone(),
                message: "not a directory".to_string(),
            });
        }

        let exclude_dirs = Arc::clone(&self.exclude_dirs);
        let mut builder = WalkBuilder::new(&self.root);
        // Only our own exclusions apply; hidden files and .gitignore are not special.
        builder.standard_filters(false);
        builder.follow_links(false);
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && exclude_dirs.contains(&*entry.file_name().to_string_lossy()))
        });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if !is_template(path) {
                continue;
            }
            if self.exclude_files.is_match(entry.file_name()) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        Ok(files)
    }
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
}
