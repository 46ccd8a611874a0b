//! In-memory template index

mod file_discovery;

pub use file_discovery::{FileDiscovery, TEMPLATE_EXTENSION};

use crate::config::IndexConfig;
use crate::generation::Generation;
use crate::path::encode_id;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// One indexed template file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub relative_path: String,
    /// Only used for I/O, never sent to clients.
    #[serde(skip)]
    pub absolute_path: PathBuf,
    pub size: u64,
    pub mtime_ms: u64,
    pub category: String,
}

impl FileRecord {
    /// Build a record for `relative_path` (already `/`-separated) under `root`.
    pub fn new(root: &Path, relative_path: &str, size: u64, mtime_ms: u64) -> Self {
        let mut segments = relative_path.split('/');
        let first = segments.next().unwrap_or_default();
        let name = relative_path.rsplit('/').next().unwrap_or_default();
        let category = if segments.next().is_some() { first } else { "" };

        Self {
            id: encode_id(relative_path),
            name: name.to_string(),
            relative_path: relative_path.to_string(),
            absolute_path: relative_path
                .split('/')
                .fold(root.to_path_buf(), |acc, p| acc.join(p)),
            size,
            mtime_ms,
            category: category.to_string(),
        }
    }
}

/// A published, immutable snapshot of the templates tree.
///
/// Records are sorted by `relative_path` and unique on it. A rebuild makes a
/// new `TemplateIndex`; nothing mutates one after [`TemplateIndex::build`].
#[derive(Debug)]
pub struct TemplateIndex {
    root: PathBuf,
    generation: Generation,
    indexed_at: String,
    records: Vec<FileRecord>,
    by_path: HashMap<String, usize>,
}

impl TemplateIndex {
    /// Walk `config.root` and build a fresh index stamped with `generation`.
    pub fn build(config: &IndexConfig, generation: Generation) -> crate::Result<Self> {
        let start = Instant::now();
        let discovery = FileDiscovery::new(config)?;
        let files = discovery.walk_files()?;
        let root = discovery.root();

        let records: Vec<FileRecord> = files
            .par_iter()
            .filter_map(|path| stat_record(root, path))
            .collect();

        let index = Self::from_records(root.to_path_buf(), generation, records);
        tracing::info!(
            root = %index.root.display(),
            templates = index.len(),
            generation = %generation,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "template index built"
        );
        Ok(index)
    }

    /// Assemble an index from records in any order.
    pub fn from_records(
        root: PathBuf,
        generation: Generation,
        mut records: Vec<FileRecord>,
    ) -> Self {
        records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        records.dedup_by(|a, b| a.relative_path == b.relative_path);

        let by_path = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.relative_path.clone(), i))
            .collect();

        Self {
            root,
            generation,
            indexed_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            records,
            by_path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn indexed_at(&self) -> &str {
        &self.indexed_at
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact lookup by `/`-separated relative path.
    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.by_path.get(relative_path).map(|&i| &self.records[i])
    }
}

fn stat_record(root: &Path, path: &Path) -> Option<FileRecord> {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => return None,
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        match component.as_os_str().to_str() {
            Some(part) => parts.push(part),
            None => {
                tracing::warn!(path = %path.display(), "skipping non UTF-8 path");
                return None;
            }
        }
    }
    let relative_path = parts.join("/");

    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "skipping unreadable file");
            return None;
        }
    };
    let mtime_ms = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Some(FileRecord::new(root, &relative_path, meta.len(), mtime_ms))
}
