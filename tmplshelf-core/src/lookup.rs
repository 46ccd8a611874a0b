//! Resolve exactly one template from an id, a relative path, or a bare filename.

use crate::error::TemplateError;
use crate::index::{FileRecord, TemplateIndex, TEMPLATE_EXTENSION};
use crate::path::{normalize_dir, resolve, resolve_id};
use crate::query::in_dir;
use serde::Deserialize;
use std::path::Path;

/// Identifying parameters of a single-template request.
///
/// Tried in order: `id`, then `file` when it contains a separator, then
/// `file` or `filename` as a bare name narrowed by `dir`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupRequest {
    pub id: Option<String>,
    pub file: Option<String>,
    pub filename: Option<String>,
    pub dir: Option<String>,
}

impl LookupRequest {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_file(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Default::default()
        }
    }

    pub fn by_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn looks_like_path(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}

/// Resolve one record from `index`.
pub fn lookup<'a>(index: &'a TemplateIndex, req: &LookupRequest) -> crate::Result<&'a FileRecord> {
    if let Some(id) = present(&req.id) {
        let resolved = resolve_id(index.root(), id)?;
        return index
            .get(&resolved.relative)
            .ok_or_else(|| TemplateError::NotFound(format!("id {id}")));
    }

    let file = present(&req.file);
    if let Some(path) = file.filter(|f| looks_like_path(f)) {
        let resolved = resolve(index.root(), path)?;
        return index
            .get(&resolved.relative)
            .ok_or_else(|| TemplateError::NotFound(path.to_string()));
    }

    match file.or_else(|| present(&req.filename)) {
        Some(name) => by_name(index, name, present(&req.dir)),
        None => Err(TemplateError::MissingIdentifier),
    }
}

fn by_name<'a>(
    index: &'a TemplateIndex,
    name: &str,
    dir: Option<&str>,
) -> crate::Result<&'a FileRecord> {
    let wanted = name.to_lowercase();
    let with_extension = Path::new(&wanted)
        .extension()
        .is_none()
        .then(|| format!("{wanted}.{TEMPLATE_EXTENSION}"));
    let dir = dir.map(normalize_dir).filter(|d| !d.is_empty());

    let candidates: Vec<&FileRecord> = index
        .records()
        .iter()
        .filter(|r| {
            let lower = r.name.to_lowercase();
            lower == wanted || with_extension.as_deref() == Some(lower.as_str())
        })
        .filter(|r| dir.as_deref().map_or(true, |d| in_dir(r, d)))
        .collect();

    match candidates.as_slice() {
        [] => Err(TemplateError::NotFound(name.to_string())),
        [only] => Ok(*only),
        many => Err(TemplateError::Ambiguous {
            name: name.to_string(),
            matches: many.iter().map(|r| r.relative_path.clone()).collect(),
        }),
    }
}
