//! Template ids and root-confined path resolution.
//!
//! Ids are the record's relative path in URL-safe base64 without padding,
//! so they are reversible and need no lookup table. Any path derived from a
//! request goes through [`resolve`] before it touches the filesystem.

use crate::error::TemplateError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use std::path::{Component, Path, PathBuf};

/// Encodes without padding, decodes with or without it.
const ID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Canonical separator for relative paths stored in the index.
pub const SEPARATOR: char = '/';

/// A request path that passed the containment check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// `/`-joined path below the root; empty for the root itself.
    pub relative: String,
    pub absolute: PathBuf,
}

/// Encode a relative path into an opaque, URL-safe id.
pub fn encode_id(relative_path: &str) -> String {
    ID_ENGINE.encode(relative_path.as_bytes())
}

/// Decode an id produced by [`encode_id`].
pub fn decode_id(id: &str) -> crate::Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(TemplateError::InvalidId("empty id".to_string()));
    }

    let bytes = ID_ENGINE
        .decode(id)
        .map_err(|e| TemplateError::InvalidId(format!("{id}: {e}")))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|_| TemplateError::InvalidId(format!("{id}: not valid UTF-8")))?;

    if decoded.is_empty() || decoded.contains('\0') {
        return Err(TemplateError::InvalidId(id.to_string()));
    }
    Ok(decoded)
}

/// Join `relative` onto `root`, rejecting anything that would leave it.
///
/// Normalization is lexical: `.` is dropped, `..` pops a component, and
/// backslashes count as separators. Absolute paths, drive prefixes and any
/// `..` that climbs above the root are `InvalidPath`.
pub fn resolve(root: &Path, relative: &str) -> crate::Result<ResolvedPath> {
    if relative.contains('\0') {
        return Err(TemplateError::InvalidPath(relative.replace('\0', "\\0")));
    }

    let unified = relative.replace('\\', "/");
    let mut parts: Vec<String> = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(TemplateError::InvalidPath(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(TemplateError::InvalidPath(relative.to_string()));
            }
        }
    }

    // A leading "C:" is a drive on Windows but a normal component elsewhere.
    if parts
        .first()
        .is_some_and(|first| first.len() == 2 && first.ends_with(':'))
    {
        return Err(TemplateError::InvalidPath(relative.to_string()));
    }

    let absolute = parts.iter().fold(root.to_path_buf(), |acc, p| acc.join(p));
    Ok(ResolvedPath {
        relative: parts.join("/"),
        absolute,
    })
}

/// Decode an id and resolve it against `root` in one step.
pub fn resolve_id(root: &Path, id: &str) -> crate::Result<ResolvedPath> {
    let relative = decode_id(id)?;
    resolve(root, &relative)
}

/// Normalize a user-supplied directory filter: trim, unify separators and
/// strip leading/trailing slashes. Empty means "no filter".
pub fn normalize_dir(dir: &str) -> String {
    dir.trim()
        .replace('\\', "/")
        .trim_matches(SEPARATOR)
        .to_string()
}
