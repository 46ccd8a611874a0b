//! Error types for template operations

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Invalid template id: {0}")]
    InvalidId(String),

    #[error("Path escapes the templates root: {0}")]
    InvalidPath(String),

    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Filename '{name}' matches {} templates; pass dir or id to pick one", .matches.len())]
    Ambiguous { name: String, matches: Vec<String> },

    #[error("Provide one of id, file or filename")]
    MissingIdentifier,

    #[error("Failed to index {}: {message}", .root.display())]
    IndexBuild { root: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),
}

impl TemplateError {
    /// Stable machine-readable code, used as the `error` field of HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "invalid_id",
            Self::InvalidPath(_) => "invalid_path",
            Self::NotFound(_) => "not_found",
            Self::Ambiguous { .. } => "ambiguous",
            Self::MissingIdentifier => "missing_identifier",
            Self::IndexBuild { .. } => "index_build_failed",
            Self::Io(_) => "io_error",
            Self::ConfigParse(_) => "config_parse",
        }
    }

    /// True for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidId(_)
                | Self::InvalidPath(_)
                | Self::NotFound(_)
                | Self::Ambiguous { .. }
                | Self::MissingIdentifier
        )
    }
}
