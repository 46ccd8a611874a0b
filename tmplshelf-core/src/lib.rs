//! tmplshelf core - indexing and ranked search over JSON templates
//!
//! This library scans a directory tree of `.json` templates into a flat,
//! sorted index and answers free-text queries and single-file lookups
//! against it. Every path that comes from outside is confined to the
//! indexed root by [`path::resolve`].

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod lookup;
pub mod normalize;
pub mod path;
pub mod query;
pub mod scoring;

pub use config::Config;
pub use error::TemplateError;
pub use generation::Generation;
pub use index::{FileRecord, TemplateIndex};
pub use lookup::{lookup, LookupRequest};
pub use query::{search, MatchMode, Page, PageRequest, SearchParams, SearchResult};

/// Result type alias for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
