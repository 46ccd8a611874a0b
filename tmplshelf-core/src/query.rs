//! Search over a template index: filter, match, rank, paginate.

use crate::config::QueryConfig;
use crate::index::{FileRecord, TemplateIndex};
use crate::normalize::{query_tokens, strongest_token};
use crate::path::normalize_dir;
use crate::scoring::{NormalizedFields, RecordScorer};
use serde::{Deserialize, Serialize};

/// How multiple query tokens combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// A record matches if any token matches (OR)
    #[default]
    Any,
    /// A record matches only if every token matches (AND)
    All,
}

impl MatchMode {
    /// Lenient parse: `all` in any case selects [`MatchMode::All`], anything else is `Any`.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Any
        }
    }
}

/// Raw pagination input. Values are signed so out-of-range input clamps
/// instead of failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub page: Option<i64>,
}

/// Effective pagination window after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    pub fn new(limit: Option<i64>, offset: Option<i64>, page: Option<i64>) -> Self {
        Self {
            limit,
            offset,
            page,
        }
    }

    /// Clamp limit to `[1, max_limit]`, offset to `>= 0`. Without an explicit
    /// offset, `page` (1-based) selects `(page - 1) * limit`.
    pub fn resolve(&self, config: &QueryConfig) -> Page {
        let max_limit = config.max_limit.max(1) as i64;
        let limit = self
            .limit
            .map(|l| l.clamp(1, max_limit))
            .unwrap_or(config.default_limit as i64)
            .clamp(1, max_limit);

        let offset = match (self.offset, self.page) {
            (Some(offset), _) => offset.max(0),
            (None, Some(page)) => (page.max(1) - 1).saturating_mul(limit),
            (None, None) => 0,
        };

        Page {
            limit: limit as usize,
            offset: offset as usize,
        }
    }
}

/// Parameters for one search call
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub dir: Option<String>,
    pub mode: MatchMode,
    pub page: PageRequest,
}

/// One page of ranked search results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub total: usize,
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simplified_to: Option<String>,
    pub items: Vec<FileRecord>,
}

/// Run a search against one index snapshot.
pub fn search(index: &TemplateIndex, params: &SearchParams, config: &QueryConfig) -> SearchResult {
    let dir = params
        .dir
        .as_deref()
        .map(normalize_dir)
        .filter(|d| !d.is_empty());

    let filtered: Vec<&FileRecord> = match dir.as_deref() {
        Some(dir) => index
            .records()
            .iter()
            .filter(|r| in_dir(r, dir))
            .collect(),
        None => index.records().iter().collect(),
    };

    let tokens = params
        .query
        .as_deref()
        .map(query_tokens)
        .unwrap_or_default();

    let mut simplified_to = None;
    let ranked: Vec<&FileRecord> = if tokens.is_empty() {
        filtered
    } else {
        let candidates: Vec<(&FileRecord, NormalizedFields)> = filtered
            .into_iter()
            .map(|r| (r, NormalizedFields::of(r)))
            .collect();

        let mut active = tokens.clone();
        let mut matched = matching(&candidates, &active, params.mode);

        if matched.is_empty() && active.len() > 1 {
            if let Some(strongest) = strongest_token(&active).map(str::to_string) {
                active = vec![strongest.clone()];
                matched = matching(&candidates, &active, params.mode);
                simplified_to = Some(strongest);
            }
        }

        let scorer = RecordScorer::new(&active, dir.as_deref());
        let mut scored: Vec<(u32, &FileRecord)> = matched
            .into_iter()
            .map(|(record, fields)| (scorer.score(record, fields), record))
            .collect();
        // Stable: equal scores keep index order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, record)| record).collect()
    };

    let page = params.page.resolve(config);
    let total = ranked.len();
    let items: Vec<FileRecord> = ranked
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect();

    tracing::debug!(
        query = params.query.as_deref().unwrap_or(""),
        dir = dir.as_deref().unwrap_or(""),
        ?tokens,
        ?simplified_to,
        total,
        "search"
    );

    SearchResult {
        total,
        count: items.len(),
        limit: page.limit,
        offset: page.offset,
        tokens,
        simplified_to,
        items,
    }
}

/// Directory filter: exact category, or a relative path below `dir`.
pub fn in_dir(record: &FileRecord, dir: &str) -> bool {
    record.category == dir
        || record
            .relative_path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn matching<'r, 'c>(
    candidates: &'c [(&'r FileRecord, NormalizedFields)],
    tokens: &[String],
    mode: MatchMode,
) -> Vec<(&'r FileRecord, &'c NormalizedFields)> {
    candidates
        .iter()
        .filter(|(_, fields)| fields.matches(tokens, mode))
        .map(|(record, fields)| (*record, fields))
        .collect()
}
