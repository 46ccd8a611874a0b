//! Record matching and relevance scoring for search results.

use crate::index::FileRecord;
use crate::normalize::fold;
use crate::query::MatchMode;

const NAME_WEIGHT: u32 = 5;
const PATH_WEIGHT: u32 = 3;
const CATEGORY_WEIGHT: u32 = 2;
const ALL_TOKENS_BONUS: u32 = 3;
const PHRASE_BONUS: u32 = 2;
const DIR_CATEGORY_BONUS: u32 = 4;
const DIR_PREFIX_BONUS: u32 = 3;

/// Folded copies of the searchable fields of one record.
#[derive(Debug, Clone)]
pub struct NormalizedFields {
    pub name: String,
    pub path: String,
    pub category: String,
}

impl NormalizedFields {
    pub fn of(record: &FileRecord) -> Self {
        Self {
            name: fold(&record.name),
            path: fold(&record.relative_path),
            category: fold(&record.category),
        }
    }

    fn hit(&self, token: &str) -> bool {
        self.name.contains(token) || self.path.contains(token) || self.category.contains(token)
    }

    /// Whether the record satisfies `tokens` under `mode`.
    pub fn matches(&self, tokens: &[String], mode: MatchMode) -> bool {
        match mode {
            MatchMode::Any => tokens.iter().any(|t| self.hit(t)),
            MatchMode::All => tokens.iter().all(|t| self.hit(t)),
        }
    }
}

/// Scores records against one query's tokens and optional directory filter.
pub struct RecordScorer<'a> {
    tokens: &'a [String],
    phrase: String,
    dir: Option<&'a str>,
}

impl<'a> RecordScorer<'a> {
    /// `dir` must already be normalized; `None` or empty means no filter.
    pub fn new(tokens: &'a [String], dir: Option<&'a str>) -> Self {
        Self {
            tokens,
            phrase: tokens.join(" "),
            dir: dir.filter(|d| !d.is_empty()),
        }
    }

    pub fn score(&self, record: &FileRecord, fields: &NormalizedFields) -> u32 {
        let mut score = 0;
        let mut all_hit = true;

        for token in self.tokens {
            let mut hit = false;
            if fields.name.contains(token.as_str()) {
                score += NAME_WEIGHT;
                hit = true;
            }
            if fields.path.contains(token.as_str()) {
                score += PATH_WEIGHT;
                hit = true;
            }
            if fields.category.contains(token.as_str()) {
                score += CATEGORY_WEIGHT;
                hit = true;
            }
            all_hit &= hit;
        }

        if !self.tokens.is_empty() && all_hit {
            score += ALL_TOKENS_BONUS;
        }
        if !self.phrase.is_empty() && fields.name.contains(&self.phrase) {
            score += PHRASE_BONUS;
        }

        if let Some(dir) = self.dir {
            if record.category == dir {
                score += DIR_CATEGORY_BONUS;
            }
            if record
                .relative_path
                .strip_prefix(dir)
                .is_some_and(|rest| rest.starts_with('/'))
            {
                score += DIR_PREFIX_BONUS;
            }
        }

        score
    }
}
