//! Query tokenization and canonicalization.
//!
//! A raw query becomes a short list of lower-case, accent-free tokens:
//! punctuation is deleted, known abbreviations are mapped to the name
//! used in template files, and filler words (English and Portuguese) are
//! dropped. Record fields go through [`fold`] so both sides compare equal.

use std::collections::HashSet;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Abbreviation -> canonical vocabulary. Keys and values are already folded.
const SYNONYMS: &[(&str, &str)] = &[
    ("wa", "whatsapp"),
    ("wpp", "whatsapp"),
    ("zap", "whatsapp"),
    ("zapzap", "whatsapp"),
    ("tg", "telegram"),
    ("gpt", "openai"),
    ("chatgpt", "openai"),
    ("gsheets", "sheets"),
    ("gsheet", "sheets"),
    ("planilha", "sheets"),
    ("planilhas", "sheets"),
    ("gdrive", "drive"),
    ("gcal", "calendar"),
    ("agenda", "calendar"),
    ("yt", "youtube"),
    ("ig", "instagram"),
    ("insta", "instagram"),
    ("fb", "facebook"),
    ("correio", "email"),
    ("pg", "postgres"),
    ("postgresql", "postgres"),
    ("sf", "salesforce"),
    ("hs", "hubspot"),
];

/// Articles, prepositions and generic task words.
const STOPWORDS: &[&str] = &[
    // en
    "a", "an", "the", "of", "for", "to", "in", "on", "at", "by", "with", "from", "into",
    "and", "or", "my", "your", "using", "use", "via", "how", "what", "template", "templates",
    "workflow", "workflows", "flow", "flows", "automation", "automations", "automate",
    "example", "examples", "create", "make", "build", "json",
    // pt
    "o", "os", "as", "um", "uma", "uns", "umas", "de", "da", "do", "das", "dos", "para",
    "pra", "com", "sem", "e", "ou", "em", "no", "na", "nos", "nas", "por", "pelo", "pela",
    "meu", "minha", "como", "que", "usando", "modelo", "modelos", "fluxo", "fluxos",
    "automacao", "automacoes", "automatizar", "exemplo", "exemplos", "criar", "fazer",
];

/// Generic brand/product words, dropped only when a query is over-broad.
const SOFT_STOPWORDS: &[&str] = &[
    "n8n", "google", "api", "apis", "app", "apps", "bot", "bots", "ai", "ia", "node",
    "nodes", "integration", "integrations", "integracao", "integracoes", "webhook", "http",
    "online", "cloud", "tool", "tools", "ferramenta",
];

/// Queries with more tokens than this get their soft stopwords removed.
const BROAD_QUERY_TOKENS: usize = 2;

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn soft_stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| SOFT_STOPWORDS.iter().copied().collect())
}

/// Lower-case and strip diacritics ("Automação" -> "automacao").
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Delete everything but letters, digits and whitespace, then split on
/// whitespace. Punctuation inside a word joins it ("whats-app" -> "whatsapp").
pub fn tokenize(raw: &str) -> Vec<String> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().map(ToString::to_string).collect()
}

/// Fold a token and map it through the synonym table.
pub fn canonicalize(token: &str) -> String {
    let folded = fold(token);
    SYNONYMS
        .iter()
        .find(|(from, _)| *from == folded)
        .map(|(_, to)| to.to_string())
        .unwrap_or(folded)
}

pub fn is_stopword(token: &str) -> bool {
    stopwords().contains(token)
}

pub fn is_soft_stopword(token: &str) -> bool {
    soft_stopwords().contains(token)
}

/// Full pipeline: tokenize, canonicalize, drop stopwords, reduce broad queries.
///
/// Returns an empty list only when the query has no letters or digits.
pub fn query_tokens(raw: &str) -> Vec<String> {
    let canonical: Vec<String> = tokenize(raw).iter().map(|t| canonicalize(t)).collect();
    if canonical.is_empty() {
        return Vec::new();
    }

    let mut tokens = dedup(
        canonical
            .iter()
            .filter(|t| t.chars().count() > 1 && !is_stopword(t))
            .cloned(),
    );
    if tokens.is_empty() {
        tokens = dedup(canonical.into_iter());
    }

    if tokens.len() > BROAD_QUERY_TOKENS {
        let reduced: Vec<String> = tokens
            .iter()
            .filter(|t| !is_soft_stopword(t))
            .cloned()
            .collect();
        if !reduced.is_empty() {
            tokens = reduced;
        }
    }

    tokens
}

/// The single token most likely to carry the query's meaning.
pub fn strongest_token(tokens: &[String]) -> Option<&str> {
    tokens
        .iter()
        .find(|t| !is_soft_stopword(t))
        .or_else(|| tokens.first())
        .map(String::as_str)
}

fn dedup(tokens: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens.filter(|t| seen.insert(t.clone())).collect()
}
