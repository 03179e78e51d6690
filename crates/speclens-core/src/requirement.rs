//! Requirement identifier extraction and normalization.
//!
//! Requirement IDs show up in two shapes: prefixed (`REQ-1`, `FR-2.3`,
//! `NFR-10`, `AUTH-4`) and short (`R1`). Every ID is normalized before it is
//! compared or stored, so `req-01`, ` REQ-01: ` and `**REQ-01**` all key the
//! same requirement.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static ID_RE: OnceLock<Regex> = OnceLock::new();
static MENTION_RE: OnceLock<Regex> = OnceLock::new();
static EXACT_ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"(?i)\b([A-Z]+-\d+(?:\.\d+)*|R\d+)\b").unwrap())
}

fn mention_re() -> &'static Regex {
    MENTION_RE
        .get_or_init(|| Regex::new(r"(?i)\b((?:NFR|FR|REQ)-\d+(?:\.\d+)*|R\d+)\b").unwrap())
}

fn exact_id_re() -> &'static Regex {
    EXACT_ID_RE.get_or_init(|| Regex::new(r"(?i)^(?:[A-Z]+-\d+(?:\.\d+)*|R\d+)$").unwrap())
}

/// Canonical form of a requirement ID: surrounding whitespace, dashes,
/// asterisks and colons removed, letters upper-cased.
pub fn normalize_requirement_id(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '-' || c == '*' || c == ':' || c.is_whitespace())
        .to_uppercase()
}

/// True when `token` is, in its entirety, a requirement-shaped identifier.
pub fn is_requirement_id(token: &str) -> bool {
    exact_id_re().is_match(&normalize_requirement_id(token))
}

/// Every requirement-shaped token in `text`, normalized and deduplicated in
/// first-occurrence order.
pub fn extract_requirement_ids(text: &str) -> Vec<String> {
    collect_unique(id_re(), text)
}

/// The narrower set of tokens that read as a requirement reference in prose:
/// `REQ-`, `FR-`, `NFR-` prefixes and the short `R<n>` form.
pub fn extract_mentions(text: &str) -> Vec<String> {
    collect_unique(mention_re(), text)
}

/// Split a comma-separated `requires:` value into normalized IDs.
pub fn parse_requires_list(value: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    value
        .split(',')
        .map(normalize_requirement_id)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn collect_unique(re: &Regex, text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    re.captures_iter(text)
        .map(|caps| normalize_requirement_id(&caps[1]))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
