use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DocumentKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Requirements,
    Design,
    Tasks,
}

impl DocumentKind {
    pub fn all() -> &'static [DocumentKind] {
        &[
            DocumentKind::Requirements,
            DocumentKind::Design,
            DocumentKind::Tasks,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Requirements => "requirements",
            DocumentKind::Design => "design",
            DocumentKind::Tasks => "tasks",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            DocumentKind::Requirements => "requirements.md",
            DocumentKind::Design => "design.md",
            DocumentKind::Tasks => "tasks.md",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = crate::error::SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requirements" => Ok(DocumentKind::Requirements),
            "design" => Ok(DocumentKind::Design),
            "tasks" => Ok(DocumentKind::Tasks),
            _ => Err(crate::error::SpecError::InvalidDocumentKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LinkStrategy
// ---------------------------------------------------------------------------

/// Which cross-reference tier produced a link, from most to least confident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    Explicit,
    Mention,
    Inferred,
}

impl LinkStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkStrategy::Explicit => "explicit",
            LinkStrategy::Mention => "mention",
            LinkStrategy::Inferred => "inferred",
        }
    }
}

impl fmt::Display for LinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn document_kind_parse_and_filename() {
        for kind in DocumentKind::all() {
            let parsed = DocumentKind::from_str(kind.as_str()).unwrap();
            assert_eq!(parsed, *kind);
        }
        assert_eq!(DocumentKind::Tasks.filename(), "tasks.md");
        assert!(DocumentKind::from_str("qa_plan").is_err());
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn link_strategy_orders_by_confidence() {
        assert!(LinkStrategy::Explicit < LinkStrategy::Mention);
        assert!(LinkStrategy::Mention < LinkStrategy::Inferred);
    }
}
