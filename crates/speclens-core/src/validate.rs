use crate::syntax;
use crate::types::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Zero-based line index.
    pub line: usize,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    fn error(line: usize, message: String) -> Self {
        Self {
            line,
            message,
            severity: Severity::Error,
        }
    }

    fn warning(line: usize, message: String) -> Self {
        Self {
            line,
            message,
            severity: Severity::Warning,
        }
    }
}

/// Diagnose structural problems in a tasks document.
///
/// Issues come back in line order; within a line, in the order: invalid
/// checkbox marker, duplicate task ID, malformed requires comment, unclosed
/// comment. Nothing is fixed.
pub fn validate_tasks(content: &str) -> Vec<ValidationIssue> {
    let lines = syntax::split_lines(content);
    let start = syntax::body_start(&lines);

    let mut issues = Vec::new();
    let mut seen_ids: HashMap<String, usize> = HashMap::new();

    for (i, line) in lines.iter().enumerate().skip(start) {
        if let Some(caps) = syntax::any_marker_re().captures(line) {
            let mark = &caps[1];
            if !matches!(mark, "x" | "X" | " ") {
                issues.push(ValidationIssue::error(
                    i,
                    format!("Invalid checkbox marker '[{mark}]': use '[ ]' or '[x]'"),
                ));
            }
        }

        for caps in syntax::task_id_comment_re().captures_iter(line) {
            let id = caps[1].to_string();
            match seen_ids.get(&id) {
                Some(first) => issues.push(ValidationIssue::error(
                    i,
                    format!(
                        "Duplicate task ID '{id}' (first defined on line {})",
                        first + 1
                    ),
                )),
                None => {
                    seen_ids.insert(id, i);
                }
            }
        }

        for caps in syntax::malformed_requires_re().captures_iter(line) {
            let value = caps[1].trim();
            issues.push(ValidationIssue::warning(
                i,
                format!("Malformed requires comment: use '<!-- requires:{value} -->'"),
            ));
        }

        let opens = line.matches("<!--").count();
        let closes = line.matches("-->").count();
        if opens > closes {
            issues.push(ValidationIssue::error(
                i,
                "Unclosed HTML comment: add '-->' on the same line".to_string(),
            ));
        }
    }

    issues
}

/// Error and warning counts over a set of issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl ValidationSummary {
    pub fn of(issues: &[ValidationIssue]) -> Self {
        issues.iter().fold(Self::default(), |mut acc, issue| {
            match issue.severity {
                Severity::Error => acc.errors += 1,
                Severity::Warning => acc.warnings += 1,
            }
            acc
        })
    }

    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_marker() {
        let issues = validate_tasks("- [?] Some task");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 0);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("[?]"));
        assert!(issues[0].message.contains("[ ]") && issues[0].message.contains("[x]"));
    }

    #[test]
    fn valid_markers_pass() {
        let doc = "- [ ] a\n- [x] b\n  - [X] c\n### - [ ] d\n- plain [?] text";
        assert!(validate_tasks(doc).is_empty());
    }

    #[test]
    fn invalid_marker_on_heading_task() {
        let issues = validate_tasks("### T1: Setup\n### - [?] T2: Ship");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("'[?]'"));
    }

    #[test]
    fn duplicate_task_id() {
        let issues = validate_tasks("- [ ] <!-- task:T1 --> A\n- [ ] <!-- task:T1 --> B");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("'T1'"));
        assert!(issues[0].message.contains("line 1"));
    }

    #[test]
    fn malformed_requires_comment() {
        let issues = validate_tasks("- [ ] Login <!-- requires : R1,R2 -->");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("<!-- requires:R1,R2 -->"));

        assert!(validate_tasks("- [ ] Login <!-- requires:R1 -->").is_empty());
        assert_eq!(validate_tasks("<!-- require : R1 -->").len(), 1);
    }

    #[test]
    fn unclosed_comment() {
        let issues = validate_tasks("- [ ] A <!-- task:T1");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(issues[0].message.contains("Unclosed"));
    }

    #[test]
    fn multiple_issues_on_one_line_keep_rule_order() {
        let doc = "- [ ] <!-- task:A --> x\n- [-] <!-- task:A --> <!-- requires : R1 --> <!--";
        let issues = validate_tasks(doc);
        let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![1, 1, 1, 1]);
        assert!(issues[0].message.starts_with("Invalid checkbox"));
        assert!(issues[1].message.starts_with("Duplicate task ID"));
        assert!(issues[2].message.starts_with("Malformed requires"));
        assert!(issues[3].message.starts_with("Unclosed"));
    }

    #[test]
    fn frontmatter_is_not_validated() {
        let doc = "---\nnote: - [?] <!--\n---\n- [ ] fine";
        assert!(validate_tasks(doc).is_empty());
    }

    #[test]
    fn summary_counts() {
        let issues = validate_tasks("- [?] a\n<!-- requires : R1 -->");
        let summary = ValidationSummary::of(&issues);
        assert_eq!(summary, ValidationSummary { errors: 1, warnings: 1 });
        assert!(!summary.is_clean());
        assert!(ValidationSummary::of(&[]).is_clean());
    }
}
