//! Line-level markdown conventions shared by the parser, the validator and
//! the completion mutator.

use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static FILES_RE: OnceLock<Regex> = OnceLock::new();
static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_TASK_RE: OnceLock<Regex> = OnceLock::new();
static TASK_ID_COMMENT_RE: OnceLock<Regex> = OnceLock::new();
static BOLD_ID_RE: OnceLock<Regex> = OnceLock::new();
static BARE_ID_RE: OnceLock<Regex> = OnceLock::new();
static REQUIRES_RE: OnceLock<Regex> = OnceLock::new();
static MALFORMED_REQUIRES_RE: OnceLock<Regex> = OnceLock::new();
static ANY_MARKER_RE: OnceLock<Regex> = OnceLock::new();
static MARKER_RE: OnceLock<Regex> = OnceLock::new();
static BULLET_RE: OnceLock<Regex> = OnceLock::new();

fn files_re() -> &'static Regex {
    FILES_RE.get_or_init(|| Regex::new(r"^\s*<!--\s*files:\s*(.*?)\s*-->").unwrap())
}

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| Regex::new(r"^(\s*)- \[([ xX])\](?:\s+(.*))?$").unwrap())
}

fn heading_task_re() -> &'static Regex {
    HEADING_TASK_RE.get_or_init(|| {
        Regex::new(r"^###[ \t]+(?:-[ \t]+\[([ xX])\](?:[ \t]+|$))?(.*)$").unwrap()
    })
}

pub(crate) fn task_id_comment_re() -> &'static Regex {
    TASK_ID_COMMENT_RE
        .get_or_init(|| Regex::new(r"<!--\s*task:\s*([^\s>]+?)\s*-->").unwrap())
}

fn bold_id_re() -> &'static Regex {
    BOLD_ID_RE.get_or_init(|| Regex::new(r"^\s*\*\*([^*\s]+)\*\*(?::[ \t]*|\s+)").unwrap())
}

fn bare_id_re() -> &'static Regex {
    BARE_ID_RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z0-9][\w.\-]*):\s+").unwrap())
}

fn requires_re() -> &'static Regex {
    REQUIRES_RE.get_or_init(|| Regex::new(r"<!--\s*requires?:\s*(.*?)\s*-->").unwrap())
}

pub(crate) fn malformed_requires_re() -> &'static Regex {
    MALFORMED_REQUIRES_RE
        .get_or_init(|| Regex::new(r"<!--\s*requires?\s+:\s*(.*?)\s*-->").unwrap())
}

/// `- [c]` with any single character, at the start of a line or right after
/// a `###` heading marker.
pub(crate) fn any_marker_re() -> &'static Regex {
    ANY_MARKER_RE
        .get_or_init(|| Regex::new(r"^\s*(?:###[ \t]+)?- \[([^\]])\]").unwrap())
}

fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| Regex::new(r"\[[ xX]\]").unwrap())
}

fn bullet_re() -> &'static Regex {
    BULLET_RE.get_or_init(|| Regex::new(r"^[-*](?:\s|$)").unwrap())
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Split `content` into lines with a trailing `\r` removed from each.
///
/// Splits on `\n` only, so indices line up with the mutator's rewrite.
pub fn split_lines(content: &str) -> Vec<&str> {
    content
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Index of the first body line after YAML frontmatter.
///
/// Frontmatter opens only with a `---` line at index 0 and closes at the next
/// `---` line, inclusive. An unclosed block runs to the end of the document.
pub fn body_start(lines: &[&str]) -> usize {
    if lines.first().map(|l| *l == "---") != Some(true) {
        return 0;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, l)| **l == "---")
        .map(|(i, _)| i + 1)
        .unwrap_or(lines.len())
}

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// The style of the task currently absorbing subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentStyle {
    Plain,
    Heading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    FilesDirective(&'a str),
    Subtask {
        completed: bool,
        title: &'a str,
    },
    HeadingTask {
        checkbox: Option<bool>,
        text: &'a str,
    },
    CheckboxTask {
        completed: bool,
        text: &'a str,
    },
    /// Anything else. `closes` is false for blank lines, headings,
    /// blockquotes, HTML comments and plain bullets.
    Other {
        closes: bool,
    },
}

/// Classify one line given the style of the open parent, if any.
pub fn classify(line: &str, open: Option<ParentStyle>) -> LineKind<'_> {
    if let Some(caps) = files_re().captures(line) {
        let glob = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        return LineKind::FilesDirective(glob);
    }

    let checkbox = checkbox_re().captures(line).map(|caps| {
        let indent = caps.get(1).map(|m| indent_width(m.as_str())).unwrap_or(0);
        let completed = is_checked(&caps[2]);
        let text = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
        (indent, completed, text)
    });

    if let (Some((indent, completed, title)), Some(ParentStyle::Plain)) = (checkbox, open) {
        if indent >= 2 {
            return LineKind::Subtask { completed, title };
        }
    }

    let trimmed = line.trim_start();
    if let Some(caps) = heading_task_re().captures(trimmed) {
        let text = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        if !text.is_empty() {
            let checkbox = caps.get(1).map(|m| is_checked(m.as_str()));
            return LineKind::HeadingTask { checkbox, text };
        }
    }

    if let Some((_, completed, text)) = checkbox {
        if !text.is_empty() {
            return match open {
                Some(ParentStyle::Heading) => LineKind::Subtask {
                    completed,
                    title: text,
                },
                _ => LineKind::CheckboxTask { completed, text },
            };
        }
    }

    LineKind::Other {
        closes: closes_task(trimmed),
    }
}

fn closes_task(trimmed: &str) -> bool {
    !(trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with('>')
        || trimmed.starts_with("<!--")
        || bullet_re().is_match(trimmed))
}

fn indent_width(indent: &str) -> usize {
    indent.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

fn is_checked(mark: &str) -> bool {
    mark == "x" || mark == "X"
}

/// True when the trimmed line is a `###` task heading carrying its own
/// `- [ ]` / `- [x]` checkbox.
pub fn heading_has_checkbox(line: &str) -> bool {
    heading_task_re()
        .captures(line.trim_start())
        .map(|caps| caps.get(1).is_some())
        .unwrap_or(false)
}

/// True when the trimmed line starts with `###`.
pub fn is_heading_line(line: &str) -> bool {
    line.trim_start().starts_with("###")
}

// ---------------------------------------------------------------------------
// Title markup
// ---------------------------------------------------------------------------

/// Pull an explicit task ID out of `text`, returning it with the matched
/// markup removed from the text. `allow_bare` enables the `T1: Title` form
/// used by heading tasks.
pub fn take_task_id(text: &str, allow_bare: bool) -> Option<(String, String)> {
    if let Some(caps) = task_id_comment_re().captures(text) {
        let m = caps.get(0)?;
        return Some((caps[1].to_string(), remove_range(text, m)));
    }
    if let Some(caps) = bold_id_re().captures(text) {
        let m = caps.get(0)?;
        return Some((caps[1].to_string(), remove_range(text, m)));
    }
    if allow_bare {
        if let Some(caps) = bare_id_re().captures(text) {
            let m = caps.get(0)?;
            return Some((caps[1].to_string(), remove_range(text, m)));
        }
    }
    None
}

/// Pull a `<!-- requires:... -->` value out of `text`, returning the raw
/// value and the text with the comment removed.
pub fn take_requires(text: &str) -> Option<(String, String)> {
    let caps = requires_re().captures(text)?;
    let m = caps.get(0)?;
    Some((caps[1].to_string(), remove_range(text, m)))
}

fn remove_range(text: &str, m: regex::Match<'_>) -> String {
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..m.start()]);
    out.push_str(&text[m.end()..]);
    out
}

// ---------------------------------------------------------------------------
// Marker rewriting
// ---------------------------------------------------------------------------

/// Replace the first `[ ]` / `[x]` / `[X]` in `line` with the marker for
/// `completed`. Lines without a marker come back unchanged.
pub fn rewrite_marker(line: &str, completed: bool) -> String {
    let marker = if completed { "[x]" } else { "[ ]" };
    marker_re().replacen(line, 1, marker).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_is_skipped() {
        let lines = split_lines("---\ntitle: x\n---\n- [ ] A");
        assert_eq!(body_start(&lines), 3);
        let lines = split_lines("- [ ] A\n---\n");
        assert_eq!(body_start(&lines), 0);
        let lines = split_lines("---\nnever closed");
        assert_eq!(body_start(&lines), 2);
    }

    #[test]
    fn split_strips_carriage_returns() {
        assert_eq!(split_lines("a\r\nb\r\n"), vec!["a", "b", ""]);
    }

    #[test]
    fn classify_files_directive() {
        assert_eq!(
            classify("<!-- files:  src/**/*.rs  -->", None),
            LineKind::FilesDirective("src/**/*.rs")
        );
    }

    #[test]
    fn indented_checkbox_is_subtask_only_under_plain_parent() {
        let line = "  - [x] Sub";
        assert_eq!(
            classify(line, Some(ParentStyle::Plain)),
            LineKind::Subtask {
                completed: true,
                title: "Sub"
            }
        );
        assert_eq!(
            classify(line, None),
            LineKind::CheckboxTask {
                completed: true,
                text: "Sub"
            }
        );
    }

    #[test]
    fn flat_checkbox_under_heading_is_subtask() {
        assert_eq!(
            classify("- [ ] step", Some(ParentStyle::Heading)),
            LineKind::Subtask {
                completed: false,
                title: "step"
            }
        );
    }

    #[test]
    fn heading_task_with_and_without_checkbox() {
        assert_eq!(
            classify("### - [X] T2: Build", None),
            LineKind::HeadingTask {
                checkbox: Some(true),
                text: "T2: Build"
            }
        );
        assert_eq!(
            classify("### Setup", Some(ParentStyle::Plain)),
            LineKind::HeadingTask {
                checkbox: None,
                text: "Setup"
            }
        );
        assert_eq!(classify("#### Deeper", None), LineKind::Other { closes: false });
    }

    #[test]
    fn closing_rules() {
        for line in ["", "## Phase", "> quote", "<!-- note -->", "- bullet", "* star"] {
            assert_eq!(classify(line, None), LineKind::Other { closes: false }, "{line}");
        }
        assert_eq!(classify("Some prose", None), LineKind::Other { closes: true });
        assert_eq!(classify("**bold**", None), LineKind::Other { closes: true });
    }

    #[test]
    fn task_id_precedence() {
        let (id, rest) = take_task_id("**1.2**: Do <!-- task:X9 --> it", true).unwrap();
        assert_eq!(id, "X9");
        assert_eq!(rest, "**1.2**: Do  it");

        let (id, rest) = take_task_id("**1.2**: Do it", true).unwrap();
        assert_eq!((id.as_str(), rest.as_str()), ("1.2", "Do it"));

        assert!(take_task_id("T1: Title", false).is_none());
        let (id, rest) = take_task_id("T1: Title", true).unwrap();
        assert_eq!((id.as_str(), rest.as_str()), ("T1", "Title"));
    }

    #[test]
    fn requires_comment_is_removed() {
        let (value, rest) = take_requires("Login <!-- requires:R1, R2 -->").unwrap();
        assert_eq!(value, "R1, R2");
        assert_eq!(rest.trim(), "Login");
        assert!(take_requires("Login <!-- requires : R1 -->").is_none());
    }

    #[test]
    fn rewrite_first_marker_only() {
        assert_eq!(rewrite_marker("- [ ] a [ ] b", true), "- [x] a [ ] b");
        assert_eq!(rewrite_marker("  - [X] a\r", false), "  - [ ] a\r");
        assert_eq!(rewrite_marker("### Heading", true), "### Heading");
    }
}
