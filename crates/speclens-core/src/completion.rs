//! Checkbox rewrites over a tasks document.
//!
//! Every function here takes the full document text and returns the full
//! document text. Only the targeted lines change; a task ID that does not
//! resolve leaves the input untouched.

use crate::syntax;
use crate::task::{parse_tasks, Task};
use std::collections::HashSet;

/// Set the completion marker on the task's own line.
pub fn set_completed(content: &str, task_id: &str, completed: bool) -> String {
    let doc = parse_tasks(content, "");
    let Some(task) = doc.find(task_id) else {
        tracing::debug!(task_id, "set_completed: task not found, leaving document unchanged");
        return content.to_string();
    };
    rewrite_lines(content, &[task.line_index], completed)
}

/// Set the completion marker on the task and every one of its subtasks.
///
/// A `###` heading without its own checkbox is left alone: its state is
/// derived from the subtasks.
pub fn set_completed_cascade(content: &str, task_id: &str, completed: bool) -> String {
    let doc = parse_tasks(content, "");
    let Some(task) = doc.find(task_id) else {
        tracing::debug!(task_id, "set_completed_cascade: task not found, leaving document unchanged");
        return content.to_string();
    };
    let targets = cascade_targets(content, task);
    rewrite_lines(content, &targets, completed)
}

/// Re-apply completion by task ID to a freshly generated document.
///
/// Tasks whose ID is in `completed_ids` and which parse as incomplete are
/// flipped to `[x]`. Nothing is ever flipped back.
pub fn apply_completed_ids(new_content: &str, completed_ids: &HashSet<String>) -> String {
    if completed_ids.is_empty() {
        return new_content.to_string();
    }
    let doc = parse_tasks(new_content, "");
    let targets: Vec<usize> = doc
        .tasks
        .iter()
        .filter(|t| !t.completed && completed_ids.contains(&t.id))
        .map(|t| t.line_index)
        .collect();
    if targets.is_empty() {
        return new_content.to_string();
    }
    tracing::debug!(restored = targets.len(), "restoring completion state after regenerate");
    rewrite_lines(new_content, &targets, true)
}

fn cascade_targets(content: &str, task: &Task) -> Vec<usize> {
    let lines = syntax::split_lines(content);
    let parent_line = lines.get(task.line_index).copied().unwrap_or("");
    let derived_heading =
        syntax::is_heading_line(parent_line) && !syntax::heading_has_checkbox(parent_line);

    let mut targets = Vec::with_capacity(task.sub_tasks.len() + 1);
    if !derived_heading {
        targets.push(task.line_index);
    }
    targets.extend(task.sub_tasks.iter().map(|s| s.line_index));
    targets
}

/// Rewrite the marker on each of `targets`, preserving every other byte.
fn rewrite_lines(content: &str, targets: &[usize], completed: bool) -> String {
    let targets: HashSet<usize> = targets.iter().copied().collect();
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if targets.contains(&i) {
                syntax::rewrite_marker(line, completed)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKBOX_DOC: &str = "\
# Tasks

- [ ] Set up project
  - [ ] Create repo
  - [x] Add CI
- [ ] Write docs
";

    const HEADING_DOC: &str = "\
### T1: Auth
- [ ] login
- [ ] logout

### - [ ] T2: Billing
- [ ] invoices
";

    #[test]
    fn unknown_id_is_identity() {
        assert_eq!(set_completed(CHECKBOX_DOC, "T99", true), CHECKBOX_DOC);
        assert_eq!(set_completed_cascade(CHECKBOX_DOC, "T99", true), CHECKBOX_DOC);
        assert_eq!(set_completed("", "T1", true), "");
    }

    #[test]
    fn set_completed_touches_only_the_task_line() {
        let out = set_completed(CHECKBOX_DOC, "T1", true);
        assert_eq!(
            out,
            "# Tasks\n\n- [x] Set up project\n  - [ ] Create repo\n  - [x] Add CI\n- [ ] Write docs\n"
        );
        let parsed = parse_tasks(&out, "s");
        assert!(parsed.find("T1").unwrap().completed);
    }

    #[test]
    fn set_completed_is_idempotent() {
        let once = set_completed(CHECKBOX_DOC, "T2", true);
        let twice = set_completed(&once, "T2", true);
        assert_eq!(once, twice);
    }

    #[test]
    fn set_completed_can_reopen() {
        let done = set_completed(CHECKBOX_DOC, "T2", true);
        assert_eq!(set_completed(&done, "T2", false), CHECKBOX_DOC);
    }

    #[test]
    fn every_task_round_trips() {
        let parsed = parse_tasks(CHECKBOX_DOC, "s");
        for task in &parsed.tasks {
            let out = set_completed(CHECKBOX_DOC, &task.id, true);
            assert!(parse_tasks(&out, "s").find(&task.id).unwrap().completed);
        }
    }

    #[test]
    fn cascade_on_checkbox_parent() {
        let out = set_completed_cascade(CHECKBOX_DOC, "T1", true);
        let task = parse_tasks(&out, "s").find("T1").cloned().unwrap();
        assert!(task.completed);
        assert!(task.sub_tasks.iter().all(|s| s.completed));
        assert!(out.ends_with("- [ ] Write docs\n"));
    }

    #[test]
    fn cascade_leaves_derived_heading_line_alone() {
        let out = set_completed_cascade(HEADING_DOC, "T1", true);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "### T1: Auth");
        assert_eq!(lines[1], "- [x] login");
        assert_eq!(lines[2], "- [x] logout");
        assert!(parse_tasks(&out, "s").find("T1").unwrap().completed);
    }

    #[test]
    fn cascade_rewrites_explicit_heading_checkbox() {
        let out = set_completed_cascade(HEADING_DOC, "T2", true);
        assert!(out.contains("### - [x] T2: Billing\n- [x] invoices"));
        let back = set_completed_cascade(&out, "T2", false);
        assert_eq!(back, HEADING_DOC);
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let doc = "- [ ] A\r\n- [ ] B\r\n";
        assert_eq!(set_completed(doc, "T2", true), "- [ ] A\r\n- [x] B\r\n");
    }

    #[test]
    fn apply_completed_ids_empty_set_is_verbatim() {
        let doc = "- [ ] odd\tspacing  \n\n";
        assert_eq!(apply_completed_ids(doc, &HashSet::new()), doc);
    }

    #[test]
    fn apply_completed_ids_restores_by_id() {
        let regenerated = "\
- [ ] <!-- task:b --> Second, now first
- [ ] <!-- task:a --> First, now second
- [x] <!-- task:c --> Already done
";
        let ids: HashSet<String> = ["a", "c", "zzz"].iter().map(|s| s.to_string()).collect();
        let out = apply_completed_ids(regenerated, &ids);
        assert_eq!(
            out,
            "- [ ] <!-- task:b --> Second, now first\n- [x] <!-- task:a --> First, now second\n- [x] <!-- task:c --> Already done\n"
        );
    }

    #[test]
    fn apply_completed_ids_on_heading_document() {
        let regenerated = "\
### - [ ] T1: Explicit heading
- [ ] first
### T2: Derived heading
- [ ] second
";
        let ids: HashSet<String> = ["T1", "T2"].iter().map(|s| s.to_string()).collect();
        let out = apply_completed_ids(regenerated, &ids);
        assert_eq!(
            out,
            "### - [x] T1: Explicit heading\n- [ ] first\n### T2: Derived heading\n- [ ] second\n"
        );

        let parsed = parse_tasks(&out, "s");
        assert!(parsed.find("T1").unwrap().completed);
        assert!(!parsed.find("T2").unwrap().completed);
    }
}
