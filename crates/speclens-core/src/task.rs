use crate::requirement::{extract_requirement_ids, parse_requires_list};
use crate::syntax::{self, LineKind, ParentStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub title: String,
    pub completed: bool,
    pub line_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub spec_name: String,
    pub line_index: usize,
    pub sub_tasks: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_ids: Option<Vec<String>>,
}

/// Result of parsing a tasks document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDocument {
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_glob: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub total: usize,
    pub completed: usize,
}

impl TaskProgress {
    pub fn of(tasks: &[Task]) -> Self {
        Self {
            total: tasks.len(),
            completed: tasks.iter().filter(|t| t.completed).count(),
        }
    }

    /// Whole-number completion percentage; 0 for an empty document.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).round() as u32
    }
}

impl std::fmt::Display for TaskProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} tasks complete ({}%)",
            self.completed,
            self.total,
            self.percent()
        )
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ParseState {
    tasks: Vec<Task>,
    open: Option<(usize, ParentStyle)>,
    counter: usize,
    file_glob: Option<String>,
}

impl ParseState {
    fn step(mut self, index: usize, line: &str, spec_name: &str) -> Self {
        match syntax::classify(line, self.open.map(|(_, style)| style)) {
            LineKind::FilesDirective(glob) => {
                self.file_glob = Some(glob.to_string());
            }
            LineKind::Subtask { completed, title } => {
                if let Some((parent, _)) = self.open {
                    self.tasks[parent].sub_tasks.push(SubTask {
                        title: title.to_string(),
                        completed,
                        line_index: index,
                    });
                }
            }
            LineKind::HeadingTask { checkbox, text } => {
                self.counter += 1;
                let task = build_task(
                    text,
                    checkbox.unwrap_or(false),
                    true,
                    self.counter,
                    index,
                    spec_name,
                );
                self.tasks.push(task);
                self.open = Some((self.tasks.len() - 1, ParentStyle::Heading));
            }
            LineKind::CheckboxTask { completed, text } => {
                self.counter += 1;
                let task = build_task(text, completed, false, self.counter, index, spec_name);
                self.tasks.push(task);
                self.open = Some((self.tasks.len() - 1, ParentStyle::Plain));
            }
            LineKind::Other { closes } => {
                if closes {
                    self.open = None;
                }
            }
        }
        self
    }
}

fn build_task(
    text: &str,
    completed: bool,
    heading: bool,
    counter: usize,
    line_index: usize,
    spec_name: &str,
) -> Task {
    let (id, rest) = syntax::take_task_id(text, heading)
        .unwrap_or_else(|| (format!("T{counter}"), text.to_string()));

    let (requirement_ids, title) = match syntax::take_requires(&rest) {
        Some((value, stripped)) => (parse_requires_list(&value), stripped),
        None => (extract_requirement_ids(&rest), rest),
    };

    Task {
        id,
        title: title.trim().to_string(),
        completed,
        spec_name: spec_name.to_string(),
        line_index,
        sub_tasks: Vec::new(),
        requirement_ids: (!requirement_ids.is_empty()).then_some(requirement_ids),
    }
}

/// Parse a tasks document into its task hierarchy.
///
/// Never fails: lines that match no convention are ignored.
pub fn parse_tasks(content: &str, spec_name: &str) -> TaskDocument {
    let lines = syntax::split_lines(content);
    let start = syntax::body_start(&lines);

    let state = lines
        .iter()
        .enumerate()
        .skip(start)
        .fold(ParseState::default(), |state, (i, line)| {
            state.step(i, line, spec_name)
        });

    let mut tasks = state.tasks;
    derive_heading_completion(&mut tasks, &lines);

    TaskDocument {
        tasks,
        file_glob: state.file_glob,
    }
}

/// Heading tasks without their own checkbox are complete exactly when every
/// subtask is.
fn derive_heading_completion(tasks: &mut [Task], lines: &[&str]) {
    for task in tasks.iter_mut() {
        let Some(line) = lines.get(task.line_index) else {
            continue;
        };
        if syntax::is_heading_line(line)
            && !syntax::heading_has_checkbox(line)
            && !task.sub_tasks.is_empty()
        {
            task.completed = task.sub_tasks.iter().all(|s| s.completed);
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl TaskDocument {
    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn progress(&self) -> TaskProgress {
        TaskProgress::of(&self.tasks)
    }

    /// The first task in document order that is not yet complete.
    pub fn next_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| !t.completed)
    }

    pub fn completed_ids(&self) -> HashSet<String> {
        self.tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
