//! Requirement <-> task cross-referencing.
//!
//! Links are resolved by three strategies tried in order, the first one
//! producing any result wins:
//!
//! 1. explicit: `requires:` comments and requirement IDs in task titles
//! 2. mention: requirement references anywhere in a task's text block
//! 3. inferred: significant-keyword overlap between a requirement and a task
//!
//! A [`TraceIndex`] is rebuilt from document text for every query batch and
//! holds no state beyond the documents it was built from.

use crate::requirement::{
    extract_mentions, extract_requirement_ids, is_requirement_id, normalize_requirement_id,
};
use crate::syntax;
use crate::task::{parse_tasks, Task};
use crate::types::LinkStrategy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

const REQUIREMENT_MIN_KEYWORD_LEN: usize = 5;
const REQUIREMENT_MAX_KEYWORDS: usize = 8;
const TASK_MIN_KEYWORD_LEN: usize = 4;
const TASK_MAX_KEYWORDS: usize = 6;
const MIN_OVERLAP: usize = 2;
const MIN_OVERLAP_RATIO: f64 = 0.4;

const REQUIREMENT_STOPWORDS: &[&str] = &[
    "about",
    "acceptance",
    "after",
    "allow",
    "allows",
    "before",
    "being",
    "could",
    "criteria",
    "every",
    "feature",
    "given",
    "implement",
    "implementation",
    "other",
    "provide",
    "provides",
    "requirement",
    "requirements",
    "shall",
    "should",
    "story",
    "support",
    "supports",
    "system",
    "tasks",
    "their",
    "there",
    "these",
    "those",
    "users",
    "using",
    "where",
    "which",
    "while",
    "would",
];

const TASK_STOPWORDS: &[&str] = &[
    "also",
    "create",
    "each",
    "ensure",
    "from",
    "have",
    "implement",
    "implementation",
    "into",
    "make",
    "should",
    "task",
    "tasks",
    "test",
    "tests",
    "that",
    "then",
    "this",
    "unit",
    "update",
    "using",
    "when",
    "with",
    "write",
];

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static BOLD_RE: OnceLock<Regex> = OnceLock::new();
static LEADING_ID_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^\s*#{1,6}\s+(\S+)\s*(.*)$").unwrap())
}

fn bold_re() -> &'static Regex {
    BOLD_RE.get_or_init(|| {
        Regex::new(r"\*\*\s*([A-Za-z]+-\d+(?:\.\d+)*|[Rr]\d+)\s*:?\s*\*\*:?").unwrap()
    })
}

fn leading_id_re() -> &'static Regex {
    LEADING_ID_RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[-*]\s+)?([A-Za-z]+-\d+(?:\.\d+)*|[Rr]\d+):\s*(.*)$").unwrap()
    })
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementBlock {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    pub line: usize,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMatch {
    pub task_id: String,
    pub title: String,
    pub completed: bool,
    pub line_index: usize,
    /// Shared keyword count, set for inferred links only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementMatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Defining line in the requirements document, when the ID is defined there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<usize>,
}

/// Links found for one query, tagged with the strategy that found them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace<T> {
    pub strategy: Option<LinkStrategy>,
    pub items: Vec<T>,
}

impl<T> Trace<T> {
    fn empty() -> Self {
        Self {
            strategy: None,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCoverage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub line: usize,
    pub tasks: Trace<TaskMatch>,
}

// ---------------------------------------------------------------------------
// Requirement blocks
// ---------------------------------------------------------------------------

/// Detect requirement definitions in a requirements document.
///
/// A line defines a requirement when it is a markdown heading whose first
/// token is a requirement ID, contains a bold `**ID**`, or starts (optionally
/// after a bullet) with `ID:`. The first definition of each ID wins. A
/// block's text runs from its line up to the next block's line.
pub fn requirement_blocks(content: &str) -> Vec<RequirementBlock> {
    let lines = syntax::split_lines(content);
    let start = syntax::body_start(&lines);

    let mut seen = HashSet::new();
    let mut found: Vec<(String, Option<String>, usize)> = Vec::new();
    for (i, line) in lines.iter().enumerate().skip(start) {
        for (id, title) in detect_definitions(line) {
            if seen.insert(id.clone()) {
                found.push((id, title, i));
            }
        }
    }

    let mut blocks = Vec::with_capacity(found.len());
    for (n, (id, title, line)) in found.iter().enumerate() {
        let end = found[n + 1..]
            .iter()
            .map(|(_, _, l)| *l)
            .find(|l| *l > *line)
            .unwrap_or(lines.len());
        let text = lines[*line..end].join("\n");
        let source = title.as_deref().unwrap_or(&text);
        let keywords = keywords(
            source,
            REQUIREMENT_MIN_KEYWORD_LEN,
            REQUIREMENT_STOPWORDS,
            REQUIREMENT_MAX_KEYWORDS,
        );
        blocks.push(RequirementBlock {
            id: id.clone(),
            title: title.clone(),
            text,
            line: *line,
            keywords,
        });
    }
    blocks
}

fn detect_definitions(line: &str) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();

    if let Some(caps) = heading_re().captures(line) {
        let token = caps[1].trim_end_matches(['.', ')']);
        if is_requirement_id(token) {
            out.push((normalize_requirement_id(token), clean_title(&caps[2])));
        }
    }

    if let Some(caps) = bold_re().captures(line) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let mut rest = String::with_capacity(line.len());
        rest.push_str(&line[..whole.start]);
        rest.push_str(&line[whole.end..]);
        out.push((normalize_requirement_id(&caps[1]), clean_title(&rest)));
    }

    if let Some(caps) = leading_id_re().captures(line) {
        out.push((normalize_requirement_id(&caps[1]), clean_title(&caps[2])));
    }

    out
}

fn clean_title(raw: &str) -> Option<String> {
    let title = raw
        .trim()
        .trim_start_matches(|c: char| c == '#' || c == '-' || c == '*' || c == ':')
        .trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Lowercased alphanumeric tokens of at least `min_len` characters, minus
/// stopwords, deduplicated in order and capped at `max`.
fn keywords(text: &str, min_len: usize, stopwords: &[&str], max: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut seen = HashSet::new();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= min_len)
        .filter(|w| !stopwords.contains(w))
        .filter(|w| seen.insert(w.to_string()))
        .take(max)
        .map(str::to_string)
        .collect()
}

fn task_keywords(title: &str) -> Vec<String> {
    keywords(title, TASK_MIN_KEYWORD_LEN, TASK_STOPWORDS, TASK_MAX_KEYWORDS)
}

fn overlap(a: &[String], b: &[String]) -> usize {
    a.iter().filter(|k| b.contains(k)).count()
}

/// `deciding` is the keyword count of the side being resolved; with three or
/// more keywords the overlap must also be a large enough share.
fn is_inferred_link(overlap: usize, deciding: usize, other: usize) -> bool {
    if overlap < MIN_OVERLAP {
        return false;
    }
    if deciding < 3 {
        return true;
    }
    overlap as f64 / deciding.max(other) as f64 >= MIN_OVERLAP_RATIO
}

// ---------------------------------------------------------------------------
// TraceIndex
// ---------------------------------------------------------------------------

type TaskStrategy = fn(&TraceIndex, &str) -> Vec<TaskMatch>;
type RequirementStrategy = fn(&TraceIndex, &Task, usize) -> Vec<RequirementMatch>;

const TASK_STRATEGIES: &[(LinkStrategy, TaskStrategy)] = &[
    (LinkStrategy::Explicit, explicit_tasks),
    (LinkStrategy::Mention, mentioning_tasks),
    (LinkStrategy::Inferred, inferred_tasks),
];

const REQUIREMENT_STRATEGIES: &[(LinkStrategy, RequirementStrategy)] = &[
    (LinkStrategy::Explicit, explicit_requirements),
    (LinkStrategy::Mention, mentioned_requirements),
    (LinkStrategy::Inferred, inferred_requirements),
];

pub struct TraceIndex {
    blocks: Vec<RequirementBlock>,
    tasks: Vec<Task>,
    task_texts: Vec<String>,
    inference: bool,
}

impl TraceIndex {
    /// Build from the requirements text, the tasks text and the tasks parsed
    /// from that same text.
    pub fn new(requirements: &str, tasks_content: &str, tasks: &[Task]) -> Self {
        let lines = syntax::split_lines(tasks_content);
        let task_texts = tasks
            .iter()
            .enumerate()
            .map(|(n, task)| {
                let start = task.line_index.min(lines.len());
                let end = tasks
                    .get(n + 1)
                    .map(|next| next.line_index)
                    .unwrap_or(lines.len())
                    .clamp(start, lines.len());
                lines[start..end].join("\n")
            })
            .collect();

        Self {
            blocks: requirement_blocks(requirements),
            tasks: tasks.to_vec(),
            task_texts,
            inference: true,
        }
    }

    /// Parse the tasks text and build the index in one step.
    pub fn from_documents(requirements: &str, tasks_content: &str, spec_name: &str) -> Self {
        let doc = parse_tasks(tasks_content, spec_name);
        Self::new(requirements, tasks_content, &doc.tasks)
    }

    /// Enable or disable the keyword-inference strategy.
    pub fn with_inference(mut self, enabled: bool) -> Self {
        self.inference = enabled;
        self
    }

    pub fn blocks(&self) -> &[RequirementBlock] {
        &self.blocks
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn block(&self, id: &str) -> Option<&RequirementBlock> {
        let id = normalize_requirement_id(id);
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Tasks that address `requirement_id`.
    pub fn tasks_for_requirement(&self, requirement_id: &str) -> Trace<TaskMatch> {
        let id = normalize_requirement_id(requirement_id);
        for (strategy, resolve) in TASK_STRATEGIES {
            if *strategy == LinkStrategy::Inferred && !self.inference {
                continue;
            }
            let items = resolve(self, &id);
            if !items.is_empty() {
                return Trace {
                    strategy: Some(*strategy),
                    items,
                };
            }
        }
        Trace::empty()
    }

    /// Requirements addressed by `task_id`. Unknown task IDs trace to nothing.
    pub fn requirements_for_task(&self, task_id: &str) -> Trace<RequirementMatch> {
        let Some(n) = self.tasks.iter().position(|t| t.id == task_id) else {
            return Trace::empty();
        };
        let task = &self.tasks[n];
        for (strategy, resolve) in REQUIREMENT_STRATEGIES {
            if *strategy == LinkStrategy::Inferred && !self.inference {
                continue;
            }
            let items = resolve(self, task, n);
            if !items.is_empty() {
                return Trace {
                    strategy: Some(*strategy),
                    items,
                };
            }
        }
        Trace::empty()
    }

    /// Every detected requirement with the tasks that address it.
    pub fn coverage(&self) -> Vec<RequirementCoverage> {
        self.blocks
            .iter()
            .map(|b| RequirementCoverage {
                id: b.id.clone(),
                title: b.title.clone(),
                line: b.line,
                tasks: self.tasks_for_requirement(&b.id),
            })
            .collect()
    }

    fn requirement_match(&self, id: String, overlap: Option<usize>) -> RequirementMatch {
        let block = self.blocks.iter().find(|b| b.id == id);
        RequirementMatch {
            title: block.and_then(|b| b.title.clone()),
            line: block.map(|b| b.line),
            id,
            overlap,
        }
    }
}

fn task_match(task: &Task, overlap: Option<usize>) -> TaskMatch {
    TaskMatch {
        task_id: task.id.clone(),
        title: task.title.clone(),
        completed: task.completed,
        line_index: task.line_index,
        overlap,
    }
}

// ---------------------------------------------------------------------------
// Requirement -> tasks strategies
// ---------------------------------------------------------------------------

fn explicit_tasks(index: &TraceIndex, id: &str) -> Vec<TaskMatch> {
    index
        .tasks
        .iter()
        .filter(|t| {
            t.requirement_ids
                .as_ref()
                .is_some_and(|ids| ids.iter().any(|r| r == id))
                || extract_requirement_ids(&t.title).iter().any(|r| r == id)
        })
        .map(|t| task_match(t, None))
        .collect()
}

fn mentioning_tasks(index: &TraceIndex, id: &str) -> Vec<TaskMatch> {
    index
        .tasks
        .iter()
        .zip(&index.task_texts)
        .filter(|(_, text)| extract_mentions(text).iter().any(|r| r == id))
        .map(|(t, _)| task_match(t, None))
        .collect()
}

fn inferred_tasks(index: &TraceIndex, id: &str) -> Vec<TaskMatch> {
    let Some(block) = index.blocks.iter().find(|b| b.id == id) else {
        return Vec::new();
    };
    let mut scored: Vec<(usize, &Task)> = index
        .tasks
        .iter()
        .filter_map(|t| {
            let task_kw = task_keywords(&t.title);
            let shared = overlap(&block.keywords, &task_kw);
            is_inferred_link(shared, block.keywords.len(), task_kw.len()).then_some((shared, t))
        })
        .collect();
    scored.sort_by(|(a_n, a), (b_n, b)| b_n.cmp(a_n).then_with(|| a.id.cmp(&b.id)));
    scored
        .into_iter()
        .map(|(shared, t)| task_match(t, Some(shared)))
        .collect()
}

// ---------------------------------------------------------------------------
// Task -> requirements strategies
// ---------------------------------------------------------------------------

fn explicit_requirements(index: &TraceIndex, task: &Task, _: usize) -> Vec<RequirementMatch> {
    let mut seen = HashSet::new();
    task.requirement_ids
        .iter()
        .flatten()
        .cloned()
        .chain(extract_requirement_ids(&task.title))
        .filter(|id| seen.insert(id.clone()))
        .map(|id| index.requirement_match(id, None))
        .collect()
}

fn mentioned_requirements(index: &TraceIndex, _: &Task, n: usize) -> Vec<RequirementMatch> {
    index
        .task_texts
        .get(n)
        .map(|text| extract_mentions(text))
        .unwrap_or_default()
        .into_iter()
        .map(|id| index.requirement_match(id, None))
        .collect()
}

fn inferred_requirements(index: &TraceIndex, task: &Task, _: usize) -> Vec<RequirementMatch> {
    let task_kw = task_keywords(&task.title);
    let mut scored: Vec<(usize, &RequirementBlock)> = index
        .blocks
        .iter()
        .filter_map(|b| {
            let shared = overlap(&task_kw, &b.keywords);
            is_inferred_link(shared, task_kw.len(), b.keywords.len()).then_some((shared, b))
        })
        .collect();
    scored.sort_by(|(a_n, a), (b_n, b)| b_n.cmp(a_n).then_with(|| a.id.cmp(&b.id)));
    scored
        .into_iter()
        .map(|(shared, b)| index.requirement_match(b.id.clone(), Some(shared)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
