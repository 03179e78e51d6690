use crate::task::Task;
use crate::trace::TraceIndex;
use crate::types::LinkStrategy;
use serde::{Deserialize, Serialize};

/// A requirement excerpt attached to a task context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementExcerpt {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Full block text; empty when the ID is referenced but not defined.
    pub text: String,
}

/// Everything a prompt builder needs to work on one task. Carries data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContext {
    pub spec_name: String,
    pub task: Task,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_strategy: Option<LinkStrategy>,
    pub requirements: Vec<RequirementExcerpt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,
}

impl TaskContext {
    /// Returns `None` when `task_id` is not in the index.
    pub fn build(
        spec_name: &str,
        index: &TraceIndex,
        task_id: &str,
        design: Option<String>,
    ) -> Option<Self> {
        let task = index.tasks().iter().find(|t| t.id == task_id)?.clone();
        let trace = index.requirements_for_task(task_id);
        let requirements = trace
            .items
            .iter()
            .map(|m| {
                let block = index.block(&m.id);
                RequirementExcerpt {
                    id: m.id.clone(),
                    title: m.title.clone(),
                    text: block.map(|b| b.text.clone()).unwrap_or_default(),
                }
            })
            .collect();

        Some(Self {
            spec_name: spec_name.to_string(),
            task,
            link_strategy: trace.strategy,
            requirements,
            design: design.filter(|d| !d.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIREMENTS: &str = "\
## REQ-1: Session tokens
Tokens expire after one hour.

## REQ-2: Audit trail
Every login is recorded.
";

    #[test]
    fn bundles_task_requirements_and_design() {
        let tasks = "- [ ] Issue tokens <!-- requires:REQ-1,REQ-404 -->\n  - [ ] sign them";
        let index = TraceIndex::from_documents(REQUIREMENTS, tasks, "auth");
        let ctx = TaskContext::build("auth", &index, "T1", Some("# Design\nJWT".to_string()))
            .unwrap();

        assert_eq!(ctx.spec_name, "auth");
        assert_eq!(ctx.task.sub_tasks.len(), 1);
        assert_eq!(ctx.link_strategy, Some(LinkStrategy::Explicit));
        assert_eq!(ctx.requirements.len(), 2);
        assert_eq!(ctx.requirements[0].id, "REQ-1");
        assert!(ctx.requirements[0].text.contains("expire after one hour"));
        assert_eq!(ctx.requirements[1].id, "REQ-404");
        assert!(ctx.requirements[1].text.is_empty());
        assert_eq!(ctx.design.as_deref(), Some("# Design\nJWT"));
    }

    #[test]
    fn unknown_task_has_no_context() {
        let index = TraceIndex::from_documents(REQUIREMENTS, "- [ ] A", "auth");
        assert!(TaskContext::build("auth", &index, "T2", None).is_none());
    }

    #[test]
    fn blank_design_is_dropped() {
        let index = TraceIndex::from_documents(REQUIREMENTS, "- [ ] A", "auth");
        let ctx = TaskContext::build("auth", &index, "T1", Some("  \n".to_string())).unwrap();
        assert!(ctx.design.is_none());
        assert!(ctx.requirements.is_empty());
        assert_eq!(ctx.link_strategy, None);
    }
}
