use crate::completion;
use crate::config::Config;
use crate::error::{Result, SpecError};
use crate::io;
use crate::paths;
use crate::task::{parse_tasks, TaskDocument, TaskProgress};
use crate::trace::TraceIndex;
use crate::types::DocumentKind;
use crate::validate::{validate_tasks, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// SpecSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecSummary {
    pub name: String,
    pub documents: Vec<DocumentKind>,
    pub progress: TaskProgress,
}

// ---------------------------------------------------------------------------
// Spec
// ---------------------------------------------------------------------------

/// A spec directory holding requirements, design and tasks documents.
#[derive(Debug, Clone)]
pub struct Spec {
    pub name: String,
    pub dir: PathBuf,
}

impl Spec {
    pub fn create(root: &Path, config: &Config, name: &str) -> Result<Self> {
        paths::validate_slug(name)?;

        let dir = paths::spec_dir(root, &config.specs_dir, name);
        if dir.exists() {
            return Err(SpecError::SpecExists(name.to_string()));
        }

        let spec = Self {
            name: name.to_string(),
            dir,
        };
        for kind in DocumentKind::all() {
            io::write_if_missing(&spec.document_path(*kind), template(*kind, name).as_bytes())?;
        }
        tracing::debug!(spec = name, dir = %spec.dir.display(), "created spec");
        Ok(spec)
    }

    pub fn load(root: &Path, config: &Config, name: &str) -> Result<Self> {
        let dir = paths::spec_dir(root, &config.specs_dir, name);
        if paths::validate_slug(name).is_err() || !dir.is_dir() {
            return Err(SpecError::SpecNotFound(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    /// All spec directories under the configured specs dir, sorted by name.
    pub fn list(root: &Path, config: &Config) -> Result<Vec<Self>> {
        let specs_dir = paths::specs_dir(root, &config.specs_dir);
        if !specs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut specs = Vec::new();
        for entry in std::fs::read_dir(&specs_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if paths::validate_slug(&name).is_err() {
                tracing::debug!(dir = %entry.path().display(), "skipping non-spec directory");
                continue;
            }
            specs.push(Self {
                name,
                dir: entry.path(),
            });
        }
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    // ---------------------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------------------

    pub fn document_path(&self, kind: DocumentKind) -> PathBuf {
        self.dir.join(kind.filename())
    }

    pub fn read(&self, kind: DocumentKind) -> Result<Option<String>> {
        io::read_optional(&self.document_path(kind))
    }

    /// Missing documents read as empty text.
    pub fn read_or_empty(&self, kind: DocumentKind) -> Result<String> {
        Ok(self.read(kind)?.unwrap_or_default())
    }

    pub fn write(&self, kind: DocumentKind, content: &str) -> Result<()> {
        tracing::debug!(spec = %self.name, document = %kind, bytes = content.len(), "writing document");
        io::atomic_write(&self.document_path(kind), content.as_bytes())
    }

    pub fn documents(&self) -> Vec<DocumentKind> {
        DocumentKind::all()
            .iter()
            .copied()
            .filter(|k| self.document_path(*k).is_file())
            .collect()
    }

    // ---------------------------------------------------------------------------
    // Task document
    // ---------------------------------------------------------------------------

    pub fn tasks(&self) -> Result<TaskDocument> {
        let content = self.read_or_empty(DocumentKind::Tasks)?;
        Ok(parse_tasks(&content, &self.name))
    }

    pub fn validate(&self) -> Result<Vec<ValidationIssue>> {
        let content = self.read_or_empty(DocumentKind::Tasks)?;
        Ok(validate_tasks(&content))
    }

    pub fn summary(&self) -> Result<SpecSummary> {
        Ok(SpecSummary {
            name: self.name.clone(),
            documents: self.documents(),
            progress: self.tasks()?.progress(),
        })
    }

    /// Set a task's completion, optionally cascading to its subtasks.
    ///
    /// Returns whether the document changed. Unlike the pure mutators, an
    /// unknown task ID is an error here.
    pub fn set_task_completed(&self, task_id: &str, completed: bool, cascade: bool) -> Result<bool> {
        let content = self.read_or_empty(DocumentKind::Tasks)?;
        if parse_tasks(&content, &self.name).find(task_id).is_none() {
            return Err(SpecError::TaskNotFound(task_id.to_string()));
        }

        let updated = if cascade {
            completion::set_completed_cascade(&content, task_id, completed)
        } else {
            completion::set_completed(&content, task_id, completed)
        };
        if updated == content {
            return Ok(false);
        }
        self.write(DocumentKind::Tasks, &updated)?;
        Ok(true)
    }

    /// Replace the tasks document, carrying completion over by task ID.
    ///
    /// Returns the IDs whose completion was restored.
    pub fn regenerate_tasks(&self, new_content: &str) -> Result<Vec<String>> {
        let previous = self.read_or_empty(DocumentKind::Tasks)?;
        let completed_ids = parse_tasks(&previous, &self.name).completed_ids();

        let patched = completion::apply_completed_ids(new_content, &completed_ids);

        // Derived headings have no marker to flip, so only count what the patch changed.
        let incoming = parse_tasks(new_content, &self.name).completed_ids();
        let restored: Vec<String> = parse_tasks(&patched, &self.name)
            .tasks
            .into_iter()
            .filter(|t| t.completed && completed_ids.contains(&t.id) && !incoming.contains(&t.id))
            .map(|t| t.id)
            .collect();

        self.write(DocumentKind::Tasks, &patched)?;
        Ok(restored)
    }

    /// Cross-reference index over this spec's requirements and tasks.
    pub fn trace_index(&self, config: &Config) -> Result<TraceIndex> {
        let requirements = self.read_or_empty(DocumentKind::Requirements)?;
        let tasks = self.read_or_empty(DocumentKind::Tasks)?;
        Ok(TraceIndex::from_documents(&requirements, &tasks, &self.name)
            .with_inference(config.trace.inference))
    }
}

fn template(kind: DocumentKind, name: &str) -> String {
    match kind {
        DocumentKind::Requirements => format!(
            "# Requirements: {name}\n\n## REQ-1: \n\n**User story:** As a ..., I want ..., so that ...\n"
        ),
        DocumentKind::Design => format!("# Design: {name}\n\n## Overview\n\n## Components\n"),
        DocumentKind::Tasks => format!(
            "# Tasks: {name}\n\n- [ ] <!-- task:T1 --> First task <!-- requires:REQ-1 -->\n"
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config::new("test");
        config.save(dir.path()).unwrap();
        (dir, config)
    }

    #[test]
    fn create_writes_templates() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        assert_eq!(spec.documents(), DocumentKind::all().to_vec());

        let tasks = spec.tasks().unwrap();
        assert_eq!(tasks.tasks.len(), 1);
        assert_eq!(tasks.tasks[0].id, "T1");
        assert_eq!(tasks.tasks[0].requirement_ids, Some(vec!["REQ-1".to_string()]));
        assert!(spec.validate().unwrap().is_empty());
    }

    #[test]
    fn create_rejects_duplicates_and_bad_names() {
        let (dir, config) = setup();
        Spec::create(dir.path(), &config, "auth").unwrap();
        assert!(matches!(
            Spec::create(dir.path(), &config, "auth"),
            Err(SpecError::SpecExists(_))
        ));
        assert!(matches!(
            Spec::create(dir.path(), &config, "Bad Name"),
            Err(SpecError::InvalidSlug(_))
        ));
    }

    #[test]
    fn load_missing_spec() {
        let (dir, config) = setup();
        assert!(matches!(
            Spec::load(dir.path(), &config, "ghost"),
            Err(SpecError::SpecNotFound(_))
        ));
    }

    #[test]
    fn list_is_sorted_and_skips_files() {
        let (dir, config) = setup();
        Spec::create(dir.path(), &config, "zeta").unwrap();
        Spec::create(dir.path(), &config, "alpha").unwrap();
        std::fs::write(dir.path().join(".specs/README.md"), "notes").unwrap();

        let names: Vec<String> = Spec::list(dir.path(), &config)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn list_without_specs_dir_is_empty() {
        let (dir, config) = setup();
        assert!(Spec::list(dir.path(), &config).unwrap().is_empty());
    }

    #[test]
    fn set_task_completed_persists() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        spec.write(DocumentKind::Tasks, "- [ ] A\n  - [ ] a1\n- [ ] B\n").unwrap();

        assert!(spec.set_task_completed("T1", true, true).unwrap());
        assert_eq!(
            spec.read(DocumentKind::Tasks).unwrap().unwrap(),
            "- [x] A\n  - [x] a1\n- [ ] B\n"
        );
        assert!(!spec.set_task_completed("T1", true, true).unwrap());
        assert!(matches!(
            spec.set_task_completed("T9", true, false),
            Err(SpecError::TaskNotFound(_))
        ));
    }

    #[test]
    fn regenerate_restores_completion_by_id() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        spec.write(
            DocumentKind::Tasks,
            "- [x] <!-- task:a --> A\n- [ ] <!-- task:b --> B\n",
        )
        .unwrap();

        let restored = spec
            .regenerate_tasks("- [ ] <!-- task:new --> New\n- [ ] <!-- task:a --> A again\n")
            .unwrap();
        assert_eq!(restored, vec!["a".to_string()]);
        assert_eq!(
            spec.read(DocumentKind::Tasks).unwrap().unwrap(),
            "- [ ] <!-- task:new --> New\n- [x] <!-- task:a --> A again\n"
        );
    }

    #[test]
    fn regenerate_skips_derived_heading_it_cannot_restore() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        spec.write(DocumentKind::Tasks, "### T1: Auth\n- [x] login\n- [x] logout\n")
            .unwrap();

        let regenerated = "### T1: Auth\n- [ ] login\n- [ ] logout\n";
        let restored = spec.regenerate_tasks(regenerated).unwrap();
        assert!(restored.is_empty());
        assert_eq!(spec.read(DocumentKind::Tasks).unwrap().unwrap(), regenerated);
        assert!(!spec.tasks().unwrap().find("T1").unwrap().completed);
    }

    #[test]
    fn regenerate_restores_explicit_heading_checkbox() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        spec.write(DocumentKind::Tasks, "### - [x] T1: Auth\n- [ ] login\n").unwrap();

        let restored = spec.regenerate_tasks("### - [ ] T1: Auth v2\n- [ ] login\n").unwrap();
        assert_eq!(restored, vec!["T1".to_string()]);
        assert_eq!(
            spec.read(DocumentKind::Tasks).unwrap().unwrap(),
            "### - [x] T1: Auth v2\n- [ ] login\n"
        );
    }

    #[test]
    fn summary_reports_progress() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        spec.write(DocumentKind::Tasks, "- [x] A\n- [ ] B\n").unwrap();
        let summary = spec.summary().unwrap();
        assert_eq!(summary.progress.total, 2);
        assert_eq!(summary.progress.percent(), 50);
    }

    #[test]
    fn trace_index_reads_both_documents() {
        let (dir, config) = setup();
        let spec = Spec::create(dir.path(), &config, "auth").unwrap();
        let index = spec.trace_index(&config).unwrap();
        assert_eq!(index.blocks().len(), 1);
        assert_eq!(index.tasks_for_requirement("REQ-1").items.len(), 1);
    }
}
