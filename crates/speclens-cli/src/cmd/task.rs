use super::load_spec;
use crate::output::{checkbox, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use speclens_core::{context::TaskContext, task::Task, types::DocumentKind};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// List tasks with progress
    List { spec: String },
    /// Show full details for a single task
    Get { spec: String, task_id: String },
    /// Show the first incomplete task
    Next { spec: String },
    /// Mark a task complete
    Complete {
        spec: String,
        task_id: String,
        /// Also mark every subtask complete
        #[arg(long)]
        cascade: bool,
    },
    /// Mark a task incomplete
    Reopen {
        spec: String,
        task_id: String,
        /// Also mark every subtask incomplete
        #[arg(long)]
        cascade: bool,
    },
    /// Show a task with its linked requirements and the design document
    Context { spec: String, task_id: String },
    /// Replace tasks.md with a file's content, keeping completion by task ID
    Regenerate { spec: String, file: PathBuf },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::List { spec } => list(root, &spec, json),
        TaskSubcommand::Get { spec, task_id } => get(root, &spec, &task_id, json),
        TaskSubcommand::Next { spec } => next(root, &spec, json),
        TaskSubcommand::Complete {
            spec,
            task_id,
            cascade,
        } => set_completed(root, &spec, &task_id, true, cascade, json),
        TaskSubcommand::Reopen {
            spec,
            task_id,
            cascade,
        } => set_completed(root, &spec, &task_id, false, cascade, json),
        TaskSubcommand::Context { spec, task_id } => context(root, &spec, &task_id, json),
        TaskSubcommand::Regenerate { spec, file } => regenerate(root, &spec, &file, json),
    }
}

fn list(root: &Path, spec_name: &str, json: bool) -> anyhow::Result<()> {
    let (_, spec) = load_spec(root, spec_name)?;
    let doc = spec.tasks().context("failed to read tasks.md")?;
    let progress = doc.progress();

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "file_glob": doc.file_glob,
            "progress": progress,
            "tasks": doc.tasks,
        }));
    }

    if doc.tasks.is_empty() {
        println!("No tasks in '{spec_name}'.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = doc
        .tasks
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                checkbox(t.completed).to_string(),
                subtask_count(t),
                requires_label(t),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "DONE", "SUBTASKS", "REQUIRES", "TITLE"], &rows);
    println!();
    println!("{progress}");
    Ok(())
}

fn get(root: &Path, spec_name: &str, task_id: &str, json: bool) -> anyhow::Result<()> {
    let (_, spec) = load_spec(root, spec_name)?;
    let doc = spec.tasks().context("failed to read tasks.md")?;
    let task = doc
        .find(task_id)
        .with_context(|| format!("task '{task_id}' not found in spec '{spec_name}'"))?;

    if json {
        return print_json(task);
    }
    print_task(task);
    Ok(())
}

fn next(root: &Path, spec_name: &str, json: bool) -> anyhow::Result<()> {
    let (_, spec) = load_spec(root, spec_name)?;
    let doc = spec.tasks().context("failed to read tasks.md")?;
    let next = doc.next_task();

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "progress": doc.progress(),
            "next": next,
        }));
    }

    match next {
        Some(task) => print_task(task),
        None => println!("All tasks complete."),
    }
    Ok(())
}

fn set_completed(
    root: &Path,
    spec_name: &str,
    task_id: &str,
    completed: bool,
    cascade: bool,
    json: bool,
) -> anyhow::Result<()> {
    let (_, spec) = load_spec(root, spec_name)?;
    let changed = spec
        .set_task_completed(task_id, completed, cascade)
        .with_context(|| format!("failed to update task '{task_id}' in spec '{spec_name}'"))?;

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "task_id": task_id,
            "completed": completed,
            "changed": changed,
        }));
    }

    let verb = if completed { "Completed" } else { "Reopened" };
    if changed {
        println!("{verb} task [{task_id}]");
    } else {
        println!("Task [{task_id}] unchanged");
    }
    Ok(())
}

fn context(root: &Path, spec_name: &str, task_id: &str, json: bool) -> anyhow::Result<()> {
    let (config, spec) = load_spec(root, spec_name)?;
    let index = spec.trace_index(&config)?;
    let design = spec.read(DocumentKind::Design)?;
    let ctx = TaskContext::build(&spec.name, &index, task_id, design)
        .with_context(|| format!("task '{task_id}' not found in spec '{spec_name}'"))?;

    if json {
        return print_json(&ctx);
    }

    print_task(&ctx.task);
    println!();
    match ctx.link_strategy {
        Some(strategy) => println!("Requirements ({strategy}):"),
        None => println!("Requirements: (none linked)"),
    }
    for req in &ctx.requirements {
        match &req.title {
            Some(title) => println!("  {}: {title}", req.id),
            None => println!("  {}", req.id),
        }
        if req.text.is_empty() {
            println!("    (not defined in requirements.md)");
        }
        for line in req.text.lines().skip(1) {
            println!("    {line}");
        }
    }
    if let Some(design) = &ctx.design {
        println!();
        println!("Design:");
        for line in design.lines() {
            println!("  {line}");
        }
    }
    Ok(())
}

fn regenerate(root: &Path, spec_name: &str, file: &Path, json: bool) -> anyhow::Result<()> {
    let (_, spec) = load_spec(root, spec_name)?;
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let restored = spec
        .regenerate_tasks(&content)
        .context("failed to write tasks.md")?;
    let progress = spec.tasks()?.progress();

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "restored": restored,
            "progress": progress,
        }));
    }

    println!("Regenerated tasks for '{}'", spec.name);
    if !restored.is_empty() {
        println!("  restored completion: {}", restored.join(", "));
    }
    println!("  {progress}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn print_task(task: &Task) {
    println!("Task: {}", task.id);
    println!("Title:    {}", task.title);
    println!("Status:   {}", if task.completed { "completed" } else { "open" });
    println!("Line:     {}", task.line_index + 1);
    println!("Requires: {}", requires_label(task));
    for sub in &task.sub_tasks {
        println!("  {} {}", checkbox(sub.completed), sub.title);
    }
}

fn subtask_count(task: &Task) -> String {
    if task.sub_tasks.is_empty() {
        return "-".to_string();
    }
    let done = task.sub_tasks.iter().filter(|s| s.completed).count();
    format!("{done}/{}", task.sub_tasks.len())
}

fn requires_label(task: &Task) -> String {
    match &task.requirement_ids {
        Some(ids) if !ids.is_empty() => ids.join(", "),
        _ => "-".to_string(),
    }
}
