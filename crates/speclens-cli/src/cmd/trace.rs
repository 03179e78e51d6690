use super::load_spec;
use crate::output::{checkbox, print_json, print_table};
use clap::Subcommand;
use speclens_core::trace::{TaskMatch, Trace};
use std::path::Path;

#[derive(Subcommand)]
pub enum TraceSubcommand {
    /// Tasks that address a requirement
    Requirement { spec: String, id: String },
    /// Requirements a task addresses
    Task { spec: String, task_id: String },
    /// Every requirement with the tasks that address it
    Matrix {
        spec: String,
        /// Only show requirements no task addresses
        #[arg(long)]
        uncovered: bool,
    },
}

pub fn run(root: &Path, subcmd: TraceSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TraceSubcommand::Requirement { spec, id } => requirement(root, &spec, &id, json),
        TraceSubcommand::Task { spec, task_id } => task(root, &spec, &task_id, json),
        TraceSubcommand::Matrix { spec, uncovered } => matrix(root, &spec, uncovered, json),
    }
}

fn requirement(root: &Path, spec_name: &str, id: &str, json: bool) -> anyhow::Result<()> {
    let (config, spec) = load_spec(root, spec_name)?;
    let index = spec.trace_index(&config)?;
    let trace = index.tasks_for_requirement(id);

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "requirement": id,
            "strategy": trace.strategy,
            "tasks": trace.items,
        }));
    }

    if let Some(block) = index.block(id) {
        match &block.title {
            Some(title) => println!("{}: {title}", block.id),
            None => println!("{}", block.id),
        }
    } else {
        println!("{id} (not defined in requirements.md)");
    }
    print_task_trace(&trace);
    Ok(())
}

fn task(root: &Path, spec_name: &str, task_id: &str, json: bool) -> anyhow::Result<()> {
    let (config, spec) = load_spec(root, spec_name)?;
    let index = spec.trace_index(&config)?;
    let Some(task) = index.tasks().iter().find(|t| t.id == task_id) else {
        anyhow::bail!("task '{task_id}' not found in spec '{spec_name}'");
    };
    let trace = index.requirements_for_task(task_id);

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "task_id": task_id,
            "strategy": trace.strategy,
            "requirements": trace.items,
        }));
    }

    println!("{} {}", task.id, task.title);
    let Some(strategy) = trace.strategy else {
        println!("  no linked requirements");
        return Ok(());
    };
    println!("  linked by: {strategy}");
    for req in &trace.items {
        let title = req.title.as_deref().unwrap_or("(not defined in requirements.md)");
        match req.overlap {
            Some(n) => println!("  {}: {title} ({n} shared keywords)", req.id),
            None => println!("  {}: {title}", req.id),
        }
    }
    Ok(())
}

fn matrix(root: &Path, spec_name: &str, uncovered: bool, json: bool) -> anyhow::Result<()> {
    let (config, spec) = load_spec(root, spec_name)?;
    let index = spec.trace_index(&config)?;
    let coverage: Vec<_> = index
        .coverage()
        .into_iter()
        .filter(|c| !uncovered || c.tasks.is_empty())
        .collect();

    if json {
        return print_json(&serde_json::json!({
            "spec": spec.name,
            "requirements": coverage,
        }));
    }

    if coverage.is_empty() {
        if uncovered {
            println!("Every requirement is addressed by at least one task.");
        } else {
            println!("No requirements found in requirements.md.");
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = coverage
        .iter()
        .map(|c| {
            let tasks = c
                .tasks
                .items
                .iter()
                .map(|m| m.task_id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                c.id.clone(),
                c.tasks
                    .strategy
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                if tasks.is_empty() { "-".to_string() } else { tasks },
                c.title.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["REQUIREMENT", "LINK", "TASKS", "TITLE"], &rows);
    Ok(())
}

fn print_task_trace(trace: &Trace<TaskMatch>) {
    let Some(strategy) = trace.strategy else {
        println!("  no tasks address this requirement");
        return;
    };
    println!("  linked by: {strategy}");
    for m in &trace.items {
        match m.overlap {
            Some(n) => println!(
                "  {} {} {} ({n} shared keywords)",
                checkbox(m.completed),
                m.task_id,
                m.title
            ),
            None => println!("  {} {} {}", checkbox(m.completed), m.task_id, m.title),
        }
    }
}
