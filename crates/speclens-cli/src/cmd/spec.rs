use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use speclens_core::{config::Config, spec::Spec, types::DocumentKind};
use std::path::Path;

#[derive(Subcommand)]
pub enum SpecSubcommand {
    /// Create a spec with template documents
    Create {
        /// Spec slug (lowercase letters, digits and hyphens)
        name: String,
    },
    /// List all specs with task progress
    List,
    /// Show documents and task progress for one spec
    Show {
        name: String,
        /// Print one document instead: requirements, design or tasks
        #[arg(long)]
        doc: Option<DocumentKind>,
    },
}

pub fn run(root: &Path, subcmd: SpecSubcommand, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    match subcmd {
        SpecSubcommand::Create { name } => create(root, &config, &name, json),
        SpecSubcommand::List => list(root, &config, json),
        SpecSubcommand::Show { name, doc } => show(root, &config, &name, doc, json),
    }
}

fn create(root: &Path, config: &Config, name: &str, json: bool) -> anyhow::Result<()> {
    let spec = Spec::create(root, config, name)?;

    if json {
        print_json(&serde_json::json!({
            "name": spec.name,
            "dir": spec.dir.display().to_string(),
            "documents": spec.documents(),
        }))?;
    } else {
        println!("Created spec '{}'", spec.name);
        for kind in spec.documents() {
            println!("  {}", spec.document_path(kind).display());
        }
    }
    Ok(())
}

fn list(root: &Path, config: &Config, json: bool) -> anyhow::Result<()> {
    let specs = Spec::list(root, config).context("failed to list specs")?;
    let summaries = specs
        .iter()
        .map(Spec::summary)
        .collect::<Result<Vec<_>, _>>()?;

    if json {
        return print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("No specs.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                format!("{}/{}", s.progress.completed, s.progress.total),
                format!("{}%", s.progress.percent()),
                document_list(&s.documents),
            ]
        })
        .collect();
    print_table(&["NAME", "TASKS", "DONE", "DOCUMENTS"], &rows);
    Ok(())
}

fn show(
    root: &Path,
    config: &Config,
    name: &str,
    doc: Option<DocumentKind>,
    json: bool,
) -> anyhow::Result<()> {
    let spec = Spec::load(root, config, name)?;

    if let Some(kind) = doc {
        let content = spec
            .read(kind)?
            .with_context(|| format!("spec '{name}' has no {}", kind.filename()))?;
        if json {
            return print_json(&serde_json::json!({ "document": kind, "content": content }));
        }
        print!("{content}");
        return Ok(());
    }

    let summary = spec.summary()?;

    if json {
        return print_json(&summary);
    }

    println!("Spec:      {}", summary.name);
    println!("Dir:       {}", spec.dir.display());
    println!("Documents: {}", document_list(&summary.documents));
    println!("Progress:  {}", summary.progress);
    Ok(())
}

fn document_list(documents: &[DocumentKind]) -> String {
    if documents.is_empty() {
        return "(none)".to_string();
    }
    documents
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
