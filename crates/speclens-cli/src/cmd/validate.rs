use super::load_spec;
use crate::output::print_json;
use speclens_core::validate::ValidationSummary;
use std::path::Path;

pub fn run(root: &Path, spec_name: &str, json: bool) -> anyhow::Result<()> {
    let (_, spec) = load_spec(root, spec_name)?;
    let issues = spec.validate()?;
    let summary = ValidationSummary::of(&issues);

    if json {
        print_json(&serde_json::json!({
            "spec": spec.name,
            "summary": summary,
            "issues": issues,
        }))?;
    } else if summary.is_clean() {
        println!("tasks.md is valid. No issues.");
    } else {
        for issue in &issues {
            println!("line {}: [{}] {}", issue.line + 1, issue.severity, issue.message);
        }
        println!();
        println!("{} error(s), {} warning(s)", summary.errors, summary.warnings);
    }

    if summary.errors > 0 {
        anyhow::bail!("validation found {} error(s) in '{spec_name}'", summary.errors);
    }
    Ok(())
}
