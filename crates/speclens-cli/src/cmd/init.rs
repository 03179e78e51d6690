use crate::output::print_json;
use anyhow::Context;
use speclens_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    io::ensure_dir(&paths::speclens_dir(root))
        .with_context(|| format!("failed to create {}", paths::SPECLENS_DIR))?;

    // 1. Write config.yaml if missing
    let config_path = paths::config_path(root);
    let created_config = !config_path.exists();
    let config = if created_config {
        let cfg = Config::new(&project_name);
        cfg.save(root).context("failed to write config.yaml")?;
        cfg
    } else {
        Config::load(root).context("failed to load config")?
    };

    // 2. Create the specs directory
    let specs_dir = paths::specs_dir(root, &config.specs_dir);
    let created_specs_dir = !specs_dir.exists();
    io::ensure_dir(&specs_dir)
        .with_context(|| format!("failed to create {}", specs_dir.display()))?;

    if json {
        return print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "project": config.project.name,
            "specs_dir": config.specs_dir,
            "created_config": created_config,
            "created_specs_dir": created_specs_dir,
        }));
    }

    println!("Initializing speclens in: {}", root.display());
    println!(
        "  {}: {}",
        if created_config { "created" } else { "exists " },
        paths::CONFIG_FILE
    );
    println!(
        "  {}: {}/",
        if created_specs_dir { "created" } else { "exists " },
        config.specs_dir
    );
    Ok(())
}
