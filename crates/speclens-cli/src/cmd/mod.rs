pub mod config;
pub mod init;
pub mod spec;
pub mod task;
pub mod trace;
pub mod validate;

use anyhow::Context;
use speclens_core::{config::Config, spec::Spec};
use std::path::Path;

/// Load the project config and the named spec.
pub(crate) fn load_spec(root: &Path, name: &str) -> anyhow::Result<(Config, Spec)> {
    let config = Config::load(root).context("failed to load config")?;
    let spec = Spec::load(root, &config, name)?;
    Ok((config, spec))
}
