use crate::error::{Result, SpecError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const SPECLENS_DIR: &str = ".speclens";
pub const CONFIG_FILE: &str = ".speclens/config.yaml";
pub const DEFAULT_SPECS_DIR: &str = ".specs";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn speclens_dir(root: &Path) -> PathBuf {
    root.join(SPECLENS_DIR)
}

/// `dir` is the configured specs directory, relative to `root`.
pub fn specs_dir(root: &Path, dir: &str) -> PathBuf {
    root.join(dir)
}

pub fn spec_dir(root: &Path, dir: &str, name: &str) -> PathBuf {
    specs_dir(root, dir).join(name)
}

// ---------------------------------------------------------------------------
// Slug validation
// ---------------------------------------------------------------------------

static SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn slug_re() -> &'static Regex {
    SLUG_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || !slug_re().is_match(slug) {
        return Err(SpecError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
