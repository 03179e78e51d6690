use std::path::{Path, PathBuf};

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `SPECLENS_ROOT` env var (passed in as `explicit`)
/// 2. Nearest ancestor of the cwd containing `.speclens/`
/// 3. Nearest ancestor of the cwd containing `.git/`
/// 4. The cwd itself
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_root_from(explicit, &cwd)
}

fn resolve_root_from(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    find_ancestor_with(cwd, speclens_core::paths::SPECLENS_DIR)
        .or_else(|| find_ancestor_with(cwd, ".git"))
        .unwrap_or_else(|| cwd.to_path_buf())
}

fn find_ancestor_with(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".speclens")).unwrap();
        let other = TempDir::new().unwrap();
        let result = resolve_root_from(Some(other.path()), dir.path());
        assert_eq!(result, other.path());
    }

    #[test]
    fn finds_speclens_dir_above_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".speclens")).unwrap();
        let subdir = dir.path().join("src/deep");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(resolve_root_from(None, &subdir), dir.path());
    }

    #[test]
    fn speclens_dir_beats_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(nested.join(".speclens")).unwrap();
        let subdir = nested.join("docs");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(resolve_root_from(None, &subdir), nested);
    }

    #[test]
    fn falls_back_to_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let subdir = dir.path().join("a/b");
        std::fs::create_dir_all(&subdir).unwrap();

        assert_eq!(resolve_root_from(None, &subdir), dir.path());
    }
}
