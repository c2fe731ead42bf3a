//! Filesystem locations

use std::env;
use std::path::{Component, Path, PathBuf};

/// Name of the per-user settings directory under the home directory
const APP_DIR: &str = ".linecon";

/// User home directory
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("USERPROFILE")
        .or_else(|| env::var_os("HOME"))
        .map(PathBuf::from)
}

/// `~/.linecon`, created on demand
pub fn app_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(APP_DIR);
    if !dir.exists() {
        let _ = std::fs::create_dir_all(&dir);
    }
    Some(dir)
}

/// Make a path absolute against the current directory without resolving
/// symlinks. `.` components are dropped.
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
