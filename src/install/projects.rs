// src/install/projects.rs

//! Discovery of independently installable projects in a workspace.

use std::path::{Path, PathBuf};

use globset::GlobSet;
use tracing::debug;

use crate::fs::FileSystem;

pub fn is_node_project(fs: &dyn FileSystem, dir: &Path) -> bool {
    fs.is_file(&dir.join("package.json"))
}

pub fn is_node_installed(fs: &dyn FileSystem, dir: &Path) -> bool {
    fs.exists(&dir.join("node_modules"))
}

pub fn is_git_checkout(fs: &dyn FileSystem, dir: &Path) -> bool {
    fs.exists(&dir.join(".git"))
}

/// Directory label relative to the workspace root (`.` for the root).
pub fn relative_label(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => dir.to_string_lossy().into_owned(),
    }
}

fn is_skipped_dir_name(name: &str) -> bool {
    name == "node_modules" || name.starts_with('.')
}

/// First-level directories of `root` whose name matches `globs`.
pub fn matching_subdirs(fs: &dyn FileSystem, root: &Path, globs: &GlobSet) -> Vec<PathBuf> {
    let entries = match fs.read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(root = ?root, error = %err, "cannot list workspace root");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter(|path| fs.is_dir(path))
        .filter(|path| {
            path.file_name()
                .map(|name| globs.is_match(Path::new(name)))
                .unwrap_or(false)
        })
        .collect()
}

/// Node projects of the workspace, in install order and without duplicates:
/// the root, each extra directory, then every glob-matched directory followed
/// by its one-level nested projects.
pub fn discover_node_projects(
    fs: &dyn FileSystem,
    root: &Path,
    extra: &[PathBuf],
    globs: &GlobSet,
) -> Vec<PathBuf> {
    let mut candidates = vec![root.to_path_buf()];
    candidates.extend(extra.iter().map(|dir| root.join(dir)));

    for dir in matching_subdirs(fs, root, globs) {
        candidates.push(dir.clone());
        if let Ok(children) = fs.read_dir(&dir) {
            for child in children {
                let skipped = child
                    .file_name()
                    .map(|n| is_skipped_dir_name(&n.to_string_lossy()))
                    .unwrap_or(true);
                if !skipped && fs.is_dir(&child) {
                    candidates.push(child);
                }
            }
        }
    }

    let mut projects: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if is_node_project(fs, &dir) && !projects.contains(&dir) {
            projects.push(dir);
        }
    }
    projects
}

/// Glob-matched directories of the workspace that are their own git checkout.
pub fn discover_git_checkouts(fs: &dyn FileSystem, root: &Path, globs: &GlobSet) -> Vec<PathBuf> {
    matching_subdirs(fs, root, globs)
        .into_iter()
        .filter(|dir| is_git_checkout(fs, dir))
        .collect()
}
