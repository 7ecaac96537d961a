// src/fs/mock.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use parking_lot::Mutex;

use super::FileSystem;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(String),
    Dir(BTreeSet<String>), // child names
}

/// In-memory workspace tree for tests.
///
/// Adding a file or directory creates its missing parents.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(&mut entries, parent);
        }
        Self::link_child(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut entries = self.entries.lock();
        Self::ensure_dir(&mut entries, path.as_ref());
    }

    fn ensure_dir(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if path.as_os_str().is_empty() || entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir(BTreeSet::new()));
        if let Some(parent) = path.parent() {
            Self::ensure_dir(entries, parent);
        }
        Self::link_child(entries, path);
    }

    fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            children.insert(name.to_string_lossy().into_owned());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.entries.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entries.lock().get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.entries.lock().get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
