use anyhow::{Context, Result};
use directories::ProjectDirs;
#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::rc::Rc;

pub const PROJECT_DIR: &str = ".taskboard";

/// Synchronous key-value blob store the board is persisted through.
pub trait Persistence {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, blob: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Explicit,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Explicit => "custom",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub dir: PathBuf,
    pub scope: StoreScope,
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Persistence for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {:?}", path)),
        }
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("creating {:?}", self.dir))?;
        let path = self.key_path(key);
        fs::write(&path, blob).with_context(|| format!("writing {:?}", path))?;
        Ok(())
    }
}

/// In-memory store. Clones share the same map, so a second handle can
/// observe what the first one wrote.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Persistence for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {:?}", dir))?;
    Ok(StoreLocation {
        dir,
        scope: StoreScope::Project,
    })
}

pub fn locate_store(start: &Path, explicit: Option<&Path>) -> Result<StoreLocation> {
    if let Some(dir) = explicit {
        return Ok(StoreLocation {
            dir: dir.to_path_buf(),
            scope: StoreScope::Explicit,
        });
    }
    if let Some(dir) = find_project_store(start) {
        return Ok(StoreLocation {
            dir,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        dir: global_store_dir()?,
        scope: StoreScope::Global,
    })
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "taskboard").context("locating data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_key_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("nested"));
        assert!(store.get("kanbanState").unwrap().is_none());
    }

    #[test]
    fn test_file_store_set_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(tmp.path().join("nested"));
        store.set("kanbanState", "{\"columns\":[]}").unwrap();
        assert!(tmp.path().join("nested/kanbanState.json").exists());
        assert_eq!(
            store.get("kanbanState").unwrap().as_deref(),
            Some("{\"columns\":[]}")
        );
    }

    #[test]
    fn test_memory_store_clones_share_entries() {
        let mut first = MemoryStore::new();
        let second = first.clone();
        first.set("k", "v").unwrap();
        assert_eq!(second.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_locate_prefers_explicit_then_project() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("repo");
        let nested = project.join("src/deep");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(project.join(PROJECT_DIR)).unwrap();

        let found = locate_store(&nested, None).unwrap();
        assert_eq!(found.scope, StoreScope::Project);
        assert_eq!(found.dir, project.join(PROJECT_DIR));

        let explicit = tmp.path().join("elsewhere");
        let found = locate_store(&nested, Some(&explicit)).unwrap();
        assert_eq!(found.scope, StoreScope::Explicit);
        assert_eq!(found.dir, explicit);
    }
}
