// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem whose files can grow or disappear while a test is
/// running. Clones share the same underlying table.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("/"), MockEntry::Dir);

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), MockEntry::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), MockEntry::Dir);
    }

    /// Append bytes to an existing file, simulating a writer that is still
    /// busy. Creates the file if it does not exist yet.
    pub fn append(&self, path: impl AsRef<Path>, content: &[u8]) {
        let mut files = self.files.lock().unwrap();
        match files
            .entry(path.as_ref().to_path_buf())
            .or_insert_with(|| MockEntry::File(Vec::new()))
        {
            MockEntry::File(data) => data.extend_from_slice(content),
            MockEntry::Dir => {}
        }
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn file_size(&self, path: &Path) -> io::Result<u64> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(content)) => Ok(content.len() as u64),
            Some(MockEntry::Dir) => Ok(0),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {:?}", path),
            )),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Dir))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Paths are stored as given; only existence is checked.
        let files = self.files.lock().unwrap();
        if files.contains_key(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("No such file or directory: {:?}", path))
        }
    }
}
