use crate::domain::ports::Storage;
use crate::utils::error::{AllocError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage kept in process memory. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }

    fn children(files: &BTreeMap<String, Vec<u8>>, dir: &str, want_dirs: bool) -> Vec<String> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir.trim_end_matches('/'))
        };

        let mut names: Vec<String> = files
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter_map(|rest| match rest.split_once('/') {
                Some((sub, _)) if want_dirs => Some(sub.to_string()),
                None if !want_dirs => Some(rest.to_string()),
                _ => None,
            })
            .collect();
        names.dedup();
        names
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            AllocError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn create_file(&self, path: &str, data: &[u8]) -> Result<bool> {
        let mut files = self.files.lock().await;
        if files.contains_key(path) {
            return Ok(false);
        }
        files.insert(path.to_string(), data.to_vec());
        Ok(true)
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let mut files = self.files.lock().await;
        files.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let files = self.files.lock().await;
        Ok(files.contains_key(path))
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let files = self.files.lock().await;
        Ok(Self::children(&files, dir, false))
    }

    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>> {
        let files = self.files.lock().await;
        Ok(Self::children(&files, dir, true))
    }
}
