//! Local endpoint list persistence.
//!
//! The list lives on the client, as a JSON array in a file named after
//! the storage key (`~/.tine/file-contents.json`). The server never
//! stores it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::descriptor::{EndpointDescriptor, Scheme};

/// Key the list is stored under.
pub const STORAGE_KEY: &str = "file-contents";

/// Maximum file size for the endpoint list (1MB).
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum number of endpoints in a list.
pub const MAX_ENDPOINTS: usize = 1000;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// File too large.
    #[error("File too large (max {MAX_FILE_SIZE} bytes)")]
    FileTooLarge,

    /// List is full.
    #[error("Endpoint list is full (max {MAX_ENDPOINTS})")]
    ListFull,

    /// No endpoint at that position.
    #[error("No endpoint at index {0}")]
    NoSuchIndex(usize),
}

/// Ordered list of endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointList {
    endpoints: Vec<EndpointDescriptor>,
}

impl Default for EndpointList {
    /// A list seeded with one example endpoint.
    fn default() -> Self {
        Self {
            endpoints: vec![EndpointDescriptor::new(Scheme::Https, "google.com").with_name("XYZ")],
        }
    }
}

impl EndpointList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: Vec::new(),
        }
    }

    /// Creates a list from descriptors, keeping at most [`MAX_ENDPOINTS`].
    #[must_use]
    pub fn from_vec(mut endpoints: Vec<EndpointDescriptor>) -> Self {
        endpoints.truncate(MAX_ENDPOINTS);
        Self { endpoints }
    }

    /// Number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Iterates the endpoints in order.
    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.iter()
    }

    /// Returns the endpoint at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&EndpointDescriptor> {
        self.endpoints.get(index)
    }

    /// Appends an endpoint.
    pub fn push(&mut self, endpoint: EndpointDescriptor) -> Result<(), StorageError> {
        if self.endpoints.len() >= MAX_ENDPOINTS {
            return Err(StorageError::ListFull);
        }
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Removes and returns the endpoint at `index`.
    pub fn remove(&mut self, index: usize) -> Result<EndpointDescriptor, StorageError> {
        if index >= self.endpoints.len() {
            return Err(StorageError::NoSuchIndex(index));
        }
        Ok(self.endpoints.remove(index))
    }

    /// Returns the endpoints as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }
}

/// Reads and writes the endpoint list file.
#[derive(Debug, Clone)]
pub struct EndpointStorage {
    /// Path to the storage file.
    path: PathBuf,
}

impl Default for EndpointStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointStorage {
    /// Creates a storage manager with the default path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Creates a storage manager with a custom path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the default storage path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tine")
            .join(format!("{}.json", STORAGE_KEY))
    }

    /// Returns the storage path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the list, or the seeded default if nothing was saved yet.
    ///
    /// Entries that do not decode (a bad port, a wrong type) are skipped
    /// with a warning; the rest of the list still loads.
    pub fn load(&self) -> Result<EndpointList, StorageError> {
        if !self.path.exists() {
            return Ok(EndpointList::default());
        }

        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(StorageError::FileTooLarge);
        }

        let content = fs::read_to_string(&self.path)?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content)?;

        let mut endpoints = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<EndpointDescriptor>(entry) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(e) => warn!(
                    index,
                    path = %self.path.display(),
                    "Skipping unreadable endpoint: {}",
                    e
                ),
            }
        }

        Ok(EndpointList::from_vec(endpoints))
    }

    /// Saves the list.
    pub fn save(&self, list: &EndpointList) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(list.as_slice())?;

        // Write atomically (write to temp, then rename)
        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_list_is_seeded() {
        let list = EndpointList::default();
        assert_eq!(list.len(), 1);
        let first = list.get(0).unwrap();
        assert_eq!(first.name.as_deref(), Some("XYZ"));
        assert_eq!(first.query_url().as_deref(), Some("https://google.com"));
    }

    #[test]
    fn test_load_missing_returns_default() {
        let dir = TempDir::new().unwrap();
        let storage = EndpointStorage::with_path(dir.path().join("missing.json"));
        assert_eq!(storage.load().unwrap(), EndpointList::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let storage = EndpointStorage::with_path(dir.path().join("nested").join("list.json"));

        let mut list = EndpointList::new();
        list.push(EndpointDescriptor::new(Scheme::Ssh, "10.0.0.1").with_port(2222))
            .unwrap();
        list.push(EndpointDescriptor::new(Scheme::Http, "intranet").with_name("wiki"))
            .unwrap();
        storage.save(&list).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded, list);
        assert!(!dir.path().join("nested").join("list.tmp").exists());
    }

    #[test]
    fn test_load_reads_ui_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        fs::write(
            &path,
            r#"[{"name":"XYZ","format":"https","ipAddress":"google.com"},{"format":"ssh","ipAddress":"h","port":"22"}]"#,
        )
        .unwrap();

        let list = EndpointStorage::with_path(path).load().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).unwrap().port, Some(22));
    }

    #[test]
    fn test_load_skips_bad_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        fs::write(
            &path,
            r#"[{"name":"XYZ","format":"https","ipAddress":"google.com"},
                {"format":"ssh","ipAddress":"h","port":"22a"},
                {"format":"ssh","ipAddress":"z","port":0},
                "not an object",
                {"format":"http","ipAddress":"intranet","port":"8080"}]"#,
        )
        .unwrap();

        let storage = EndpointStorage::with_path(path);
        let mut list = storage.load().unwrap();
        let urls: Vec<_> = list.iter().filter_map(EndpointDescriptor::query_url).collect();
        assert_eq!(urls, vec!["https://google.com", "http://intranet:8080"]);

        // The remaining entries can still be edited and saved.
        list.remove(0).unwrap();
        storage.save(&list).unwrap();
        assert_eq!(storage.load().unwrap().len(), 1);
    }

    #[test]
    fn test_load_rejects_non_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, r#"{"name":"XYZ"}"#).unwrap();
        assert!(matches!(
            EndpointStorage::with_path(path).load(),
            Err(StorageError::Parse(_))
        ));
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut list = EndpointList::new();
        assert!(matches!(list.remove(0), Err(StorageError::NoSuchIndex(0))));
    }
}
