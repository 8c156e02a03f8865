//! Remote storage operations abstraction for testability
//!
//! This module provides a trait-based abstraction over the remote folder
//! tree, enabling dependency injection and an in-memory mock for tests.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Mime type the remote service uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Mime type artifacts are uploaded with
pub const ARTIFACT_MIME_TYPE: &str = "text/plain";

/// A remote file or folder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Abstraction for remote storage operations, enabling mocking in tests
pub trait DriveOperations: Send + Sync {
    /// List the non-trashed children of a folder (all pages)
    fn list_children(&self, parent_id: &str) -> Result<Vec<DriveFile>>;

    /// Create a folder and return its id
    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Upload a local file into a folder under its own file name; returns the new id
    fn upload_file(&self, parent_id: &str, path: &Path) -> Result<String>;

    /// Delete a file or folder by id
    fn delete_file(&self, file_id: &str) -> Result<()>;
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Recorded operation call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum DriveCall {
        List { parent_id: String },
        CreateFolder { name: String, parent_id: String },
        Upload { name: String, parent_id: String },
        Delete { file_id: String },
    }

    /// An entry of the in-memory remote tree
    #[derive(Clone, Debug)]
    pub struct MockEntry {
        pub file: DriveFile,
        pub parent_id: String,
        pub content: Option<String>,
    }

    /// In-memory remote tree
    #[derive(Clone, Default)]
    pub struct MockDriveOps {
        /// Recorded operation calls
        pub calls: Arc<Mutex<Vec<DriveCall>>>,
        /// Every entry currently stored
        pub entries: Arc<Mutex<Vec<MockEntry>>>,
        next_id: Arc<Mutex<u64>>,
        /// Whether list_children should fail
        pub should_fail_list: Arc<Mutex<bool>>,
        /// Whether create_folder should fail
        pub should_fail_create: Arc<Mutex<bool>>,
        /// Whether upload_file should fail
        pub should_fail_upload: Arc<Mutex<bool>>,
        /// Ids whose deletion fails
        pub failing_deletes: Arc<Mutex<HashSet<String>>>,
    }

    impl MockDriveOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure list_children to fail
        pub fn with_failing_list(self) -> Self {
            *self.should_fail_list.lock().unwrap() = true;
            self
        }

        /// Configure create_folder to fail
        pub fn with_failing_create(self) -> Self {
            *self.should_fail_create.lock().unwrap() = true;
            self
        }

        /// Configure upload_file to fail
        pub fn with_failing_upload(self) -> Self {
            *self.should_fail_upload.lock().unwrap() = true;
            self
        }

        /// Configure deletion of one id to fail
        pub fn with_failing_delete(self, file_id: &str) -> Self {
            self.failing_deletes.lock().unwrap().insert(file_id.to_string());
            self
        }

        /// Toggle list failures after construction
        pub fn set_failing_list(&self, failing: bool) {
            *self.should_fail_list.lock().unwrap() = failing;
        }

        /// Seed a folder without recording a call
        pub fn add_folder(&self, name: &str, parent_id: &str) -> String {
            self.insert(name, parent_id, FOLDER_MIME_TYPE, None)
        }

        /// Seed a plain file without recording a call
        pub fn add_file(&self, name: &str, parent_id: &str) -> String {
            self.insert(name, parent_id, ARTIFACT_MIME_TYPE, Some(String::new()))
        }

        fn insert(&self, name: &str, parent_id: &str, mime_type: &str, content: Option<String>) -> String {
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                format!("id-{}", *next)
            };
            self.entries.lock().unwrap().push(MockEntry {
                file: DriveFile {
                    id: id.clone(),
                    name: name.to_string(),
                    mime_type: mime_type.to_string(),
                },
                parent_id: parent_id.to_string(),
                content,
            });
            id
        }

        /// Children of a folder, in insertion order
        pub fn children(&self, parent_id: &str) -> Vec<DriveFile> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.parent_id == parent_id)
                .map(|e| e.file.clone())
                .collect()
        }

        /// Names of the children of a folder, sorted
        pub fn child_names(&self, parent_id: &str) -> Vec<String> {
            let mut names: Vec<String> = self.children(parent_id).into_iter().map(|f| f.name).collect();
            names.sort();
            names
        }

        /// Stored content of an uploaded file
        pub fn content_of(&self, parent_id: &str, name: &str) -> Option<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.parent_id == parent_id && e.file.name == name)
                .and_then(|e| e.content.clone())
        }

        /// Total number of folders stored
        pub fn folder_count(&self) -> usize {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.file.is_folder())
                .count()
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<DriveCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Number of folders created through the trait
        pub fn created_folders(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c, DriveCall::CreateFolder { .. }))
                .count()
        }

        /// Check if any upload was attempted
        pub fn upload_called(&self) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| matches!(c, DriveCall::Upload { .. }))
        }

        /// Check if any delete was attempted
        pub fn delete_called(&self) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| matches!(c, DriveCall::Delete { .. }))
        }

        fn record(&self, call: DriveCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl DriveOperations for MockDriveOps {
        fn list_children(&self, parent_id: &str) -> Result<Vec<DriveFile>> {
            self.record(DriveCall::List {
                parent_id: parent_id.to_string(),
            });

            if *self.should_fail_list.lock().unwrap() {
                return Err(anyhow!("Mock list failure"));
            }

            Ok(self.children(parent_id))
        }

        fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
            self.record(DriveCall::CreateFolder {
                name: name.to_string(),
                parent_id: parent_id.to_string(),
            });

            if *self.should_fail_create.lock().unwrap() {
                return Err(anyhow!("Mock create failure"));
            }

            Ok(self.add_folder(name, parent_id))
        }

        fn upload_file(&self, parent_id: &str, path: &Path) -> Result<String> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| anyhow!("Upload path has no file name: {:?}", path))?;

            self.record(DriveCall::Upload {
                name: name.clone(),
                parent_id: parent_id.to_string(),
            });

            if *self.should_fail_upload.lock().unwrap() {
                return Err(anyhow!("Mock upload failure"));
            }

            let content = std::fs::read_to_string(path)?;
            Ok(self.insert(&name, parent_id, ARTIFACT_MIME_TYPE, Some(content)))
        }

        fn delete_file(&self, file_id: &str) -> Result<()> {
            self.record(DriveCall::Delete {
                file_id: file_id.to_string(),
            });

            if self.failing_deletes.lock().unwrap().contains(file_id) {
                return Err(anyhow!("Mock delete failure for {}", file_id));
            }

            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| e.file.id != file_id);
            if entries.len() == before {
                return Err(anyhow!("File not found: {}", file_id));
            }
            Ok(())
        }
    }
}
