use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::case::file_part;
use crate::config::StorageConfig;
use crate::workflow::WorkflowResult;

use super::error::StorageError;
use super::SourceStore;

/// File-based storage.
///
/// Test sources live where the generation pipeline wrote them, addressed by
/// the file portion of the test's node id relative to the source root:
/// ```text
/// project/
///   tests/generated/test_auth.py      # "tests/generated/test_auth.py::test_login"
///   reports/healing_analysis.json     # persisted healing report
/// ```
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    report_path: PathBuf,
}

impl FileStore {
    /// Creates a FileStore rooted at the project directory.
    pub fn new(root: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        let root = root.into().join(&config.source_root);
        let report_path = root.join(&config.report_file);
        Self { root, report_path }
    }

    /// Resolves a test id to the file holding its source.
    ///
    /// Rejects ids that would escape the source root.
    fn source_path(&self, test_id: &str) -> Result<PathBuf, StorageError> {
        let file = file_part(test_id);
        let relative = Path::new(file);

        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if file.is_empty() || escapes {
            return Err(StorageError::InvalidTestId(test_id.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

impl SourceStore for FileStore {
    fn load_source(&self, test_id: &str) -> Result<String, StorageError> {
        let path = self.source_path(test_id)?;
        if !path.exists() {
            return Err(StorageError::SourceNotFound(test_id.to_string()));
        }

        fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))
    }

    fn save_source(&self, test_id: &str, source: &str) -> Result<(), StorageError> {
        let path = self.source_path(test_id)?;
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let mut content = source.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }

        fs::write(&path, content).map_err(|e| StorageError::io(&path, e))
    }

    fn save_report(&self, result: &WorkflowResult) -> Result<(), StorageError> {
        if let Some(parent) = self.report_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(result)?;
        fs::write(&self.report_path, json).map_err(|e| StorageError::io(&self.report_path, e))
    }

    fn load_report(&self) -> Result<WorkflowResult, StorageError> {
        let json = fs::read_to_string(&self.report_path)
            .map_err(|e| StorageError::io(&self.report_path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
