use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single generated test under management.
///
/// The identifier is the runner's node id (`path/to/file.py::test_name`) and
/// is stable across reruns. The source text is the only field healing is
/// allowed to rewrite; the identifier and category tag must survive every
/// repair untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique, stable identifier (runner node id).
    pub id: String,
    /// Current source text of the test.
    pub source: String,
    /// Category tag assigned by the generation pipeline (e.g. "functional",
    /// "performance", "security"). Opaque to the healing core.
    pub category: Option<String>,
}

impl TestCase {
    /// Creates a test case with no category tag.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            category: None,
        }
    }

    /// Sets the category tag.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The file portion of the node id, without the `::test_name` suffix.
    pub fn file_path(&self) -> &str {
        file_part(&self.id)
    }
}

/// One failing execution of a test, as reported by the test runner.
///
/// Immutable once created; reruns during healing produce fresh diagnostics
/// on the in-flight case state, never on the originating failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    /// Node id of the failing test.
    pub test_id: String,
    /// Error message / traceback text captured by the runner.
    pub diagnostic: String,
    /// When the originating test run observed the failure.
    pub occurred_at: DateTime<Utc>,
}

impl Failure {
    pub fn new(test_id: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            diagnostic: diagnostic.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Splits the file portion off a runner node id.
pub(crate) fn file_part(node_id: &str) -> &str {
    node_id.split("::").next().unwrap_or(node_id)
}
