/*
[INPUT]:  Raw JSON from the intake endpoint
[OUTPUT]: Typed task identifiers and upload responses
[POS]:    Types layer - core data model
[UPDATE]: When the intake response schema changes
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier assigned by the intake service at submission time.
///
/// Immutable for the task's lifetime; names exactly one processing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Response body of `POST /api/upload`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "taskId")]
    pub task_id: TaskId,
}
