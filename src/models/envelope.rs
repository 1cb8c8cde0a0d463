//! Uniform response envelope returned by every tool.

use crate::error::DbResult;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Free-form diagnostic metadata (tool name, echoed inputs, counts).
pub type Metadata = serde_json::Map<String, JsonValue>;

/// Response status. Failures never reach the envelope; they are returned as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}

/// `{"status": ..., "metadata": ..., "results": ...}` with `metadata` omitted when empty.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub results: T,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap `results`. Empty metadata is treated the same as none.
    pub fn success(results: T, metadata: Option<Metadata>) -> Self {
        Self {
            status: Status::Success,
            metadata: metadata.filter(|m| !m.is_empty()),
            results,
        }
    }

    /// Serialize to compact JSON text.
    pub fn to_json_string(&self) -> DbResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build the envelope and serialize it in one step.
pub fn create_response<T: Serialize>(data: T, metadata: Option<Metadata>) -> DbResult<String> {
    Envelope::success(data, metadata).to_json_string()
}
