use crate::officer::Officer;
use crate::timeline::Timeline;
use crate::timeline::WorkflowStatus;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use std::fmt;

/// Server-assigned workflow identifier. The backend may send it as a number
/// or a string; it is kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkflowId(String);

impl WorkflowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for WorkflowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => WorkflowId(n.to_string()),
            Raw::Text(s) => WorkflowId(s),
        })
    }
}

/// A workflow as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    #[serde(default)]
    pub initiator: String,
    #[serde(default)]
    pub officers: Vec<Officer>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timeline: Timeline,
}

impl WorkflowRecord {
    /// Whatever `status` the backend sent is ignored; it is recomputed from
    /// the timeline.
    pub fn status(&self) -> Option<WorkflowStatus> {
        self.timeline.status()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowStats {
    pub total_workflows: u64,
    pub in_progress_workflows: u64,
    pub closed_workflows: u64,
    pub total_officers: u64,
}
