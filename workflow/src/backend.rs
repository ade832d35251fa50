use crate::error::BackendError;
use crate::officer::Officer;
use crate::record::WorkflowId;
use crate::record::WorkflowRecord;
use crate::record::WorkflowStats;
use crate::timeline::ForwardStep;
use crate::timeline::Milestone;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Body of `POST /api/workflow/initiate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateRequest {
    pub initiator: String,
    pub officers: Vec<Officer>,
    pub timestamp: String,
}

/// Body of `POST /api/workflow/forward`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardRequest {
    pub step: ForwardStep,
    pub timestamp: String,
    pub initiator: String,
    pub officers: Vec<Officer>,
}

/// Success body of a mutating request. The backend does not promise a shape,
/// so the raw JSON is kept and probed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Acknowledgement {
    body: Value,
}

impl Acknowledgement {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn workflow_id(&self) -> Option<WorkflowId> {
        ["/id", "/workflowId", "/workflow/id"]
            .into_iter()
            .find_map(|pointer| self.body.pointer(pointer))
            .and_then(|value| match value {
                Value::Number(n) => Some(WorkflowId::new(n.to_string())),
                Value::String(s) => Some(WorkflowId::new(s.clone())),
                _ => None,
            })
    }

    /// The time the backend says it recorded `milestone`, if it said so.
    pub fn confirmed_at(&self, milestone: Milestone) -> Option<DateTime<Utc>> {
        let nested = format!("/workflow/timeline/{}", milestone.key());
        ["/timestamp", nested.as_str()]
            .into_iter()
            .filter_map(|pointer| self.body.pointer(pointer))
            .filter_map(Value::as_str)
            .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("unknown export format `{s}` (expected csv or json)")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// The REST service that stores workflows.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    async fn initiate(&self, request: &InitiateRequest) -> Result<Acknowledgement, BackendError>;

    async fn forward(&self, request: &ForwardRequest) -> Result<Acknowledgement, BackendError>;

    async fn list(&self) -> Result<Vec<WorkflowRecord>, BackendError>;

    async fn export(&self, format: ExportFormat) -> Result<String, BackendError>;

    async fn delete(&self, id: &WorkflowId) -> Result<DeleteOutcome, BackendError>;

    async fn stats(&self) -> Result<WorkflowStats, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::officer::Officer;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn forward_request_serializes_step_as_number() {
        let request = ForwardRequest {
            step: ForwardStep::LibraryProcessing,
            timestamp: "2024-05-01T08:00:00.000Z".into(),
            initiator: "J. Tan".into(),
            officers: vec![Officer::blank(1)],
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["step"], json!(4));
        assert_eq!(value["officers"][0]["id"], json!(1));
    }

    #[test]
    fn acknowledgement_prefers_top_level_timestamp() {
        let ack = Acknowledgement::new(json!({
            "id": 7,
            "timestamp": "2024-05-01T08:00:05.000Z",
        }));
        assert_eq!(ack.workflow_id(), Some(WorkflowId::new("7")));
        assert_eq!(
            ack.confirmed_at(Milestone::Initiated),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 5).single()
        );
    }

    #[test]
    fn acknowledgement_reads_nested_timeline() {
        let ack = Acknowledgement::new(json!({
            "workflow": {
                "id": "wf-3",
                "timeline": {"closedAt": "2024-05-02T10:00:00+08:00"}
            }
        }));
        assert_eq!(ack.workflow_id(), Some(WorkflowId::new("wf-3")));
        assert_eq!(
            ack.confirmed_at(Milestone::Closed),
            Utc.with_ymd_and_hms(2024, 5, 2, 2, 0, 0).single()
        );
        assert_eq!(ack.confirmed_at(Milestone::HandedToMs3), None);
        assert_eq!(Acknowledgement::default().confirmed_at(Milestone::Closed), None);
    }
}
