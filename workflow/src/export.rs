use crate::backend::ExportFormat;
use crate::layout::sanitize;
use crate::record::WorkflowRecord;
use anyhow::Context;
use chrono::NaiveDate;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Which screen a bulk export is taken from; the two name their files
/// differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportView {
    #[default]
    Dashboard,
    List,
}

/// `workflow-{id}-{initiator}.json`
pub fn workflow_file_name(record: &WorkflowRecord) -> String {
    format!(
        "workflow-{}-{}.json",
        sanitize(record.id.as_str()),
        sanitize(&record.initiator)
    )
}

pub fn bulk_file_name(view: ExportView, format: ExportFormat, date: NaiveDate) -> String {
    let date = date.format("%Y-%m-%d");
    match view {
        ExportView::Dashboard => format!("workflows_{date}.{}", format.as_str()),
        ExportView::List => format!("all-workflows-{date}.{}", format.as_str()),
    }
}

/// Pretty-printed JSON for a single workflow, including its derived status.
pub fn workflow_json(record: &WorkflowRecord) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(record).context("serialize workflow")?;
    if let Value::Object(map) = &mut value {
        let status = record
            .status()
            .map_or(Value::Null, |status| Value::String(status.as_str().to_string()));
        map.insert("status".to_string(), status);
    }
    serde_json::to_string_pretty(&value).context("render workflow json")
}

pub fn write_export(dir: &Path, file_name: &str, contents: &str) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::WorkflowId;
    use crate::timeline::Timeline;
    use chrono::TimeZone;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record() -> WorkflowRecord {
        WorkflowRecord {
            id: WorkflowId::new("7"),
            initiator: "J. Tan".into(),
            officers: Vec::new(),
            created_at: None,
            updated_at: None,
            timeline: Timeline {
                initiated_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single(),
                ..Timeline::default()
            },
        }
    }

    #[test]
    fn names_single_and_bulk_exports() {
        assert_eq!(workflow_file_name(&record()), "workflow-7-J._Tan.json");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("date");
        assert_eq!(
            bulk_file_name(ExportView::Dashboard, ExportFormat::Json, date),
            "workflows_2024-05-01.json"
        );
        assert_eq!(
            bulk_file_name(ExportView::List, ExportFormat::Csv, date),
            "all-workflows-2024-05-01.csv"
        );
    }

    #[test]
    fn single_export_carries_status_and_is_written() {
        let rendered = workflow_json(&record()).expect("json");
        let value: Value = serde_json::from_str(&rendered).expect("parse");
        assert_eq!(value["status"], "initiated");
        assert_eq!(value["timeline"]["initiatedAt"], "2024-05-01T08:00:00Z");
        assert!(rendered.contains("\n  \"id\": \"7\""));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_export(&dir.path().join("out"), "x.json", &rendered).expect("write");
        assert_eq!(fs::read_to_string(path).expect("read"), rendered);
    }
}
