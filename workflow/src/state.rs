use crate::draft::WorkflowDraft;
use crate::engine::PendingTransition;
use anyhow::Context;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// The composing workflow and its unconfirmed transitions, kept on disk
/// between CLI invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub draft: WorkflowDraft,
    #[serde(default)]
    pub pending: Vec<PendingTransition>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(draft: WorkflowDraft, pending: Vec<PendingTransition>) -> Self {
        Self {
            draft,
            pending,
            saved_at: None,
        }
    }

    /// Reads the session at `path`, or starts a fresh one when it does not
    /// exist yet.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read session {}", path.display()))?;
        let state: SessionState =
            serde_json::from_str(&data).context("parse session state json")?;
        Ok(state)
    }

    pub fn save(&mut self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        self.saved_at = Some(Utc::now());
        let tmp_path = tmp_path(path);
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(&tmp_path, data)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to persist {}", path.display()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let mut file_name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    tmp.set_file_name(file_name);
    tmp
}
