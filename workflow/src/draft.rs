use crate::error::ValidationError;
use crate::officer::Officer;
use crate::officer::OfficerField;
use crate::officer::OfficerId;
use crate::timeline::Timeline;
use crate::timeline::WorkflowStatus;
use serde::Deserialize;
use serde::Serialize;

/// Sequence number given to the first officer row of a fresh draft.
pub const DEFAULT_OFFICER_ID: OfficerId = 1;

/// The workflow being composed and progressed on this client.
///
/// Editing operations never mutate `self`; each returns the updated draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDraft {
    #[serde(default)]
    pub initiator: String,
    #[serde(default)]
    pub officers: Vec<Officer>,
    #[serde(default)]
    pub timeline: Timeline,
}

impl Default for WorkflowDraft {
    fn default() -> Self {
        Self {
            initiator: String::new(),
            officers: vec![Officer::blank(DEFAULT_OFFICER_ID)],
            timeline: Timeline::default(),
        }
    }
}

impl WorkflowDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initiator(&self, initiator: &str) -> Self {
        Self {
            initiator: initiator.to_string(),
            ..self.clone()
        }
    }

    pub fn status(&self) -> Option<WorkflowStatus> {
        self.timeline.status()
    }

    pub fn officer(&self, id: OfficerId) -> Option<&Officer> {
        self.officers.iter().find(|officer| officer.id == id)
    }

    /// One past the highest id in use. Ids are never reused, so a draft
    /// whose highest id is `OfficerId::MAX` has no id left to hand out.
    pub fn next_officer_id(&self) -> Result<OfficerId, ValidationError> {
        match self.officers.iter().map(|officer| officer.id).max() {
            None => Ok(DEFAULT_OFFICER_ID),
            Some(max) => max
                .checked_add(1)
                .ok_or(ValidationError::OfficerIdsExhausted(max)),
        }
    }

    pub fn add_officer(&self) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        next.officers.push(Officer::blank(self.next_officer_id()?));
        Ok(next)
    }

    /// Removing the last remaining row is a silent no-op.
    pub fn remove_officer(&self, id: OfficerId) -> Self {
        let mut next = self.clone();
        if next.officers.len() > 1 {
            next.officers.retain(|officer| officer.id != id);
        }
        next
    }

    /// An unknown `id` leaves the draft unchanged; only an invalid approval
    /// value is reported.
    pub fn update_officer_field(
        &self,
        id: OfficerId,
        field: OfficerField,
        value: &str,
    ) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        if let Some(officer) = next.officers.iter_mut().find(|officer| officer.id == id) {
            officer.set(field, value)?;
        }
        Ok(next)
    }

    /// Officer rows are deliberately not checked; blank rows may be submitted.
    pub fn validate_for_initiation(&self) -> Result<(), ValidationError> {
        if self.initiator.trim().is_empty() {
            return Err(ValidationError::EmptyInitiator);
        }
        Ok(())
    }
}
