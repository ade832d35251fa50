use crate::timeline::Milestone;
use thiserror::Error;

/// Problems with the composing workflow that block an action before any
/// request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter initiator name")]
    EmptyInitiator,
    #[error("invalid approval `{0}` (expected approved, rejected, pending or empty)")]
    InvalidApproval(String),
    #[error("unknown officer field `{0}`")]
    UnknownField(String),
    #[error("no officer id left after {0}")]
    OfficerIdsExhausted(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend answered and explicitly rejected the request.
    #[error("{message}")]
    Application { status: u16, message: String },
    /// The request never produced a response.
    #[error("backend not available: {0}")]
    Transport(String),
    #[error(
        "Backend API endpoint not found. Make sure backend server is running with correct routes."
    )]
    UnexpectedContent,
    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("`{milestone}` cannot be recorded before `{missing}`")]
    PrecedesPrerequisite {
        milestone: Milestone,
        missing: Milestone,
    },
    #[error("`{0}` has already been recorded")]
    AlreadyRecorded(Milestone),
    #[error("`{milestone}` is not yet confirmed by the backend: {reason}")]
    Unconfirmed { milestone: Milestone, reason: String },
    #[error("workflow is already closed")]
    AlreadyClosed,
    #[error("another update for this workflow is still in flight")]
    MutationInFlight,
    #[error(transparent)]
    Backend(#[from] BackendError),
}
