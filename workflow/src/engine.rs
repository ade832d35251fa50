use crate::backend::Acknowledgement;
use crate::backend::ForwardRequest;
use crate::backend::InitiateRequest;
use crate::backend::WorkflowBackend;
use crate::draft::WorkflowDraft;
use crate::error::BackendError;
use crate::error::ProgressionError;
use crate::error::ValidationError;
use crate::timeline::ForwardStep;
use crate::timeline::Milestone;
use crate::timeline::iso_timestamp;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What to do when a request could not reach the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Commit locally, queue the transition as unconfirmed and carry on.
    #[default]
    Optimistic,
    /// Report the transport failure and leave the timeline untouched.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingState {
    Unconfirmed,
    Rejected,
}

/// A transition committed locally that the backend has not acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransition {
    pub milestone: Milestone,
    pub timestamp: DateTime<Utc>,
    pub state: PendingState,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Confirmed {
        milestone: Milestone,
        at: DateTime<Utc>,
        ack: Acknowledgement,
    },
    /// Committed locally after a transport failure.
    Degraded {
        milestone: Milestone,
        at: DateTime<Utc>,
        reason: String,
    },
}

impl Outcome {
    pub fn milestone(&self) -> Milestone {
        match self {
            Outcome::Confirmed { milestone, .. } | Outcome::Degraded { milestone, .. } => *milestone,
        }
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        match self {
            Outcome::Confirmed { at, .. } | Outcome::Degraded { at, .. } => *at,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    /// User-facing notice for this outcome.
    pub fn notice(&self) -> String {
        let milestone = self.milestone();
        match (self, milestone.forward_step()) {
            (Outcome::Confirmed { .. }, None) => "Workflow initiated successfully!".to_string(),
            (Outcome::Confirmed { .. }, Some(step)) => format!(
                "Request forwarded successfully at step {}!",
                step.number()
            ),
            (Outcome::Degraded { .. }, None) => {
                "Workflow initiated locally (backend not available)".to_string()
            }
            (Outcome::Degraded { .. }, Some(step)) => format!(
                "Step {} completed locally (backend not available)",
                step.number()
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub confirmed: Vec<Milestone>,
    /// The transition the backend refused, which blocks everything queued
    /// after it.
    pub rejected: Option<(Milestone, String)>,
    pub remaining: usize,
}

#[derive(Debug, Default)]
struct EngineState {
    draft: WorkflowDraft,
    pending: Vec<PendingTransition>,
}

/// Drives one workflow through its timeline against a backend.
///
/// Only one mutating call (`initiate`, `forward`, `reconcile`, `reset`) may
/// be in flight at a time; a concurrent one fails with
/// [`ProgressionError::MutationInFlight`]. The draft lock is never held
/// across a backend call.
pub struct ProgressionEngine {
    backend: Arc<dyn WorkflowBackend>,
    clock: Arc<dyn Clock>,
    policy: FallbackPolicy,
    state: Mutex<EngineState>,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ProgressionEngine {
    pub fn new(backend: Arc<dyn WorkflowBackend>, policy: FallbackPolicy) -> Self {
        Self {
            backend,
            clock: Arc::new(SystemClock),
            policy,
            state: Mutex::new(EngineState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Resumes a previously saved draft together with its unconfirmed
    /// transitions.
    pub fn with_state(self, draft: WorkflowDraft, pending: Vec<PendingTransition>) -> Self {
        Self {
            state: Mutex::new(EngineState { draft, pending }),
            ..self
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub async fn snapshot(&self) -> WorkflowDraft {
        self.state.lock().await.draft.clone()
    }

    pub async fn pending(&self) -> Vec<PendingTransition> {
        self.state.lock().await.pending.clone()
    }

    pub fn into_parts(self) -> (WorkflowDraft, Vec<PendingTransition>) {
        let state = self.state.into_inner();
        (state.draft, state.pending)
    }

    fn begin_mutation(&self) -> Result<InFlightGuard<'_>, ProgressionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ProgressionError::MutationInFlight)?;
        Ok(InFlightGuard(&self.in_flight))
    }

    /// The initiator is frozen once the workflow has been initiated.
    pub async fn set_initiator(&self, initiator: &str) -> Result<(), ProgressionError> {
        let mut state = self.state.lock().await;
        if state.draft.timeline.initiated_at.is_some() {
            return Err(ProgressionError::AlreadyRecorded(Milestone::Initiated));
        }
        state.draft = state.draft.with_initiator(initiator);
        Ok(())
    }

    /// Applies an officer edit; anything other than the officer list in the
    /// returned draft is discarded.
    pub async fn edit_officers<F>(&self, edit: F) -> Result<WorkflowDraft, ValidationError>
    where
        F: FnOnce(&WorkflowDraft) -> Result<WorkflowDraft, ValidationError>,
    {
        let mut state = self.state.lock().await;
        let edited = edit(&state.draft)?;
        state.draft.officers = edited.officers;
        Ok(state.draft.clone())
    }

    /// Starts over with a fresh draft, dropping any queued transitions.
    pub async fn reset(&self, initiator: Option<&str>) -> Result<(), ProgressionError> {
        let _guard = self.begin_mutation()?;
        let mut state = self.state.lock().await;
        if !state.pending.is_empty() {
            warn!(
                pending = state.pending.len(),
                "discarding unconfirmed transitions"
            );
        }
        let fresh = WorkflowDraft::new();
        state.draft = match initiator {
            Some(name) => fresh.with_initiator(name),
            None => fresh,
        };
        state.pending.clear();
        Ok(())
    }

    pub async fn initiate(&self) -> Result<Outcome, ProgressionError> {
        let _guard = self.begin_mutation()?;
        {
            let state = self.state.lock().await;
            state.draft.validate_for_initiation()?;
            state.draft.timeline.admit(Milestone::Initiated)?;
        }
        if let Some(outcome) = self.drain_before(Milestone::Initiated).await? {
            return Ok(outcome);
        }
        let (request, at) = {
            let state = self.state.lock().await;
            let at = self.clock.now();
            let request = InitiateRequest {
                initiator: state.draft.initiator.clone(),
                officers: state.draft.officers.clone(),
                timestamp: iso_timestamp(&at),
            };
            (request, at)
        };
        debug!(initiator = %request.initiator, officers = request.officers.len(), "sending initiate request");
        let result = self.backend.initiate(&request).await;
        self.settle(Milestone::Initiated, at, result).await
    }

    pub async fn forward(&self, step: ForwardStep) -> Result<Outcome, ProgressionError> {
        let _guard = self.begin_mutation()?;
        let milestone = step.milestone();
        self.state.lock().await.draft.timeline.admit(milestone)?;
        if let Some(outcome) = self.drain_before(milestone).await? {
            return Ok(outcome);
        }
        let (request, at) = {
            let state = self.state.lock().await;
            let at = self.clock.now();
            let request = ForwardRequest {
                step,
                timestamp: iso_timestamp(&at),
                initiator: state.draft.initiator.clone(),
                officers: state.draft.officers.clone(),
            };
            (request, at)
        };
        debug!(step = step.number(), "sending forward request");
        let result = self.backend.forward(&request).await;
        self.settle(milestone, at, result).await
    }

    /// Earlier unconfirmed transitions go to the backend before `milestone`
    /// does. If any is still unconfirmed afterwards, `milestone` is queued
    /// behind it without a request (or refused under the strict policy).
    async fn drain_before(
        &self,
        milestone: Milestone,
    ) -> Result<Option<Outcome>, ProgressionError> {
        if self.state.lock().await.pending.is_empty() {
            return Ok(None);
        }
        self.replay().await;

        let mut state = self.state.lock().await;
        let Some(blocking) = state.pending.first() else {
            return Ok(None);
        };
        let blocking_milestone = blocking.milestone;
        if self.policy == FallbackPolicy::Strict {
            let reason = blocking.last_error.clone().unwrap_or_default();
            warn!(%milestone, blocking = %blocking_milestone, %reason, "milestone not recorded");
            return Err(ProgressionError::Unconfirmed {
                milestone: blocking_milestone,
                reason,
            });
        }
        let at = self.clock.now();
        let reason = format!("waiting for `{blocking_milestone}` to be confirmed");
        state.draft.timeline.record(milestone, at);
        state.pending.push(PendingTransition {
            milestone,
            timestamp: at,
            state: PendingState::Unconfirmed,
            attempts: 0,
            last_error: Some(reason.clone()),
        });
        warn!(%milestone, %reason, "milestone queued behind unconfirmed transitions");
        Ok(Some(Outcome::Degraded {
            milestone,
            at,
            reason,
        }))
    }

    async fn settle(
        &self,
        milestone: Milestone,
        captured: DateTime<Utc>,
        result: Result<Acknowledgement, BackendError>,
    ) -> Result<Outcome, ProgressionError> {
        let mut state = self.state.lock().await;
        match result {
            Ok(ack) => {
                let floor = milestone
                    .previous()
                    .and_then(|previous| state.draft.timeline.get(previous));
                let at = match ack.confirmed_at(milestone) {
                    Some(server) if floor.is_none_or(|floor| server >= floor) => server,
                    Some(server) => {
                        warn!(
                            %milestone,
                            server = %iso_timestamp(&server),
                            "server timestamp precedes the previous milestone, keeping local time"
                        );
                        captured
                    }
                    None => captured,
                };
                state.draft.timeline.record(milestone, at);
                info!(%milestone, at = %iso_timestamp(&at), "milestone confirmed");
                Ok(Outcome::Confirmed { milestone, at, ack })
            }
            Err(err) if err.is_transport() && self.policy == FallbackPolicy::Optimistic => {
                let reason = err.to_string();
                state.draft.timeline.record(milestone, captured);
                state.pending.push(PendingTransition {
                    milestone,
                    timestamp: captured,
                    state: PendingState::Unconfirmed,
                    attempts: 1,
                    last_error: Some(reason.clone()),
                });
                warn!(%milestone, %reason, "backend unavailable, milestone committed locally");
                Ok(Outcome::Degraded {
                    milestone,
                    at: captured,
                    reason,
                })
            }
            Err(err) => {
                warn!(%milestone, error = %err, "milestone not recorded");
                Err(err.into())
            }
        }
    }

    /// Replays unconfirmed transitions in the order they were committed.
    /// Stops at the first transport failure or rejection; the timeline
    /// itself is never rolled back.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ProgressionError> {
        let _guard = self.begin_mutation()?;
        Ok(self.replay().await)
    }

    async fn replay(&self) -> ReconcileReport {
        let (draft, queued) = {
            let state = self.state.lock().await;
            (state.draft.clone(), state.pending.clone())
        };

        let mut report = ReconcileReport::default();
        for entry in queued {
            if entry.state == PendingState::Rejected {
                report.rejected = Some((
                    entry.milestone,
                    entry.last_error.clone().unwrap_or_default(),
                ));
                break;
            }
            let timestamp = iso_timestamp(&entry.timestamp);
            let result = match entry.milestone.forward_step() {
                None => {
                    let request = InitiateRequest {
                        initiator: draft.initiator.clone(),
                        officers: draft.officers.clone(),
                        timestamp,
                    };
                    self.backend.initiate(&request).await
                }
                Some(step) => {
                    let request = ForwardRequest {
                        step,
                        timestamp,
                        initiator: draft.initiator.clone(),
                        officers: draft.officers.clone(),
                    };
                    self.backend.forward(&request).await
                }
            };

            let mut state = self.state.lock().await;
            let Some(slot) = state
                .pending
                .iter()
                .position(|queued| queued.milestone == entry.milestone)
            else {
                continue;
            };
            match result {
                Ok(_) => {
                    state.pending.remove(slot);
                    info!(milestone = %entry.milestone, "unconfirmed milestone acknowledged");
                    report.confirmed.push(entry.milestone);
                }
                Err(err) => {
                    let message = err.to_string();
                    let pending = &mut state.pending[slot];
                    pending.attempts += 1;
                    pending.last_error = Some(message.clone());
                    if err.is_transport() {
                        warn!(milestone = %entry.milestone, %message, "backend still unavailable");
                    } else {
                        pending.state = PendingState::Rejected;
                        warn!(milestone = %entry.milestone, %message, "backend rejected unconfirmed milestone");
                        report.rejected = Some((entry.milestone, message));
                    }
                    break;
                }
            }
        }

        report.remaining = self.state.lock().await.pending.len();
        report
    }
}
