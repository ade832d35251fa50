mod backend;
mod config;
mod draft;
mod engine;
mod error;
mod export;
mod http;
mod layout;
mod officer;
mod query;
mod record;
mod state;
mod timeline;

pub use backend::Acknowledgement;
pub use backend::DeleteOutcome;
pub use backend::ExportFormat;
pub use backend::ForwardRequest;
pub use backend::InitiateRequest;
pub use backend::WorkflowBackend;
pub use config::ClientConfig;
pub use config::DEFAULT_BACKEND_URL;
pub use draft::DEFAULT_OFFICER_ID;
pub use draft::WorkflowDraft;
pub use engine::Clock;
pub use engine::FallbackPolicy;
pub use engine::Outcome;
pub use engine::PendingState;
pub use engine::PendingTransition;
pub use engine::ProgressionEngine;
pub use engine::ReconcileReport;
pub use engine::SystemClock;
pub use error::BackendError;
pub use error::ProgressionError;
pub use error::ValidationError;
pub use export::ExportView;
pub use export::bulk_file_name;
pub use export::workflow_file_name;
pub use export::workflow_json;
pub use export::write_export;
pub use http::HttpBackend;
pub use layout::SessionLayout;
pub use officer::Approval;
pub use officer::ApprovalAuthority;
pub use officer::Officer;
pub use officer::OfficerField;
pub use officer::OfficerId;
pub use query::DateWindow;
pub use query::ListSummary;
pub use query::OfficerEntry;
pub use query::WorkflowFilter;
pub use query::deputation_counts;
pub use query::officer_rollup;
pub use query::status_counts;
pub use query::summarize;
pub use record::WorkflowId;
pub use record::WorkflowRecord;
pub use record::WorkflowStats;
pub use state::SessionState;
pub use timeline::ForwardStep;
pub use timeline::Milestone;
pub use timeline::Timeline;
pub use timeline::WorkflowStatus;
pub use timeline::iso_timestamp;
