use crate::backend::Acknowledgement;
use crate::backend::DeleteOutcome;
use crate::backend::ExportFormat;
use crate::backend::ForwardRequest;
use crate::backend::InitiateRequest;
use crate::backend::WorkflowBackend;
use crate::config::ClientConfig;
use crate::error::BackendError;
use crate::record::WorkflowId;
use crate::record::WorkflowRecord;
use crate::record::WorkflowStats;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// [`WorkflowBackend`] over the backend's JSON REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowListResponse {
    #[serde(default)]
    workflows: Vec<WorkflowRecord>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build().map_err(transport)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, BackendError> {
        Self::new(&config.backend_url, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        fallback_message: &str,
    ) -> Result<Acknowledgement, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, fallback_message).await?;
        let text = response.text().await.map_err(transport)?;
        // Acknowledgement bodies are informational; a non-JSON body is
        // still a success.
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        debug!(path, %body, "backend acknowledged");
        Ok(Acknowledgement::new(body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback_message: &str,
    ) -> Result<T, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, fallback_message).await?;
        let text = response.text().await.map_err(transport)?;
        serde_json::from_str(&text).map_err(|err| BackendError::Decode(err.to_string()))
    }
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
    async fn initiate(&self, request: &InitiateRequest) -> Result<Acknowledgement, BackendError> {
        self.post("/api/workflow/initiate", request, "Failed to initiate workflow")
            .await
    }

    async fn forward(&self, request: &ForwardRequest) -> Result<Acknowledgement, BackendError> {
        self.post("/api/workflow/forward", request, "Failed to forward request")
            .await
    }

    async fn list(&self) -> Result<Vec<WorkflowRecord>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/workflow"))
            .send()
            .await
            .map_err(transport)?;
        // A missing route tends to come back as an HTML page rather than an
        // error status, so the content type is checked first.
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        if !is_json {
            return Err(BackendError::UnexpectedContent);
        }
        let response = ensure_success(response, "Failed to load workflows").await?;
        let text = response.text().await.map_err(transport)?;
        let parsed: WorkflowListResponse =
            serde_json::from_str(&text).map_err(|err| BackendError::Decode(err.to_string()))?;
        Ok(parsed.workflows)
    }

    async fn export(&self, format: ExportFormat) -> Result<String, BackendError> {
        let response = self
            .client
            .get(self.url("/api/workflow/export"))
            .query(&[("format", format.as_str())])
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, "Export failed").await?;
        response.text().await.map_err(transport)
    }

    async fn delete(&self, id: &WorkflowId) -> Result<DeleteOutcome, BackendError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/workflow/{id}")))
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        ensure_success(response, "Failed to delete workflow").await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn stats(&self) -> Result<WorkflowStats, BackendError> {
        self.get_json("/api/stats", "Failed to load statistics").await
    }
}

fn transport(err: reqwest::Error) -> BackendError {
    BackendError::Transport(err.to_string())
}

async fn ensure_success(
    response: Response,
    fallback_message: &str,
) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(application_error(status.as_u16(), &body, fallback_message))
}

/// Error bodies are either JSON carrying `error` or `message`, or plain text.
fn application_error(status: u16, body: &str, fallback_message: &str) -> BackendError {
    let message = match serde_json::from_str::<Value>(body) {
        Ok(value) => ["error", "message"]
            .into_iter()
            .find_map(|key| value.get(key).and_then(Value::as_str))
            .unwrap_or(fallback_message)
            .to_string(),
        Err(_) => format!("Server error: {status} - {body}"),
    };
    BackendError::Application { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::officer::Officer;
    use crate::timeline::ForwardStep;
    use crate::timeline::WorkflowStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::matchers::query_param;

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&server.uri(), Duration::from_secs(5)).expect("client")
    }

    fn initiate_request() -> InitiateRequest {
        let mut officer = Officer::blank(1);
        officer.name = "Lim Wei".into();
        InitiateRequest {
            initiator: "J. Tan".into(),
            officers: vec![officer],
            timestamp: "2024-05-01T08:00:00.000Z".into(),
        }
    }

    #[tokio::test]
    async fn initiate_posts_wire_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflow/initiate"))
            .and(body_json(json!({
                "initiator": "J. Tan",
                "officers": [{
                    "id": 1,
                    "icNo": "",
                    "name": "Lim Wei",
                    "deputation": "",
                    "colMS3Approval": "",
                    "brigBApproval": "",
                    "addlMSAApproval": "",
                    "brigMSCApproval": "",
                    "addlMSBApproval": "",
                }],
                "timestamp": "2024-05-01T08:00:00.000Z",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
            .expect(1)
            .mount(&server)
            .await;

        let ack = backend(&server)
            .initiate(&initiate_request())
            .await
            .expect("initiate");
        assert_eq!(ack.workflow_id(), Some(WorkflowId::new("5")));
    }

    #[tokio::test]
    async fn error_bodies_become_application_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflow/initiate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Officers required"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/workflow/forward"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
            .mount(&server)
            .await;

        let client = backend(&server);
        assert_eq!(
            client.initiate(&initiate_request()).await,
            Err(BackendError::Application {
                status: 400,
                message: "Officers required".into(),
            })
        );

        let forward = ForwardRequest {
            step: ForwardStep::ForwardToCol,
            timestamp: "2024-05-01T09:00:00.000Z".into(),
            initiator: "J. Tan".into(),
            officers: Vec::new(),
        };
        assert_eq!(
            client.forward(&forward).await,
            Err(BackendError::Application {
                status: 500,
                message: "Server error: 500 - database offline".into(),
            })
        );
    }

    #[test]
    fn application_error_message_precedence() {
        let message = |body: &str| match application_error(422, body, "Failed to forward request")
        {
            BackendError::Application { message, .. } => message,
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(message(r#"{"message":"bad step"}"#), "bad step");
        assert_eq!(message(r#"{"error":"a","message":"b"}"#), "a");
        assert_eq!(message(r#"{"detail":"x"}"#), "Failed to forward request");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // Nothing listens on the discard port.
        let client =
            HttpBackend::new("http://127.0.0.1:9/", Duration::from_secs(2)).expect("client");
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
        let err = client
            .initiate(&initiate_request())
            .await
            .expect_err("no backend");
        assert!(err.is_transport(), "unexpected error {err:?}");
    }

    #[tokio::test]
    async fn list_requires_json_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workflow"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
            .mount(&server)
            .await;

        assert_eq!(
            backend(&server).list().await,
            Err(BackendError::UnexpectedContent)
        );
    }

    #[tokio::test]
    async fn list_export_stats_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workflow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "workflows": [{
                    "id": 1,
                    "initiator": "J. Tan",
                    "officers": [],
                    "timeline": {"initiatedAt": "2024-05-01T08:00:00.000Z"}
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/workflow/export"))
            .and(query_param("format", "csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("id,initiator\n1,J. Tan\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalWorkflows": 1,
                "inProgressWorkflows": 0,
                "closedWorkflows": 0,
                "totalOfficers": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/workflow/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/workflow/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = backend(&server);
        let workflows = client.list().await.expect("list");
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].status(), Some(WorkflowStatus::Initiated));

        let csv = client.export(ExportFormat::Csv).await.expect("export");
        assert!(csv.starts_with("id,initiator"));

        let stats = client.stats().await.expect("stats");
        assert_eq!(stats.total_workflows, 1);

        assert_eq!(
            client.delete(&WorkflowId::new("1")).await,
            Ok(DeleteOutcome::Deleted)
        );
        assert_eq!(
            client.delete(&WorkflowId::new("2")).await,
            Ok(DeleteOutcome::NotFound)
        );
    }
}
