/// Workflow client: the only place the service talks to the external
/// roadmap-generation workflow.
///
/// One POST per generation request with a 10 second timeout. Failures are
/// reported to the caller and never retried; the roadmap is marked failed
/// and the user can ask again.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::roadmap::GeneratedPayload;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("n8n webhook URL not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Workflow returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// Body POSTed to the workflow webhook.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub field: String,
    pub level: String,
    pub user_id: Uuid,
    pub roadmap_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_requirements: Option<String>,
    pub callback_url: String,
}

/// What the webhook answered. Every field is optional; a workflow that
/// replies with an empty or non-JSON body yields the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl TriggerResponse {
    /// Lenient parse of a raw response body.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Generated content delivered synchronously, if the workflow already
    /// finished and the payload has the expected shape.
    pub fn completed_payload(&self) -> Option<GeneratedPayload> {
        if self.status.as_deref() != Some("completed") {
            return None;
        }
        let data = self.data.clone()?;
        match serde_json::from_value(data) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!("Ignoring unparseable synchronous workflow data: {e}");
                None
            }
        }
    }
}

/// Seam over the external generator so handlers can be exercised without
/// a live workflow.
#[async_trait]
pub trait RoadmapGenerator: Send + Sync {
    async fn trigger(&self, payload: &GenerationPayload) -> Result<TriggerResponse, WorkflowError>;
}

#[derive(Clone)]
pub struct WorkflowClient {
    client: Client,
    webhook_url: Option<String>,
    secret: String,
}

impl WorkflowClient {
    pub fn new(webhook_url: Option<String>, secret: String) -> Result<Self, WorkflowError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            webhook_url,
            secret,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }
}

#[async_trait]
impl RoadmapGenerator for WorkflowClient {
    async fn trigger(&self, payload: &GenerationPayload) -> Result<TriggerResponse, WorkflowError> {
        let url = self.webhook_url.as_deref().ok_or(WorkflowError::NotConfigured)?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(WorkflowError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed = TriggerResponse::from_body(&body);
        info!(
            "Triggered roadmap workflow for {} (workflow_id={:?})",
            payload.roadmap_id, parsed.workflow_id
        );
        Ok(parsed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every payload and replays a canned answer.
    pub(crate) struct StubGenerator {
        pub calls: Mutex<Vec<GenerationPayload>>,
        pub fail: bool,
    }

    impl StubGenerator {
        pub(crate) fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(vec![]),
                fail,
            }
        }
    }

    #[async_trait]
    impl RoadmapGenerator for StubGenerator {
        async fn trigger(&self, payload: &GenerationPayload) -> Result<TriggerResponse, WorkflowError> {
            self.calls.lock().unwrap().push(payload.clone());
            if self.fail {
                return Err(WorkflowError::NotConfigured);
            }
            Ok(TriggerResponse {
                workflow_id: Some("wf-1".to_string()),
                ..TriggerResponse::default()
            })
        }
    }

    fn payload() -> GenerationPayload {
        GenerationPayload {
            field: "Data Science".to_string(),
            level: "Beginner".to_string(),
            user_id: Uuid::nil(),
            roadmap_id: "data-science-beginner-1".to_string(),
            custom_requirements: None,
            callback_url: "http://localhost:5000/api/roadmaps/webhook/n8n-callback".to_string(),
        }
    }

    #[test]
    fn test_payload_is_camel_case() {
        let value = serde_json::to_value(payload()).unwrap();
        assert_eq!(value["roadmapId"], "data-science-beginner-1");
        assert_eq!(value["userId"], Uuid::nil().to_string());
        assert!(value["callbackUrl"].as_str().unwrap().ends_with("/n8n-callback"));
        assert!(value.get("customRequirements").is_none());
    }

    #[test]
    fn test_lenient_response_parse() {
        assert!(TriggerResponse::from_body("").workflow_id.is_none());
        assert!(TriggerResponse::from_body("Workflow was started").workflow_id.is_none());
        let parsed = TriggerResponse::from_body(r#"{"workflowId":"abc","status":"running"}"#);
        assert_eq!(parsed.workflow_id.as_deref(), Some("abc"));
        assert!(parsed.completed_payload().is_none());
    }

    #[test]
    fn test_completed_payload_requires_shape() {
        let ok = TriggerResponse {
            status: Some("completed".to_string()),
            data: Some(json!({
                "roadmap_json": {
                    "overview": {"description": "d", "duration": "3 months", "difficulty": 2}
                },
                "roadmap_doc": "# Roadmap"
            })),
            ..TriggerResponse::default()
        };
        let payload = ok.completed_payload().unwrap();
        assert_eq!(payload.roadmap_doc, "# Roadmap");
        assert!(payload.roadmap_json.phases.is_empty());

        let bad = TriggerResponse {
            status: Some("completed".to_string()),
            data: Some(json!({"roadmap_doc": 3})),
            ..TriggerResponse::default()
        };
        assert!(bad.completed_payload().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_client_refuses() {
        let client = WorkflowClient::new(None, "secret".to_string()).unwrap();
        assert!(!client.is_configured());
        let err = client.trigger(&payload()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotConfigured));
        assert_eq!(err.to_string(), "n8n webhook URL not configured");
    }

    #[tokio::test]
    async fn test_stub_records_calls() {
        let stub = StubGenerator::new(false);
        let response = stub.trigger(&payload()).await.unwrap();
        assert_eq!(response.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(stub.calls.lock().unwrap().len(), 1);
    }
}
