use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::RoboflowSettings;
use crate::runtime::contract::UploadTask;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("upload request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upload response was not valid JSON: {0}")]
    Decode(#[source] reqwest::Error),
}

/// What the ingestion service said about one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResponse {
    Accepted { duplicate: bool },
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait IngestClient: Send + Sync {
    async fn upload(&self, task: &UploadTask) -> Result<IngestResponse, IngestError>;
}

/// Roboflow dataset upload by URL. The service fetches the signed URL itself,
/// so no image bytes leave this process.
#[derive(Debug, Clone)]
pub struct RoboflowClient {
    http: reqwest::Client,
    settings: RoboflowSettings,
}

impl RoboflowClient {
    pub fn new(http: reqwest::Client, settings: RoboflowSettings) -> Self {
        Self { http, settings }
    }

    pub fn upload_endpoint(&self) -> String {
        format!(
            "{}/dataset/{}/upload",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.dataset_project
        )
    }
}

#[async_trait]
impl IngestClient for RoboflowClient {
    async fn upload(&self, task: &UploadTask) -> Result<IngestResponse, IngestError> {
        let response = self
            .http
            .post(self.upload_endpoint())
            .query(&[
                ("api_key", self.settings.api_key.as_str()),
                ("name", task.name.as_deref().unwrap_or_default()),
                ("split", task.split.as_str()),
                ("batch", task.batch.as_str()),
                ("image", task.signed_url.as_str()),
            ])
            .send()
            .await
            // The request URL carries the API key and the signed URL.
            .map_err(|error| IngestError::Transport(error.without_url()))?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response
                .json()
                .await
                .map_err(|error| IngestError::Decode(error.without_url()))?;
            Ok(IngestResponse::Accepted {
                duplicate: body.get("duplicate").is_some(),
            })
        } else {
            let body = response
                .text()
                .await
                .map_err(|error| IngestError::Transport(error.without_url()))?;
            Ok(IngestResponse::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// One client per process, shared by every upload task.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SIGNED_URL: &str =
        "https://frames-bucket.s3.amazonaws.com/NFL/shoot42/frames/0001.jpg?X-Amz-Expires=3600&X-Amz-Signature=abc";

    fn client_for(server: &MockServer) -> RoboflowClient {
        RoboflowClient::new(
            build_http_client(Duration::from_secs(5)).expect("client should build"),
            RoboflowSettings {
                api_url: server.uri(),
                api_key: "rf-secret".to_string(),
                dataset_project: "nfl-frames".to_string(),
            },
        )
    }

    fn task() -> UploadTask {
        UploadTask {
            image_key: "NFL/shoot42/frames/0001.jpg".to_string(),
            signed_url: SIGNED_URL.to_string(),
            batch: "batch-shoot42".to_string(),
            name: None,
            split: "train".to_string(),
        }
    }

    #[tokio::test]
    async fn posts_signed_url_with_batch_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dataset/nfl-frames/upload"))
            .and(query_param("api_key", "rf-secret"))
            .and(query_param("name", ""))
            .and(query_param("split", "train"))
            .and(query_param("batch", "batch-shoot42"))
            .and(query_param("image", SIGNED_URL))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "id": "abc123",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .upload(&task())
            .await
            .expect("upload should succeed");

        assert_eq!(response, IngestResponse::Accepted { duplicate: false });
        let requests = server
            .received_requests()
            .await
            .expect("request recording is enabled");
        let query = requests[0].url.query().unwrap_or_default();
        assert!(query.contains("image=https%3A%2F%2Fframes-bucket"));
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn flags_duplicate_key_in_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "duplicate": true,
                "id": "abc123",
            })))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .upload(&task())
            .await
            .expect("upload should succeed");

        assert_eq!(response, IngestResponse::Accepted { duplicate: true });
    }

    #[tokio::test]
    async fn returns_body_text_for_rejected_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .upload(&task())
            .await
            .expect("rejection is not a transport error");

        assert_eq!(
            response,
            IngestResponse::Rejected {
                status: 401,
                body: "invalid api key".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .upload(&task())
            .await
            .expect_err("non-JSON body should fail");

        assert!(matches!(error, IngestError::Decode(_)));
        assert!(!error.to_string().contains("rf-secret"));
    }

    #[tokio::test]
    async fn connection_failure_does_not_leak_credentials() {
        let client = RoboflowClient::new(
            build_http_client(Duration::from_secs(5)).expect("client should build"),
            RoboflowSettings {
                api_url: "http://127.0.0.1:1".to_string(),
                api_key: "rf-secret".to_string(),
                dataset_project: "nfl-frames".to_string(),
            },
        );

        let error = client
            .upload(&task())
            .await
            .expect_err("refused connection should fail");

        assert!(matches!(error, IngestError::Transport(_)));
        assert!(!error.to_string().contains("rf-secret"));
    }
}
