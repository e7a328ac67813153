use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::adapters::ingest::IngestClient;
use crate::adapters::object_store::{FrameStore, StoreError};
use crate::config::UploadSettings;
use crate::handlers::coordinator::{run_upload_batch, UploadOptions};
use crate::runtime::contract::{
    build_run_context, normalize_request, BatchReport, IngestCompletedResponse, IngestRequest,
    ValidationError, DEFAULT_SPLIT,
};
use crate::runtime::upload_plan::plan_upload_tasks;

const COMPONENT: &str = "invocation";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSettings {
    pub split: String,
    pub upload: UploadOptions,
}

impl Default for InvocationSettings {
    fn default() -> Self {
        Self {
            split: DEFAULT_SPLIT.to_string(),
            upload: UploadOptions::default(),
        }
    }
}

impl From<&UploadSettings> for InvocationSettings {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            split: settings.split.clone(),
            upload: UploadOptions::from(settings),
        }
    }
}

/// Failures that abort the whole invocation instead of becoming a response.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("inconsistent upload plan: {0}")]
    Plan(#[from] ValidationError),
}

/// Lists and signs the frames under the request's `s3_base_path`, uploads
/// them as one batch, and reports the outcome counts.
///
/// Malformed requests get a 400 before any listing or upload happens.
pub async fn handle_ingest_event<S, C>(
    event: Value,
    settings: &InvocationSettings,
    store: &S,
    uploader: &C,
) -> Result<ApiGatewayResponse, InvocationError>
where
    S: FrameStore + ?Sized,
    C: IngestClient + ?Sized,
{
    let started_at = Instant::now();

    let payload = match extract_body(event) {
        Ok(value) => value,
        Err(message) => return Ok(validation_error_response(&message)),
    };

    let request = match serde_json::from_value::<IngestRequest>(payload) {
        Ok(value) => value,
        Err(error) => {
            return Ok(validation_error_response(&format!(
                "Malformed request: {error}"
            )))
        }
    };

    let normalized = match normalize_request(request) {
        Ok(value) => value,
        Err(error) => return Ok(validation_error_response(error.message())),
    };
    let run_context = build_run_context(&normalized);

    let image_keys = store.list_objects(&normalized.s3_base_path).await?;
    let mut signed_urls = Vec::with_capacity(image_keys.len());
    for key in &image_keys {
        signed_urls.push(store.sign_url(key).await?);
    }

    info!(
        component = COMPONENT,
        event = "ingest_started",
        project_name = %run_context.project_name,
        batch = %run_context.batch_label,
        request_fingerprint = %run_context.request_fingerprint,
        images = image_keys.len(),
    );

    let tasks = plan_upload_tasks(
        image_keys,
        signed_urls,
        &run_context.batch_label,
        &settings.split,
    )?;
    let report = if tasks.is_empty() {
        BatchReport::default()
    } else {
        run_upload_batch(uploader, tasks, settings.upload).await
    };

    let elapsed_seconds = started_at.elapsed().as_secs_f64();
    info!(
        component = COMPONENT,
        event = "ingest_completed",
        project_name = %run_context.project_name,
        request_fingerprint = %run_context.request_fingerprint,
        images = report.total,
        failed = report.failed,
        elapsed_seconds,
    );

    Ok(success_response(
        200,
        IngestCompletedResponse::new(&run_context, &report, elapsed_seconds),
    ))
}

fn extract_body(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    match object.get("body") {
        None | Some(Value::Null) => Err("Json Body is not added".to_string()),
        Some(body @ Value::Object(_)) => Ok(body.clone()),
        Some(Value::String(text)) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        Some(_) => Err("Request body must be a JSON object".to_string()),
    }
}

fn validation_error_response(message: &str) -> ApiGatewayResponse {
    error_response(400, json!({ "error": message }))
}

fn success_response(status_code: u16, payload: impl Serialize) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: serde_json::to_string(&payload).expect("response payload should serialize"),
    }
}

fn error_response(status_code: u16, payload: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: payload.to_string(),
    }
}
