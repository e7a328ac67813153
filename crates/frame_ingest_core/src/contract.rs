use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::naming::{batch_label, project_name_from_prefix};

pub const ORCHESTRATION_SCHEMA_VERSION: &str = "v1";
pub const DEFAULT_SPLIT: &str = "train";
pub const PRESIGNED_URL_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestRequest {
    #[serde(default)]
    pub s3_base_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedIngestRequest {
    pub s3_base_path: String,
    pub project_name: String,
    pub batch_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunContext {
    pub project_name: String,
    pub batch_label: String,
    pub schema_version: String,
    pub request_fingerprint: String,
}

/// One upload of one signed URL into the ingestion service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadTask {
    pub image_key: String,
    pub signed_url: String,
    pub batch: String,
    #[serde(default)]
    pub name: Option<String>,
    pub split: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Succeeded,
    /// The service reported the asset as already ingested. Still handled.
    Duplicate,
    Failed { reason: String },
}

impl UploadOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadRecord {
    pub image_key: String,
    #[serde(flatten)]
    pub outcome: UploadOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub records: Vec<UploadRecord>,
}

impl BatchReport {
    pub fn from_records(records: Vec<UploadRecord>) -> Self {
        let mut report = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in &records {
            match record.outcome {
                UploadOutcome::Succeeded => report.succeeded += 1,
                UploadOutcome::Duplicate => report.duplicates += 1,
                UploadOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report.records = records;
        report
    }

    pub fn failures(&self) -> impl Iterator<Item = &UploadRecord> {
        self.records
            .iter()
            .filter(|record| record.outcome.is_failure())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestCompletedResponse {
    pub message: String,
    pub project_name: String,
    pub batch: String,
    pub total_images: usize,
    pub succeeded: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub elapsed_seconds: f64,
    pub failures: Vec<UploadRecord>,
    pub schema_version: String,
}

impl IngestCompletedResponse {
    pub fn new(run_context: &RunContext, report: &BatchReport, elapsed_seconds: f64) -> Self {
        Self {
            message: format!(
                "Uploaded {} images to roboflow in {elapsed_seconds} seconds.",
                report.total
            ),
            project_name: run_context.project_name.clone(),
            batch: run_context.batch_label.clone(),
            total_images: report.total,
            succeeded: report.succeeded,
            duplicates: report.duplicates,
            failed: report.failed,
            elapsed_seconds,
            failures: report.failures().cloned().collect(),
            schema_version: ORCHESTRATION_SCHEMA_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn normalize_request(
    payload: IngestRequest,
) -> Result<NormalizedIngestRequest, ValidationError> {
    let s3_base_path = payload
        .s3_base_path
        .map(|value| value.trim().to_string())
        .unwrap_or_default();
    if s3_base_path.is_empty() {
        return Err(ValidationError::new("s3_base_path is required"));
    }

    let project_name = project_name_from_prefix(&s3_base_path);
    if project_name.is_empty() {
        return Err(ValidationError::new(
            "s3_base_path must end with a folder name",
        ));
    }

    Ok(NormalizedIngestRequest {
        batch_label: batch_label(&project_name),
        s3_base_path,
        project_name,
    })
}

pub fn request_fingerprint(request: &NormalizedIngestRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(request));
    format!("{:x}", hasher.finalize())
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}

pub fn build_run_context(request: &NormalizedIngestRequest) -> RunContext {
    RunContext {
        project_name: request.project_name.clone(),
        batch_label: request.batch_label.clone(),
        schema_version: ORCHESTRATION_SCHEMA_VERSION.to_string(),
        request_fingerprint: request_fingerprint(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, outcome: UploadOutcome) -> UploadRecord {
        UploadRecord {
            image_key: key.to_string(),
            outcome,
        }
    }

    #[test]
    fn normalize_request_rejects_missing_prefix() {
        let error = normalize_request(IngestRequest::default()).expect_err("request should fail");
        assert_eq!(error.message(), "s3_base_path is required");
    }

    #[test]
    fn normalize_request_rejects_blank_prefix() {
        let request = IngestRequest {
            s3_base_path: Some("   ".to_string()),
        };

        let error = normalize_request(request).expect_err("request should fail");
        assert_eq!(error.message(), "s3_base_path is required");
    }

    #[test]
    fn normalize_request_rejects_prefix_without_folder_name() {
        let request = IngestRequest {
            s3_base_path: Some("/".to_string()),
        };

        let error = normalize_request(request).expect_err("request should fail");
        assert_eq!(error.message(), "s3_base_path must end with a folder name");
    }

    #[test]
    fn normalize_request_derives_project_and_batch() {
        let request = IngestRequest {
            s3_base_path: Some("NFL/shoot42".to_string()),
        };

        let normalized = normalize_request(request).expect("request should pass");
        assert_eq!(normalized.s3_base_path, "NFL/shoot42");
        assert_eq!(normalized.project_name, "shoot42");
        assert_eq!(normalized.batch_label, "batch-shoot42");
    }

    #[test]
    fn fingerprint_is_stable_for_identical_requests() {
        let request = IngestRequest {
            s3_base_path: Some("NFL/game day".to_string()),
        };
        let first = normalize_request(request.clone()).expect("request should pass");
        let second = normalize_request(request).expect("request should pass");

        assert_eq!(request_fingerprint(&first), request_fingerprint(&second));
        assert_eq!(build_run_context(&first).batch_label, "batch-game_day");
    }

    #[test]
    fn batch_report_counts_each_outcome_once() {
        let report = BatchReport::from_records(vec![
            record("a.jpg", UploadOutcome::Succeeded),
            record("b.jpg", UploadOutcome::Duplicate),
            record(
                "c.jpg",
                UploadOutcome::Failed {
                    reason: "HTTP 500".to_string(),
                },
            ),
            record("d.jpg", UploadOutcome::Succeeded),
        ]);

        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.failed, 1);
        let failed: Vec<_> = report.failures().map(|r| r.image_key.as_str()).collect();
        assert_eq!(failed, vec!["c.jpg"]);
    }

    #[test]
    fn upload_record_serializes_flat_status() {
        let value = serde_json::to_value(record(
            "frames/1.jpg",
            UploadOutcome::Failed {
                reason: "timeout".to_string(),
            },
        ))
        .expect("record should serialize");

        assert_eq!(
            value,
            serde_json::json!({
                "image_key": "frames/1.jpg",
                "status": "failed",
                "reason": "timeout",
            })
        );
    }

    #[test]
    fn completed_response_reports_only_failures() {
        let request = normalize_request(IngestRequest {
            s3_base_path: Some("NFL/shoot42".to_string()),
        })
        .expect("request should pass");
        let report = BatchReport::from_records(vec![
            record("a.jpg", UploadOutcome::Duplicate),
            record(
                "b.jpg",
                UploadOutcome::Failed {
                    reason: "bad".to_string(),
                },
            ),
        ]);

        let response = IngestCompletedResponse::new(&build_run_context(&request), &report, 1.5);
        assert_eq!(
            response.message,
            "Uploaded 2 images to roboflow in 1.5 seconds."
        );
        assert_eq!(response.batch, "batch-shoot42");
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].image_key, "b.jpg");
    }
}
