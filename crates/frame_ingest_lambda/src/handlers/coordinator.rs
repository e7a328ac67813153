use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::adapters::ingest::{IngestClient, IngestResponse};
use crate::config::{UploadSettings, DEFAULT_UPLOAD_CONCURRENCY, DEFAULT_UPLOAD_TIMEOUT_SECS};
use crate::runtime::contract::{BatchReport, UploadOutcome, UploadRecord, UploadTask};

const COMPONENT: &str = "upload_coordinator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Ceiling on uploads awaiting a response at the same time.
    pub max_in_flight: usize,
    /// Per-upload deadline. Expiry fails that task only.
    pub timeout: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_UPLOAD_CONCURRENCY,
            timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        }
    }
}

impl From<&UploadSettings> for UploadOptions {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            max_in_flight: settings.max_in_flight,
            timeout: settings.timeout,
        }
    }
}

/// Drives one upload per task to a terminal outcome and folds the outcomes
/// into a report.
///
/// Tasks run concurrently on the calling task, at most
/// `options.max_in_flight` at a time, and complete in any order. A failed
/// or timed out upload never cancels its siblings. Returns only after every
/// task has produced exactly one record.
pub async fn run_upload_batch<C>(
    client: &C,
    tasks: Vec<UploadTask>,
    options: UploadOptions,
) -> BatchReport
where
    C: IngestClient + ?Sized,
{
    let started_at = Instant::now();
    let max_in_flight = options.max_in_flight.max(1);
    info!(
        component = COMPONENT,
        event = "batch_started",
        total = tasks.len(),
        max_in_flight,
    );

    let records: Vec<UploadRecord> = stream::iter(tasks)
        .map(|task| upload_one(client, task, options.timeout))
        .buffer_unordered(max_in_flight)
        .collect()
        .await;

    let report = BatchReport::from_records(records);
    info!(
        component = COMPONENT,
        event = "batch_completed",
        total = report.total,
        succeeded = report.succeeded,
        duplicates = report.duplicates,
        failed = report.failed,
        duration_ms = started_at.elapsed().as_millis() as u64,
    );
    report
}

async fn upload_one<C>(client: &C, task: UploadTask, timeout: Duration) -> UploadRecord
where
    C: IngestClient + ?Sized,
{
    let started_at = Instant::now();
    let outcome = match tokio::time::timeout(timeout, client.upload(&task)).await {
        Ok(Ok(response)) => classify_response(response),
        Ok(Err(error)) => UploadOutcome::Failed {
            reason: error.to_string(),
        },
        Err(_) => UploadOutcome::Failed {
            reason: format!("upload timed out after {}ms", timeout.as_millis()),
        },
    };

    let duration_ms = started_at.elapsed().as_millis() as u64;
    match &outcome {
        UploadOutcome::Succeeded => info!(
            component = COMPONENT,
            event = "upload_succeeded",
            image_key = %task.image_key,
            batch = %task.batch,
            duration_ms,
        ),
        UploadOutcome::Duplicate => info!(
            component = COMPONENT,
            event = "upload_duplicate",
            image_key = %task.image_key,
            batch = %task.batch,
            duration_ms,
            "image was already ingested, skipped"
        ),
        UploadOutcome::Failed { reason } => warn!(
            component = COMPONENT,
            event = "upload_failed",
            image_key = %task.image_key,
            batch = %task.batch,
            duration_ms,
            error = %reason,
        ),
    }

    UploadRecord {
        image_key: task.image_key,
        outcome,
    }
}

pub fn classify_response(response: IngestResponse) -> UploadOutcome {
    match response {
        IngestResponse::Accepted { duplicate: true } => UploadOutcome::Duplicate,
        IngestResponse::Accepted { duplicate: false } => UploadOutcome::Succeeded,
        IngestResponse::Rejected { status, body } => UploadOutcome::Failed {
            reason: format!("HTTP {status}: {body}"),
        },
    }
}
