use frame_ingest_lambda::adapters::ingest::{build_http_client, RoboflowClient};
use frame_ingest_lambda::adapters::object_store::{build_s3_client, S3FrameStore};
use frame_ingest_lambda::config::IngestConfig;
use frame_ingest_lambda::handlers::invocation::{
    handle_ingest_event, ApiGatewayResponse, InvocationSettings,
};
use frame_ingest_lambda::telemetry::init_tracing;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct RuntimeDependencies {
    settings: InvocationSettings,
    store: S3FrameStore,
    uploader: RoboflowClient,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<ApiGatewayResponse, Error> {
    let response =
        handle_ingest_event(event.payload, &deps.settings, &deps.store, &deps.uploader).await?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = IngestConfig::from_env()?;
    let deps = RuntimeDependencies {
        settings: InvocationSettings::from(&config.upload),
        store: S3FrameStore::new(
            build_s3_client(&config.store).await,
            config.store.bucket.clone(),
            config.store.frame_folder.clone(),
        ),
        uploader: RoboflowClient::new(
            build_http_client(config.upload.timeout)?,
            config.roboflow.clone(),
        ),
    };

    lambda_runtime::run(service_fn(|event| handle_request(event, &deps))).await
}
