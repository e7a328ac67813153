use clap::Parser;
use frame_ingest_lambda::adapters::ingest::{build_http_client, RoboflowClient};
use frame_ingest_lambda::adapters::object_store::{build_s3_client, FrameStore, S3FrameStore};
use frame_ingest_lambda::config::IngestConfig;
use frame_ingest_lambda::handlers::invocation::{handle_ingest_event, InvocationSettings};
use frame_ingest_lambda::telemetry::init_tracing;
use lambda_runtime::Error;
use serde_json::json;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ingest_local",
    about = "Run one frame ingest from a workstation",
    long_about = "Builds the same request envelope API Gateway would send and runs it\n\
                  against the configured bucket and ingestion project. Reads a local\n\
                  .env file when present."
)]
struct Cli {
    /// Folder prefix whose frames should be ingested, e.g. NFL/shoot42
    #[arg(long, env = "S3_BASE_PATH")]
    s3_base_path: String,
    /// Only list the frames that would be uploaded
    #[arg(long)]
    dry_run: bool,
}

// ── main ───────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let config = IngestConfig::from_env()?;
    let store = S3FrameStore::new(
        build_s3_client(&config.store).await,
        config.store.bucket.clone(),
        config.store.frame_folder.clone(),
    );

    if cli.dry_run {
        let keys = store.list_objects(&cli.s3_base_path).await?;
        for key in &keys {
            println!("{key}");
        }
        eprintln!("{} frames under s3://{}", keys.len(), store.bucket());
        return Ok(());
    }

    let uploader = RoboflowClient::new(
        build_http_client(config.upload.timeout)?,
        config.roboflow.clone(),
    );
    let event = json!({
        "body": json!({ "s3_base_path": cli.s3_base_path }).to_string(),
    });

    let response = handle_ingest_event(
        event,
        &InvocationSettings::from(&config.upload),
        &store,
        &uploader,
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
