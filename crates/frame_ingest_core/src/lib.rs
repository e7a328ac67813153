//! Shared frame ingest domain primitives.
//!
//! This crate owns the request/response contracts, batch naming, and upload
//! planning. It intentionally excludes AWS SDK, HTTP, and Lambda runtime
//! concerns; those live in `frame_ingest_lambda`.

pub mod contract;
pub mod naming;
pub mod upload_plan;
