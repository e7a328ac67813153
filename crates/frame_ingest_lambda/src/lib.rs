//! AWS-oriented adapters and handlers for frame ingest.
//!
//! This crate owns runtime integration details (Lambda handler, S3 listing
//! and presigning, Roboflow uploads) and exposes a single runtime module
//! boundary for the contract, naming, and upload plan primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod runtime;
pub mod telemetry;
