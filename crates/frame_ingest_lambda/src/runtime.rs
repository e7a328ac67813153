pub use frame_ingest_core::{contract, naming, upload_plan};
