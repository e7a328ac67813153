use std::fmt;
use std::time::Duration;

use crate::runtime::contract::DEFAULT_SPLIT;

pub const DEFAULT_ROBOFLOW_API_URL: &str = "https://api.roboflow.com";
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 20;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("IAM_ACCESS_ID and IAM_ACCESS_KEY must be configured together")]
    IncompleteCredentials,
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub bucket: String,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub frame_folder: String,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("frame_folder", &self.frame_folder)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct RoboflowSettings {
    pub api_url: String,
    pub api_key: String,
    pub dataset_project: String,
}

impl fmt::Debug for RoboflowSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoboflowSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &"***")
            .field("dataset_project", &self.dataset_project)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub split: String,
    pub max_in_flight: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub store: StoreSettings,
    pub roboflow: RoboflowSettings,
    pub upload: UploadSettings,
}

impl IngestConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        let access_key_id = optional("IAM_ACCESS_ID");
        let secret_access_key = optional("IAM_ACCESS_KEY");
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(ConfigError::IncompleteCredentials);
        }

        let store = StoreSettings {
            bucket: required("S3_BUCKET_NAME")?,
            region: optional("AWS_REGION"),
            access_key_id,
            secret_access_key,
            frame_folder: required("FRAME_FOLDER")?
                .trim_matches('/')
                .to_string(),
        };

        let roboflow = RoboflowSettings {
            api_url: optional("ROBOFLOW_API_URL")
                .unwrap_or_else(|| DEFAULT_ROBOFLOW_API_URL.to_string()),
            api_key: required("ROBOFLOW_API_KEY")?,
            dataset_project: required("ROBOFLOW_PROJECT_NAME")?,
        };

        let max_in_flight = parse_positive(
            "UPLOAD_CONCURRENCY",
            optional("UPLOAD_CONCURRENCY"),
            DEFAULT_UPLOAD_CONCURRENCY as u64,
        )?;
        let timeout_secs = parse_positive(
            "UPLOAD_TIMEOUT_SECS",
            optional("UPLOAD_TIMEOUT_SECS"),
            DEFAULT_UPLOAD_TIMEOUT_SECS,
        )?;

        let upload = UploadSettings {
            split: optional("UPLOAD_SPLIT").unwrap_or_else(|| DEFAULT_SPLIT.to_string()),
            max_in_flight: usize::try_from(max_in_flight).map_err(|error| {
                ConfigError::Invalid {
                    name: "UPLOAD_CONCURRENCY",
                    value: max_in_flight.to_string(),
                    reason: error.to_string(),
                }
            })?,
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            store,
            roboflow,
            upload,
        })
    }
}

fn parse_positive(
    name: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };

    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            name,
            value,
            reason: "must be a positive integer".to_string(),
        }),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(ConfigError::Invalid {
            name,
            value,
            reason: error.to_string(),
        }),
    }
}
