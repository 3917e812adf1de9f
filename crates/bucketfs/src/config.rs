use std::time::Duration;

use bucketfs_tools::{
    error::{Error, Result},
    storage::StorageConfig,
};
use clap::Parser;
use url::Url;

/// MCP server exposing an Appwrite storage bucket as a file system over stdio.
#[derive(Parser, Debug)]
#[command(name = "bucketfs", version, about)]
pub struct Cli {
    /// Appwrite API endpoint, e.g. https://cloud.appwrite.io/v1.
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: String,

    /// Appwrite project id.
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: String,

    /// Appwrite API key with storage scopes.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Bucket holding the files.
    #[arg(long, env = "BUCKET_ID")]
    pub bucket_id: String,

    /// Timeout for each storage request, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Timeout for converting a single document, in seconds.
    #[arg(long, env = "DECODE_TIMEOUT_SECS", default_value_t = 60)]
    pub decode_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub decode_timeout: Duration,
}

impl Cli {
    pub fn into_config(self) -> Result<Config> {
        let endpoint = required("ENDPOINT", self.endpoint)?;
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::Config(format!("ENDPOINT '{endpoint}' is not a valid URL: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "ENDPOINT must be an http(s) URL, got '{endpoint}'"
            )));
        }
        if self.request_timeout_secs == 0 || self.decode_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least one second".into()));
        }

        Ok(Config {
            storage: StorageConfig {
                endpoint,
                project_id: required("PROJECT_ID", self.project_id)?,
                api_key: required("API_KEY", self.api_key)?,
                bucket_id: required("BUCKET_ID", self.bucket_id)?,
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
            decode_timeout: Duration::from_secs(self.decode_timeout_secs),
        })
    }
}

fn required(name: &str, value: String) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Config(format!("{name} must not be empty")));
    }
    Ok(value.to_string())
}
