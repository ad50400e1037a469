//! Configuration management using the prefer crate for file discovery.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{JobKind, JobRequest};

/// Name used for config file discovery (`text-analysis.toml`, etc.).
pub const CONFIG_NAME: &str = "text-analysis";

/// Default interval between job status checks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

const DEFAULT_REGION: &str = "eu-west-1";
const DEFAULT_INPUT_BUCKET: &str = "whatif-local-news-le";
const DEFAULT_JOB_BUCKET: &str = "lauren-temp";
const DEFAULT_ROLE_ARN: &str = "arn:aws:iam::942464564246:role/comprehend-s3-access";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Service region, used to derive default endpoints.
    pub region: String,
    /// Bucket the input documents are read from.
    pub input_bucket: String,
    /// Bucket detection jobs read their input from and write output to.
    pub job_bucket: String,
    /// Identity the service assumes to access the job bucket.
    pub data_access_role_arn: String,
    pub language_code: String,
    /// Delay between job status checks.
    pub poll_interval: Duration,
    /// Analysis service endpoint.
    pub analysis_endpoint: String,
    /// Object storage endpoint (path-style).
    pub storage_endpoint: String,
    /// Optional bearer token sent to the analysis service.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Local directory used as object storage instead of the HTTP endpoint.
    pub store_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let region = env_override("ANALYSIS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        Self {
            analysis_endpoint: env_override("ANALYSIS_ENDPOINT")
                .unwrap_or_else(|| default_analysis_endpoint(&region)),
            storage_endpoint: env_override("STORAGE_ENDPOINT")
                .unwrap_or_else(|| default_storage_endpoint(&region)),
            input_bucket: env_override("ANALYSIS_INPUT_BUCKET")
                .unwrap_or_else(|| DEFAULT_INPUT_BUCKET.to_string()),
            job_bucket: env_override("ANALYSIS_JOB_BUCKET")
                .unwrap_or_else(|| DEFAULT_JOB_BUCKET.to_string()),
            data_access_role_arn: env_override("ANALYSIS_ROLE_ARN")
                .unwrap_or_else(|| DEFAULT_ROLE_ARN.to_string()),
            api_token: env_override("ANALYSIS_API_TOKEN"),
            language_code: "en".to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: 60,
            store_dir: None,
            region,
        }
    }
}

impl Settings {
    /// Build the submission parameters for a detection job on `document_key`.
    pub fn job_request(&self, document_key: &str, kind: JobKind) -> JobRequest {
        JobRequest {
            input_uri: format!("s3://{}/{}", self.job_bucket, document_key),
            output_uri: format!("s3://{}/{}", self.job_bucket, kind.output_prefix()),
            language_code: self.language_code.clone(),
            data_access_role_arn: self.data_access_role_arn.clone(),
        }
    }
}

fn default_analysis_endpoint(region: &str) -> String {
    format!("https://comprehend.{}.amazonaws.com", region)
}

fn default_storage_endpoint(region: &str) -> String {
    format!("https://s3.{}.amazonaws.com", region)
}

/// Read a non-empty environment variable.
fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_access_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Seconds between job status checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_endpoint: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Local object storage directory (`~` is expanded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to defaults when no file is found or it fails to parse.
    pub async fn load() -> Self {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Directory relative paths in this config are resolved against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    ///
    /// Environment variables already folded into `Settings::default()` win
    /// over file values for the same key.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref region) = self.region {
            if env_override("ANALYSIS_REGION").is_none() {
                settings.region = region.clone();
                if env_override("ANALYSIS_ENDPOINT").is_none() {
                    settings.analysis_endpoint = default_analysis_endpoint(region);
                }
                if env_override("STORAGE_ENDPOINT").is_none() {
                    settings.storage_endpoint = default_storage_endpoint(region);
                }
            }
        }
        apply_unless_env(&mut settings.input_bucket, &self.input_bucket, "ANALYSIS_INPUT_BUCKET");
        apply_unless_env(&mut settings.job_bucket, &self.job_bucket, "ANALYSIS_JOB_BUCKET");
        apply_unless_env(
            &mut settings.data_access_role_arn,
            &self.data_access_role_arn,
            "ANALYSIS_ROLE_ARN",
        );
        apply_unless_env(
            &mut settings.analysis_endpoint,
            &self.analysis_endpoint,
            "ANALYSIS_ENDPOINT",
        );
        apply_unless_env(
            &mut settings.storage_endpoint,
            &self.storage_endpoint,
            "STORAGE_ENDPOINT",
        );
        if let Some(ref language) = self.language_code {
            settings.language_code = language.clone();
        }
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval = Duration::from_secs(secs);
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(ref dir) = self.store_dir {
            settings.store_dir = Some(self.resolve_path(dir, base_dir));
        }
    }
}

fn apply_unless_env(target: &mut String, value: &Option<String>, env_name: &str) {
    if let Some(value) = value {
        if env_override(env_name).is_none() {
            *target = value.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings from the config file (explicit or discovered) and environment.
///
/// An explicit config path that cannot be read or parsed is an error;
/// a discovered one that fails is skipped.
pub async fn load_settings(options: &LoadOptions) -> Result<(Settings, Config), String> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    Ok((settings, config))
}
