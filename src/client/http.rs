//! HTTP client for the analysis service's JSON 1.1 protocol.
//!
//! Every operation is a POST to the service endpoint, named by the
//! `X-Amz-Target` header. Request signing is not performed; point the
//! endpoint at a signing proxy or a local emulator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AnalysisService;
use crate::config::Settings;
use crate::error::AnalysisError;
use crate::models::{
    DetectedEntity, JobDescription, JobKind, JobRequest, JobStatus, KeyPhrase,
};

const TARGET_PREFIX: &str = "Comprehend_20171127";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Connection settings for [`HttpAnalysisClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub language_code: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            endpoint: settings.analysis_endpoint.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            language_code: settings.language_code.clone(),
            timeout: Duration::from_secs(settings.request_timeout),
        }
    }
}

pub struct HttpAnalysisClient {
    config: ClientConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentRequest<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentResponse {
    sentiment_score: SentimentScore,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentimentScore {
    negative: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchRequest<'a> {
    text_list: [&'a str; 1],
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchResponse<T> {
    #[serde(default = "Vec::new")]
    result_list: Vec<T>,
    #[serde(default)]
    error_list: Vec<BatchItemError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchEntitiesItem {
    #[serde(default)]
    entities: Vec<DetectedEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchKeyPhrasesItem {
    #[serde(default)]
    key_phrases: Vec<KeyPhrase>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchItemError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

impl BatchItemError {
    fn describe(&self) -> String {
        format!(
            "{}: {}",
            self.error_code.as_deref().unwrap_or("Error"),
            self.error_message.as_deref().unwrap_or("unknown batch error")
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartJobRequest<'a> {
    input_data_config: InputDataConfig<'a>,
    output_data_config: OutputDataConfig<'a>,
    data_access_role_arn: &'a str,
    language_code: &'a str,
    client_request_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InputDataConfig<'a> {
    s3_uri: &'a str,
    input_format: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OutputDataConfig<'a> {
    s3_uri: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartJobResponse {
    job_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeJobRequest<'a> {
    job_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeJobResponse {
    #[serde(alias = "KeyPhrasesDetectionJobProperties")]
    entities_detection_job_properties: Option<JobProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobProperties {
    job_status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    output_data_config: Option<JobOutputConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobOutputConfig {
    s3_uri: Option<String>,
}

/// Service error body. The service uses either casing for the message.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

impl HttpAnalysisClient {
    pub fn new(config: ClientConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Detection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Invoke one service operation. Errors are returned as plain messages
    /// so each caller can classify them.
    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, String>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| e.to_string())?;
        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .body(payload);
        if let Some(ref token) = self.config.api_token {
            request = request.bearer_auth(token);
        }

        debug!("Calling {}", operation);
        let resp = request
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", operation, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(describe_service_error(operation, status.as_u16(), &text));
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| format!("{} returned an unreadable response: {}", operation, e))
    }

    fn batch_request<'a>(&'a self, text: &'a str) -> BatchRequest<'a> {
        BatchRequest {
            text_list: [text],
            language_code: &self.config.language_code,
        }
    }
}

fn describe_service_error(operation: &str, status: u16, body: &str) -> String {
    match serde_json::from_str::<ServiceErrorBody>(body) {
        Ok(ServiceErrorBody {
            kind,
            message: Some(message),
        }) => match kind {
            Some(kind) => format!("{} failed (HTTP {}): {}: {}", operation, status, kind, message),
            None => format!("{} failed (HTTP {}): {}", operation, status, message),
        },
        _ if body.is_empty() => format!("{} failed (HTTP {})", operation, status),
        _ => format!("{} failed (HTTP {}): {}", operation, status, body),
    }
}

/// Take the single batch result, surfacing a per-item error if present.
fn single_batch_result<T>(response: BatchResponse<T>) -> Result<T, AnalysisError> {
    if let Some(err) = response.error_list.first() {
        return Err(AnalysisError::Detection(err.describe()));
    }
    response
        .result_list
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::Detection("service returned no batch result".to_string()))
}

fn start_operation(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Entities => "StartEntitiesDetectionJob",
        JobKind::KeyPhrases => "StartKeyPhrasesDetectionJob",
    }
}

fn describe_operation(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Entities => "DescribeEntitiesDetectionJob",
        JobKind::KeyPhrases => "DescribeKeyPhrasesDetectionJob",
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn detect_sentiment(&self, text: &str) -> Result<f64, AnalysisError> {
        let body = DetectSentimentRequest {
            text,
            language_code: &self.config.language_code,
        };
        let resp: DetectSentimentResponse = self
            .call("DetectSentiment", &body)
            .await
            .map_err(AnalysisError::Detection)?;
        Ok(resp.sentiment_score.negative)
    }

    async fn batch_detect_entities(
        &self,
        text: &str,
    ) -> Result<Vec<DetectedEntity>, AnalysisError> {
        let resp: BatchResponse<BatchEntitiesItem> = self
            .call("BatchDetectEntities", &self.batch_request(text))
            .await
            .map_err(AnalysisError::Detection)?;
        Ok(single_batch_result(resp)?.entities)
    }

    async fn batch_detect_key_phrases(&self, text: &str) -> Result<Vec<KeyPhrase>, AnalysisError> {
        let resp: BatchResponse<BatchKeyPhrasesItem> = self
            .call("BatchDetectKeyPhrases", &self.batch_request(text))
            .await
            .map_err(AnalysisError::Detection)?;
        Ok(single_batch_result(resp)?.key_phrases)
    }

    async fn start_job(&self, kind: JobKind, request: &JobRequest) -> Result<String, AnalysisError> {
        let body = StartJobRequest {
            input_data_config: InputDataConfig {
                s3_uri: &request.input_uri,
                input_format: "ONE_DOC_PER_FILE",
            },
            output_data_config: OutputDataConfig {
                s3_uri: &request.output_uri,
            },
            data_access_role_arn: &request.data_access_role_arn,
            language_code: &request.language_code,
            client_request_token: uuid::Uuid::new_v4().to_string(),
        };
        let resp: StartJobResponse = self
            .call(start_operation(kind), &body)
            .await
            .map_err(AnalysisError::Submission)?;
        resp.job_id
            .ok_or_else(|| AnalysisError::Submission("service returned no job id".to_string()))
    }

    async fn describe_job(
        &self,
        kind: JobKind,
        job_id: &str,
    ) -> Result<JobDescription, AnalysisError> {
        let resp: DescribeJobResponse = self
            .call(describe_operation(kind), &DescribeJobRequest { job_id })
            .await
            .map_err(AnalysisError::Poll)?;
        let props = resp.entities_detection_job_properties.ok_or_else(|| {
            AnalysisError::Poll(format!("no properties returned for job {}", job_id))
        })?;
        let status = props
            .job_status
            .as_deref()
            .map(JobStatus::from_str)
            .ok_or_else(|| AnalysisError::Poll(format!("no status returned for job {}", job_id)))?;

        Ok(JobDescription {
            status,
            output_uri: props.output_data_config.and_then(|c| c.s3_uri),
            message: props.message,
        })
    }
}
