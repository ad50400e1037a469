//! HTTP object store using path-style `GET {endpoint}/{bucket}/{key}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{ObjectLocation, ObjectStore};
use crate::error::AnalysisError;

pub struct HttpObjectStore {
    endpoint: Url,
    client: Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AnalysisError::Download(format!("invalid storage endpoint: {}", e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Download(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { endpoint, client })
    }

    /// Build the object URL, percent-encoding each key segment.
    fn object_url(&self, location: &ObjectLocation) -> Result<Url, AnalysisError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AnalysisError::Download(format!("endpoint cannot be a base: {}", self.endpoint))
            })?
            .pop_if_empty()
            .push(&location.bucket)
            .extend(location.key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, AnalysisError> {
        let url = self.object_url(location)?;
        tracing::info!("Downloading {}", location);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::Download(format!("{}: {}", location, e)))?;

        if !resp.status().is_success() {
            return Err(AnalysisError::Download(format!(
                "{}: HTTP {}",
                location,
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AnalysisError::Download(format!("{}: {}", location, e)))?;
        Ok(bytes.to_vec())
    }
}
