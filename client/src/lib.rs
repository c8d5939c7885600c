use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use thiserror::Error;

use shared::{LivenessRequest, LivenessResponse, ModelStatusResponse};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered, but flagged the prediction as failed.
    #[error("prediction rejected by server: {0}")]
    RemoteFailure(String),
    #[error("transport failure: {0}")]
    TransportFailure(#[from] reqwest::Error),
    #[error("could not read input: {0}")]
    Input(#[from] std::io::Error),
}

/// One item of a prediction batch.
pub enum BatchInput {
    File(PathBuf),
    Bytes { data: Vec<u8>, format: String },
}

/// Wraps a connection to the liveness service. The pooled HTTP connections
/// are released when the client is dropped, on every exit path.
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(server_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn predict_from_bytes(
        &self,
        bytes: &[u8],
        declared_format: &str,
    ) -> Result<LivenessResponse, ClientError> {
        log::info!(
            "Sending prediction request ({} bytes, format {})",
            bytes.len(),
            declared_format
        );
        let request = LivenessRequest {
            image_data: STANDARD.encode(bytes),
            image_format: declared_format.to_string(),
        };
        let response: LivenessResponse = self
            .http
            .post(format!("{}/api/predict", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        into_result(response)
    }

    pub async fn predict_file(&self, path: &Path) -> Result<LivenessResponse, ClientError> {
        let bytes = std::fs::read(path)?;
        self.predict_from_bytes(&bytes, &format_from_path(path))
            .await
    }

    /// Issues the requests concurrently and returns one result per input,
    /// in input order. A failed item never aborts or drops the others.
    pub async fn predict_batch(
        &self,
        inputs: &[BatchInput],
    ) -> Vec<Result<LivenessResponse, ClientError>> {
        join_all(inputs.iter().map(|input| async move {
            match input {
                BatchInput::File(path) => self.predict_file(path).await,
                BatchInput::Bytes { data, format } => {
                    self.predict_from_bytes(data, format).await
                }
            }
        }))
        .await
    }

    pub async fn status(&self) -> Result<ModelStatusResponse, ClientError> {
        Ok(self
            .http
            .get(format!("{}/api/model/status", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

fn into_result(response: LivenessResponse) -> Result<LivenessResponse, ClientError> {
    if response.success {
        Ok(response)
    } else {
        log::error!("Prediction failed: {}", response.error_message);
        Err(ClientError::RemoteFailure(response.error_message))
    }
}

/// Declared format from the file extension; "jpg" maps to "jpeg" and an
/// unknown extension falls back to "jpeg", matching the server's advisory
/// treatment of the field.
pub fn format_from_path(path: &Path) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            let lowered = ext.to_ascii_lowercase();
            if lowered == "jpg" {
                "jpeg".to_string()
            } else {
                lowered
            }
        }
        None => "jpeg".to_string(),
    }
}
