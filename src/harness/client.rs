//! Predict client: sends one file to the classification endpoint.

use crate::error::SubmissionError;
use crate::server::PredictionResponse;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Remote classifier as seen by the harness.
#[async_trait]
pub trait PredictClient: Send + Sync {
    async fn predict(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<PredictionResponse, SubmissionError>;
}

pub struct HttpPredictClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPredictClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SubmissionError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PredictClient for HttpPredictClient {
    async fn predict(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<PredictionResponse, SubmissionError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let res = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmissionError::Timeout(self.timeout)
                } else {
                    SubmissionError::Network(e.to_string())
                }
            })?;
        if !res.status().is_success() {
            return Err(SubmissionError::Status(res.status().as_u16()));
        }
        res.json::<PredictionResponse>()
            .await
            .map_err(|e| SubmissionError::Decode(e.to_string()))
    }
}
