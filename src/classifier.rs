//! Client for the external sentiment classifier.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClassificationError;
use crate::models::SentimentLabel;

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, ClassificationError>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    feedback: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClassificationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClassificationError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ClassificationError {
        if err.is_timeout() {
            ClassificationError::Timeout(self.timeout)
        } else {
            ClassificationError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, ClassificationError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest { feedback: text })
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassificationError::Status {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let body: Value = resp.json().await.map_err(|err| {
            if err.is_timeout() {
                ClassificationError::Timeout(self.timeout)
            } else {
                ClassificationError::MalformedPayload(err.to_string())
            }
        })?;
        parse_label(&body)
    }
}

/// Extracts the `sentiment` label from a classifier response body.
pub fn parse_label(body: &Value) -> Result<SentimentLabel, ClassificationError> {
    let raw = body
        .get("sentiment")
        .ok_or_else(|| ClassificationError::MalformedPayload("missing `sentiment` field".to_string()))?;
    let label = raw
        .as_str()
        .ok_or_else(|| ClassificationError::UnrecognizedLabel(raw.to_string()))?;
    SentimentLabel::from_label(label)
        .ok_or_else(|| ClassificationError::UnrecognizedLabel(label.to_string()))
}
