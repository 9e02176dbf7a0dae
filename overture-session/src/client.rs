use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use overture_core::OvertureConfig;

use crate::{Event, Feedback, UpdateChain};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reporting endpoint returned {status}: {body}")]
    Http { status: StatusCode, body: Value },
    #[error("unparseable response: {status} {body}")]
    UnparseableResponse { status: StatusCode, body: String },
    #[error("missing feedback key")]
    MissingFeedbackKey,
    #[error("missing API key")]
    MissingApiKey,
}

#[derive(Clone)]
pub struct SessionClient {
    http: Client,
    config: OvertureConfig,
}

impl SessionClient {
    pub fn new(config: OvertureConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Deliver one telemetry event. This runs on the detached reporting
    /// path: a missing API key is a logged no-op, and delivery failures are
    /// logged and swallowed so they can never reach the caller.
    pub async fn send_event(&self, event: &Event, api_key: Option<&SecretString>) {
        let Some(api_key) = api_key.or(self.config.api_key.as_ref()) else {
            warn!("no API key configured, event will not be sent");
            return;
        };
        if let Err(err) = self
            .post(&self.config.reporting_url, event, api_key.expose_secret())
            .await
        {
            error!(error = %err, "failed to deliver telemetry event");
        }
    }

    /// Send a rating or correction for an earlier call. Unlike event
    /// delivery this is caller-initiated, so failures surface as errors.
    pub async fn send_feedback(&self, mut feedback: Feedback) -> Result<Value, SessionError> {
        if feedback.feedback_key.is_none() {
            return Err(SessionError::MissingFeedbackKey);
        }
        if feedback.api_key.is_none() {
            feedback.api_key = self
                .config
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string());
        }
        let Some(api_key) = feedback.api_key.clone() else {
            return Err(SessionError::MissingApiKey);
        };
        self.post(&self.config.feedback_url, &feedback, &api_key)
            .await
    }

    /// Record the final result of a chain of calls.
    pub async fn update_chain(&self, mut update: UpdateChain) -> Result<Value, SessionError> {
        if update.api_key.is_none() {
            update.api_key = self
                .config
                .api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string());
        }
        let Some(api_key) = update.api_key.clone() else {
            return Err(SessionError::MissingApiKey);
        };
        self.post(&self.config.chain_url, &update, &api_key).await
    }

    async fn post<T: Serialize>(
        &self,
        url: &str,
        payload: &T,
        api_key: &str,
    ) -> Result<Value, SessionError> {
        let response = self
            .http
            .post(url)
            .header("x-api-key", api_key)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = extract_json_body(response).await?;
        if !status.is_success() {
            return Err(SessionError::Http { status, body });
        }
        Ok(body)
    }
}

async fn extract_json_body(response: reqwest::Response) -> Result<Value, SessionError> {
    let status = response.status();
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|_| SessionError::UnparseableResponse { status, body })
}
