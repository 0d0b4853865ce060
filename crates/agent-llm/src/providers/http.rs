//! HTTP provider for an external reasoning service
//!
//! The service receives the [`CompletionRequest`] as JSON and answers with a
//! [`CompletionResponse`].

use crate::{CompletionRequest, CompletionResponse, LLMError, LLMProvider, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Provider that posts the conversation to an HTTP endpoint
pub struct HttpProvider {
    client: Client,
    endpoint: Url,
}

impl HttpProvider {
    /// Create a new HTTP provider
    ///
    /// # Arguments
    ///
    /// * `endpoint` - URL the completion request is posted to
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// The endpoint requests are posted to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LLMProvider for HttpProvider {
    #[instrument(skip(self, request), fields(model = %request.model, subject = %request.subject))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(messages = request.messages.len(), "Sending request to producer endpoint");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        if let Some(usage) = &completion.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Producer response received"
            );
        }

        Ok(completion)
    }

    fn name(&self) -> &str {
        "http"
    }
}
