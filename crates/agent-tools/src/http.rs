//! Tool gateway backed by an external HTTP service
//!
//! Each call is a `POST {endpoint}/tools/{name}` with the arguments as the
//! JSON body. A 2xx answer carries `{"output": ...}`; anything else is a
//! tool failure.

use agent_core::{GatewayError, ToolErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::gateway::{ToolGateway, output_text};

#[derive(Debug, Deserialize)]
struct ToolResponse {
    output: Value,
}

/// Gateway forwarding tool calls to an HTTP service
pub struct HttpToolGateway {
    client: Client,
    endpoint: Url,
}

impl HttpToolGateway {
    /// Create a gateway for the service at `endpoint`
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    fn tool_url(&self, name: &str) -> Result<Url, GatewayError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                GatewayError::new(ToolErrorKind::Transport, name, "endpoint cannot carry a path")
            })?
            .pop_if_empty()
            .extend(["tools", name]);
        Ok(url)
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    #[instrument(skip(self, args))]
    async fn invoke(&self, name: &str, args: Value) -> Result<String, GatewayError> {
        let url = self.tool_url(name)?;
        let transport = |e: reqwest::Error| {
            GatewayError::new(ToolErrorKind::Transport, name, e.to_string())
        };

        let response = self
            .client
            .post(url)
            .json(&args)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(GatewayError::not_found(name));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::failed(name, format!("HTTP {status}: {body}")));
        }

        let body: ToolResponse = response.json().await.map_err(|e| {
            GatewayError::failed(name, format!("unexpected tool response: {e}"))
        })?;
        debug!(tool = name, "Tool gateway call succeeded");
        Ok(output_text(body.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_url() {
        let endpoint = Url::parse("http://localhost:8701/api/").unwrap();
        let gateway = HttpToolGateway::new(endpoint, Duration::from_secs(5)).unwrap();
        let url = gateway.tool_url("get_news").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8701/api/tools/get_news");
    }
}
