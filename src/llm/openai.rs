//! OpenAI-compatible chat-completions client.

use super::{CompletionRequest, LlmClient, LlmClientError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// HTTP client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAiClient {
    /// Build a client for the given endpoint, key, and per-request timeout.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, LlmClientError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(LlmClientError::Configuration(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("findoc-analyzer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|error| LlmClientError::Configuration(error.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmClientError> {
        let payload = json!({
            "model": request.model,
            "temperature": request.temperature,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.prompt },
            ],
        });

        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LlmClientError::Timeout(self.timeout.as_secs())
                } else {
                    LlmClientError::ProviderUnavailable(format!(
                        "failed to reach {}: {error}",
                        self.base_url
                    ))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                LlmClientError::Timeout(self.timeout.as_secs())
            } else {
                LlmClientError::InvalidResponse(format!(
                    "failed to decode chat completion: {error}"
                ))
            }
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                LlmClientError::InvalidResponse("chat completion contained no text".into())
            })?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".into(),
            system_prompt: "You are a Senior Financial Analyst.".into(),
            prompt: "Summarize the report.".into(),
            temperature: 0.3,
        }
    }

    fn client(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(
            &format!("{}/v1/", server.base_url()),
            "sk-test",
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{"model": "gpt-4o-mini"}"#);
                then.status(200).json_body(json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Revenue is up." } }
                    ]
                }));
            })
            .await;

        let text = client(&server).complete(request()).await.expect("completion");

        mock.assert_async().await;
        assert_eq!(text, "Revenue is up.");
    }

    #[tokio::test]
    async fn error_status_carries_upstream_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("quota exceeded");
            })
            .await;

        let error = client(&server)
            .complete(request())
            .await
            .expect_err("quota error");

        assert!(
            matches!(&error, LlmClientError::GenerationFailed(message) if message.contains("429") && message.contains("quota exceeded"))
        );
    }

    #[tokio::test]
    async fn empty_choices_are_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client(&server)
            .complete(request())
            .await
            .expect_err("empty response");

        assert!(matches!(error, LlmClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!({ "choices": [] }));
            })
            .await;
        let client = OpenAiClient::new(
            &format!("{}/v1", server.base_url()),
            "sk-test",
            Duration::from_secs(1),
        )
        .expect("client");

        let error = client.complete(request()).await.expect_err("timeout");

        assert!(matches!(error, LlmClientError::Timeout(1)), "{error:?}");
    }

    #[tokio::test]
    async fn unreachable_backend_is_unavailable() {
        let client = OpenAiClient::new("http://127.0.0.1:9", "sk-test", Duration::from_secs(5))
            .expect("client");

        let error = client.complete(request()).await.expect_err("connection refused");

        assert!(
            matches!(&error, LlmClientError::ProviderUnavailable(message) if message.contains("http://127.0.0.1:9")),
            "{error:?}"
        );
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let result = OpenAiClient::new("api.openai.com/v1", "sk-test", Duration::from_secs(5));
        assert!(matches!(result, Err(LlmClientError::Configuration(_))));
    }
}
