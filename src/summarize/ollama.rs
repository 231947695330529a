//! Ollama text-generation client.
//!
//! Talks to a local Ollama server's `/api/generate` endpoint with streaming
//! disabled, so each prompt is a single request/response pair.

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("model server returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// A text-completion backend. Implemented by [`OllamaClient`]; tests swap in
/// fakes that record prompts.
pub trait LanguageModel {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, ModelError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl OllamaClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
            temperature,
        }
    }
}

impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let parsed: GenerateResponse =
            serde_json::from_slice(&body).map_err(|e| ModelError::Decode(e.to_string()))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(reqwest::Client::new(), &format!("{}/", server.uri()), "llama3", 0.3)
    }

    #[tokio::test]
    async fn test_generate_sends_non_streaming_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3",
                "prompt": "Summarize this",
                "stream": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3",
                "response": "  - point one\n- point two\n",
                "done": true,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).generate("Summarize this").await.unwrap();
        assert_eq!(text, "- point one\n- point two");
    }

    #[tokio::test]
    async fn test_generate_surfaces_server_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model 'llama3' not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        match err {
            ModelError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("not found"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_malformed_and_empty_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "   "})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(client.generate("x").await, Err(ModelError::Decode(_))));
        assert!(matches!(client.generate("x").await, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_generate_network_failure() {
        let client = OllamaClient::new(reqwest::Client::new(), "http://127.0.0.1:9", "llama3", 0.3);
        assert!(matches!(client.generate("x").await, Err(ModelError::Network(_))));
    }
}
