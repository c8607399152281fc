use async_trait::async_trait;
use std::sync::Arc;

use super::{BackendFactory, BackendRequest, BackendResponse, StoryBackend};
use crate::{
    error::BackendError,
    models::{
        ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, ImageUrl, Usage,
    },
};

const APP_TITLE: &str = "storygen";

/// Client for OpenAI-compatible `/chat/completions` endpoints (OpenRouter by default).
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), api_key, api_base)
    }

    pub fn with_http_client(
        http: reqwest::Client,
        api_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    fn build_payload(&self, request: &BackendRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: request.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                ],
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl StoryBackend for ChatClient {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    async fn generate(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
        let payload = self.build_payload(&request);

        log::info!("Invoking model: {}", request.model);
        log::debug!(
            "Story request: prompt {} chars, image {}x{} ({} bytes), temperature {}",
            request.prompt.chars().count(),
            request.image.width,
            request.image.height,
            request.image.bytes.len(),
            request.temperature
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("X-Title", APP_TITLE)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("Chat completion transport error: {:?}", e);
                BackendError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            log::error!("Backend returned {}: {}", status, body);
            return Err(classify_status(status.as_u16(), body));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        into_backend_response(completion)
    }
}

fn classify_status(status: u16, body: String) -> BackendError {
    match status {
        401 | 403 => BackendError::Unauthorized(body),
        429 => BackendError::RateLimited(body),
        _ => BackendError::Status { status, body },
    }
}

fn into_backend_response(
    completion: ChatCompletionResponse,
) -> Result<BackendResponse, BackendError> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::MalformedResponse("response has no choices".into()))?;

    if let Some(reason) = &choice.finish_reason {
        log::debug!("Finish reason: {}", reason);
    }

    let text = choice
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| BackendError::MalformedResponse("response has no story text".into()))?;

    let usage = completion.usage.map(|u| {
        let computed = u.prompt_tokens.saturating_add(u.completion_tokens);
        Usage {
            prompt_units: u.prompt_tokens,
            output_units: u.completion_tokens,
            total_units: u.total_tokens.max(computed),
        }
    });

    Ok(BackendResponse {
        text,
        usage,
        model: completion.model,
    })
}

/// Hands out [`ChatClient`]s that share one connection pool.
#[derive(Clone)]
pub struct ChatClientFactory {
    http: reqwest::Client,
    api_base: String,
}

impl ChatClientFactory {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }
}

impl BackendFactory for ChatClientFactory {
    fn create(&self, api_key: &str) -> Arc<dyn StoryBackend> {
        Arc::new(ChatClient::with_http_client(
            self.http.clone(),
            api_key,
            self.api_base.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StoryImage;
    use crate::models::ImageMediaType;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> BackendRequest {
        BackendRequest {
            prompt: "Write a story about Amina".into(),
            image: StoryImage {
                media_type: ImageMediaType::Png,
                bytes: vec![1, 2, 3],
                width: 1,
                height: 1,
            },
            model: "openrouter/polaris-alpha".into(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    #[tokio::test]
    async fn test_generate_parses_story_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "openrouter/polaris-alpha",
                "max_tokens": 2000,
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Write a story about Amina"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AQID"}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "gen-1",
                "model": "openrouter/polaris-alpha",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Bila jednom Amina..."},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 812, "completion_tokens": 420, "total_tokens": 1232}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new("sk-test", format!("{}/api/v1/", server.uri()));
        let response = client.generate(request()).await.unwrap();

        assert_eq!(response.text, "Bila jednom Amina...");
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_units: 812,
                output_units: 420,
                total_units: 1232,
            })
        );
    }

    #[tokio::test]
    async fn test_missing_usage_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "A story"}}]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new("sk-test", server.uri());
        let response = client.generate(request()).await.unwrap();
        assert_eq!(response.text, "A story");
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_status_codes_are_classified() {
        for (status, check) in [
            (401u16, "unauthorized"),
            (403, "unauthorized"),
            (429, "rate_limited"),
            (500, "status"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;

            let client = ChatClient::new("sk-bad", server.uri());
            let err = client.generate(request()).await.unwrap_err();
            match check {
                "unauthorized" => assert!(matches!(err, BackendError::Unauthorized(_))),
                "rate_limited" => assert!(matches!(err, BackendError::RateLimited(_))),
                _ => assert_eq!(
                    err,
                    BackendError::Status {
                        status: 500,
                        body: "nope".into()
                    }
                ),
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_responses() {
        for body in [
            json!({"choices": []}),
            json!({"choices": [{"message": {"content": null}}]}),
            json!({"choices": [{"message": {"content": "   "}}]}),
            json!({"unexpected": true, "choices": "nope"}),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let client = ChatClient::new("sk-test", server.uri());
            let err = client.generate(request()).await.unwrap_err();
            assert!(matches!(err, BackendError::MalformedResponse(_)));
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let client = ChatClient::new("sk-test", "http://127.0.0.1:1");
        let err = client.generate(request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[test]
    fn test_total_never_below_parts() {
        let completion: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "story"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }))
        .unwrap();
        let usage = into_backend_response(completion).unwrap().usage.unwrap();
        assert_eq!(usage.total_units, 15);
    }

    #[test]
    fn test_factory_binds_each_client_to_its_key() {
        let factory = ChatClientFactory::new("http://localhost");
        let a = factory.create("sk-a");
        let b = factory.create("sk-b");
        assert_eq!(a.api_key(), "sk-a");
        assert_eq!(b.api_key(), "sk-b");
    }
}
