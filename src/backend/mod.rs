pub mod chat_client;
#[cfg(test)]
pub(crate) mod mock;
pub mod resolver;

use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;

use crate::error::BackendError;
use crate::models::{ImageMediaType, Usage};

pub use chat_client::{ChatClient, ChatClientFactory};
pub use resolver::{ClientHandle, ClientResolver, ClientScope};

/// A decoded, validated drawing ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryImage {
    pub media_type: ImageMediaType,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl StoryImage {
    /// `data:` URL carrying the original bytes, base64 encoded.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub prompt: String,
    pub image: StoryImage,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub text: String,
    /// `None` when the backend did not report usage.
    pub usage: Option<Usage>,
    pub model: Option<String>,
}

/// A multimodal text generation service bound to one credential.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// The credential this client authenticates with.
    fn api_key(&self) -> &str;

    async fn generate(&self, request: BackendRequest) -> Result<BackendResponse, BackendError>;
}

/// Builds a fresh backend client for a credential.
pub trait BackendFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Arc<dyn StoryBackend>;
}
