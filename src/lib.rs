//! Turns a child's drawing into a short story.
//!
//! A [`StoryGenerator`] validates a [`GenerationRequest`], picks a backend client
//! (the caller's own key, the key saved in [`Settings`], or the operator default),
//! renders the prompt template and sends prompt plus drawing to an
//! OpenAI-compatible multimodal model.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logger;
pub mod models;
pub mod prompt;
#[cfg(feature = "server")]
pub mod server;
pub mod settings;

pub use backend::{
    BackendFactory, ChatClient, ChatClientFactory, ClientHandle, ClientResolver, ClientScope,
    StoryBackend,
};
pub use config::AppConfig;
pub use error::{
    BackendError, CredentialError, PersistError, Result, StoryError, TemplateError,
};
pub use generator::StoryGenerator;
pub use models::{
    GenerationRequest, GenerationResult, ImageMediaType, StoryLength, StoryStyle, Usage,
};
pub use prompt::{PromptVariables, DEFAULT_TEMPLATE};
pub use settings::{Settings, SettingsStore};
