//! Story generation: validate the request, pick a client, render the prompt,
//! decode the drawing and make one backend call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::{
    backend::{
        BackendFactory, BackendRequest, BackendResponse, ChatClientFactory, ClientResolver,
        StoryBackend, StoryImage,
    },
    config::{AppConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS},
    error::{BackendError, Result, StoryError},
    logger,
    models::{GenerationRequest, GenerationResult, ImageMediaType, StoryLength, StoryStyle},
    prompt::{self, DEFAULT_TEMPLATE, IMAGE_DESCRIPTION},
    settings::{self, Settings},
};

pub struct StoryGenerator {
    resolver: ClientResolver,
    pool: Arc<Semaphore>,
    timeout: Duration,
    max_tokens: u32,
}

/// Request fields after validation.
struct ValidRequest {
    child_name: String,
    style: StoryStyle,
    length: StoryLength,
    media_type: ImageMediaType,
}

impl StoryGenerator {
    pub fn new(resolver: ClientResolver) -> Self {
        Self {
            resolver,
            pool: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Generator talking to the configured OpenAI-compatible endpoint, with the
    /// operator key (if any) as the shared default client.
    pub fn from_config(config: &AppConfig) -> Self {
        let factory: Arc<dyn BackendFactory> = Arc::new(ChatClientFactory::new(&config.api_base));
        Self::new(ClientResolver::new(factory, config.api_key.as_deref()))
            .with_timeout(config.request_timeout)
            .with_max_concurrent(config.max_concurrent)
            .with_max_tokens(config.max_tokens)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upper bound on backend calls in flight at once.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.pool = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn resolver(&self) -> &ClientResolver {
        &self.resolver
    }

    pub async fn generate_story(
        &self,
        request: GenerationRequest,
        settings: &Settings,
    ) -> Result<GenerationResult> {
        let valid = validate(&request)?;

        let model = request
            .model
            .as_deref()
            .unwrap_or(&settings.model_identifier)
            .trim()
            .to_string();
        let temperature = request.temperature.unwrap_or(settings.sampling_temperature);
        settings::validate_sampling(&model, temperature)?;

        let api_key = non_blank(request.api_key.as_deref()).or(settings.credential());
        let client = self.resolver.resolve(api_key)?;

        let variables = prompt::build_variables(
            &valid.child_name,
            valid.style,
            valid.length,
            IMAGE_DESCRIPTION,
        );
        let template = non_blank(request.prompt_template.as_deref())
            .or(settings.custom_prompt_template())
            .unwrap_or(DEFAULT_TEMPLATE);
        let prompt = prompt::render(template, &variables)?;

        let image = decode_image(request.image, valid.media_type).await?;

        log::info!(
            "Generating a {} {} story for {} with {}",
            valid.length,
            valid.style,
            valid.child_name,
            model
        );

        let response = self
            .invoke(
                client.into_backend(),
                BackendRequest {
                    prompt,
                    image,
                    model: model.clone(),
                    temperature,
                    max_tokens: self.max_tokens,
                },
            )
            .await?;

        let usage = response.usage.unwrap_or_default();
        log::info!(
            "Story ready: {} chars, {} tokens ({} prompt, {} output)",
            response.text.chars().count(),
            usage.total_units,
            usage.prompt_units,
            usage.output_units
        );

        Ok(GenerationResult {
            text: response.text,
            usage,
            model: response.model.unwrap_or(model),
        })
    }

    /// Runs the backend call as its own task, holding a pool slot until it finishes
    /// or times out.
    async fn invoke(
        &self,
        backend: Arc<dyn StoryBackend>,
        request: BackendRequest,
    ) -> std::result::Result<BackendResponse, BackendError> {
        let permit = Arc::clone(&self.pool)
            .acquire_owned()
            .await
            .map_err(|e| BackendError::Worker(e.to_string()))?;
        let timeout = self.timeout;

        let mut task = AbortOnDrop(tokio::spawn(async move {
            let _permit = permit;
            let _timer = logger::timer(format!("backend call to {}", request.model));
            match tokio::time::timeout(timeout, backend.generate(request)).await {
                Ok(result) => result,
                Err(_) => {
                    log::error!("Backend call timed out after {:?}", timeout);
                    Err(BackendError::Timeout(timeout))
                }
            }
        }));

        (&mut task.0)
            .await
            .map_err(|e| BackendError::Worker(e.to_string()))?
    }
}

/// Aborts the backend task, and so frees its pool slot, when the caller stops
/// waiting for it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn validate(request: &GenerationRequest) -> Result<ValidRequest> {
    let child_name = request.child_name.trim();
    if child_name.is_empty() {
        return Err(StoryError::invalid_input(
            "child_name",
            "child's name cannot be empty",
        ));
    }

    let style = StoryStyle::from_tag(&request.style).ok_or_else(|| {
        StoryError::invalid_input("style", format!("unknown story style '{}'", request.style))
    })?;

    let length = StoryLength::from_tag(&request.length).ok_or_else(|| {
        StoryError::invalid_input(
            "length",
            format!("unknown story length '{}'", request.length),
        )
    })?;

    let media_type = ImageMediaType::from_mime(&request.media_type).ok_or_else(|| {
        StoryError::invalid_input(
            "media_type",
            format!("unsupported image format '{}'", request.media_type),
        )
    })?;

    Ok(ValidRequest {
        child_name: child_name.to_string(),
        style,
        length,
        media_type,
    })
}

/// Decoding runs on the blocking thread pool.
async fn decode_image(bytes: Vec<u8>, media_type: ImageMediaType) -> Result<StoryImage> {
    if bytes.is_empty() {
        return Err(StoryError::InvalidImage("image is empty".into()));
    }

    tokio::task::spawn_blocking(move || -> Result<StoryImage> {
        let decoded = image::load_from_memory_with_format(&bytes, media_type.image_format())
            .map_err(|e| {
                StoryError::InvalidImage(format!("could not decode {}: {}", media_type.mime(), e))
            })?;
        log::debug!("Decoded {}x{} drawing", decoded.width(), decoded.height());
        Ok(StoryImage {
            media_type,
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    })
    .await
    .map_err(|e| StoryError::InvalidImage(format!("decoder task failed: {}", e)))?
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
