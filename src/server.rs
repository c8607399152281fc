//! HTTP boundary: health check, settings read/replace and story generation.

use actix_web::{
    error::{InternalError, JsonPayloadError},
    http::StatusCode,
    web, App, HttpRequest, HttpResponse, HttpServer, ResponseError,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::AppConfig,
    error::{BackendError, StoryError},
    generator::StoryGenerator,
    models::{GenerationRequest, Usage},
    settings::{Settings, SettingsStore},
};

/// Drawings arrive base64 encoded inside JSON.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub struct AppState {
    pub generator: StoryGenerator,
    pub store: SettingsStore,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            generator: StoryGenerator::from_config(config),
            store: SettingsStore::new(&config.settings_path),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequestBody {
    /// Base64 image bytes, optionally as a `data:` URL.
    pub image: String,
    pub media_type: String,
    pub child_name: String,
    pub style: String,
    pub length: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoryResponseBody {
    pub story: String,
    pub usage: Usage,
    pub model: String,
}

impl ResponseError for StoryError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoryError::InvalidInput { .. }
            | StoryError::InvalidImage(_)
            | StoryError::BadTemplate(_) => StatusCode::BAD_REQUEST,
            StoryError::NoCredential => StatusCode::UNAUTHORIZED,
            StoryError::BackendFailure(BackendError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            StoryError::BackendFailure(_) => StatusCode::BAD_GATEWAY,
            StoryError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(json_error);

    cfg.app_data(json)
        .route("/api/health", web::get().to(health))
        .route("/api/settings", web::get().to(get_settings))
        .route("/api/settings", web::put().to(put_settings))
        .route("/api/generate-story", web::post().to(generate_story));
}

pub async fn run(config: AppConfig) -> std::io::Result<()> {
    let port = config.port;
    let state = web::Data::new(AppState::from_config(&config));

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let status = match &err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        _ => StatusCode::BAD_REQUEST,
    };
    let response =
        HttpResponse::build(status).json(json!({ "error": format!("invalid request body: {}", err) }));
    InternalError::from_response(err, response).into()
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

async fn load_settings(store: &SettingsStore) -> actix_web::Result<Settings> {
    let store = store.clone();
    Ok(web::block(move || store.load()).await?)
}

async fn get_settings(state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let settings = load_settings(&state.store).await?;
    Ok(HttpResponse::Ok().json(settings))
}

async fn put_settings(
    state: web::Data<AppState>,
    body: web::Json<Settings>,
) -> actix_web::Result<HttpResponse> {
    let settings = body.into_inner();
    settings.validate()?;

    let store = state.store.clone();
    let to_save = settings.clone();
    web::block(move || store.save(&to_save))
        .await?
        .map_err(StoryError::from)?;
    Ok(HttpResponse::Ok().json(settings))
}

async fn generate_story(
    state: web::Data<AppState>,
    body: web::Json<StoryRequestBody>,
) -> actix_web::Result<HttpResponse> {
    let body = body.into_inner();
    let image = decode_base64_image(&body.image)?;

    let request = GenerationRequest {
        image,
        media_type: body.media_type,
        child_name: body.child_name,
        style: body.style,
        length: body.length,
        api_key: body.api_key,
        prompt_template: body.prompt_template,
        model: body.model,
        temperature: body.temperature,
    };

    let settings = load_settings(&state.store).await?;
    let result = state.generator.generate_story(request, &settings).await?;

    Ok(HttpResponse::Ok().json(StoryResponseBody {
        story: result.text,
        usage: result.usage,
        model: result.model,
    }))
}

fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, StoryError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| StoryError::InvalidImage(format!("image is not valid base64: {}", e)))
}
