//! Command-line interface for storygen.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::{config::AppConfig, models::GenerationRequest, models::ImageMediaType};

#[derive(Debug, Parser)]
#[command(name = "storygen")]
#[command(about = "Turns a child's drawing into a short story", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of STORYGEN_SETTINGS_PATH
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (requires the `server` feature)
    Serve {
        /// Port to listen on instead of PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate one story from a drawing on disk
    Generate {
        /// Drawing to describe (.jpg, .jpeg, .png, .bmp or .webp)
        image: PathBuf,

        child_name: String,

        /// fairy-tale, sci-fi, adventure, mystery, comedy or everyday-life
        style: String,

        /// short or long
        length: String,

        /// API key for this story only
        #[arg(long, env = "STORYGEN_REQUEST_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature override (0.0 to 2.0)
        #[arg(short, long)]
        temperature: Option<f32>,
    },
}

impl Cli {
    /// Applies command-line overrides on top of the environment config.
    pub fn apply_to_config(&self, mut config: AppConfig) -> AppConfig {
        if let Some(path) = &self.settings {
            config.settings_path = path.clone();
        }
        if let Command::Serve { port: Some(port) } = self.command {
            config.port = port;
        }
        config
    }
}

/// Media type implied by the drawing's file extension.
pub fn media_type_for(path: &std::path::Path) -> Option<ImageMediaType> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageMediaType::from_extension)
}

/// Builds the request for `generate`; `None` for any other command.
pub fn generation_request(command: &Command, image: Vec<u8>) -> Option<GenerationRequest> {
    let Command::Generate {
        image: path,
        child_name,
        style,
        length,
        api_key,
        model,
        temperature,
    } = command
    else {
        return None;
    };

    let media_type = media_type_for(path).map(|m| m.mime()).unwrap_or_default();
    let mut request =
        GenerationRequest::new(image, media_type, child_name.as_str(), style.as_str(), length.as_str());
    request.api_key = api_key.clone();
    request.model = model.clone();
    request.temperature = *temperature;
    Some(request)
}
