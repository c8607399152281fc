use clap::Parser;

use storygen::{
    cli::{self, Cli, Command},
    logger, AppConfig, SettingsStore, StoryGenerator,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(logger::LoggerConfig::development())?;
    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("No .env file found, using system environment variables");
    }

    let config = cli.apply_to_config(AppConfig::from_env());
    logger::log_config_info(&config);

    match &cli.command {
        Command::Serve { .. } => serve(config).await,
        Command::Generate { image, .. } => {
            let bytes = tokio::fs::read(image).await?;
            let request = cli::generation_request(&cli.command, bytes)
                .ok_or("generate command without a request")?;
            generate_once(&config, request).await
        }
    }
}

#[cfg(feature = "server")]
async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), config.port);
    storygen::server::run(config).await?;
    Ok(())
}

#[cfg(not(feature = "server"))]
async fn serve(_config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    Err("this build has no HTTP server; rebuild with `--features server`".into())
}

async fn generate_once(
    config: &AppConfig,
    request: storygen::GenerationRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SettingsStore::new(&config.settings_path).load();
    let generator = StoryGenerator::from_config(config);

    let result = generator.generate_story(request, &settings).await?;

    println!("{}\n", result.text);
    log::info!(
        "📊 {} tokens used ({} prompt, {} output) by {}",
        result.usage.total_units,
        result.usage.prompt_units,
        result.usage.output_units,
        result.model
    );
    Ok(())
}
