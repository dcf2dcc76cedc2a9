use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

mod assemble;
mod auth;
mod config;
mod dubbing;
mod error;
mod handlers;
mod media;
mod openai_client;
mod pipeline;
mod scenes;
mod store;
mod story;
mod translate_client;
mod upstream;

use assemble::VideoAssembler;
use dubbing::DubbingPipeline;
use media::{FfmpegToolkit, MediaToolkit};
use openai_client::OpenAiClient;
use pipeline::PipelineOrchestrator;
use scenes::SceneAssetGenerator;
use store::AssetStore;
use story::StoryGenerator;
use translate_client::GoogleTranslateClient;
use upstream::{ImageSynthesis, SpeechSynthesis, Translation};

pub struct AppState {
    pub config: config::Config,
    pub orchestrator: PipelineOrchestrator,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    let config = config::Config::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Ensure the working, public, and upload directories exist up front.
    for dir in [&config.work_dir, &config.public_dir, &config.upload_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!("Failed to create directory {}: {}", dir.display(), e);
        }
    }

    if let Err(e) = FfmpegToolkit::check_available() {
        tracing::warn!("{}; media stages will fail until ffmpeg is installed", e);
    }

    let openai = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.story_model.clone(),
        config.upstream_timeout,
    ));
    let translator: Arc<dyn Translation> =
        Arc::new(GoogleTranslateClient::new(config.upstream_timeout));
    let toolkit: Arc<dyn MediaToolkit> = Arc::new(FfmpegToolkit::new());

    let images: Arc<dyn ImageSynthesis> = openai.clone();
    let speech: Arc<dyn SpeechSynthesis> = openai.clone();

    let store = AssetStore::new(config.work_dir.clone(), config.public_dir.clone());
    let orchestrator = PipelineOrchestrator::new(
        store,
        StoryGenerator::new(openai.clone()),
        SceneAssetGenerator::new(
            images.clone(),
            speech.clone(),
            translator.clone(),
            config.scene_concurrency,
        ),
        VideoAssembler::new(toolkit.clone()),
        DubbingPipeline::new(openai.clone(), translator, speech, toolkit),
        images,
        config.default_scene_count,
    );

    let public_dir = config.public_dir.clone();
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        config,
        orchestrator,
    });

    // Published artifacts are served directly from the public mirror.
    let app = handlers::routes(state)
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind address");
    tracing::info!("storyreel listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,storyreel=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,storyreel=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
