use anyhow::Context;
use async_openai::{config::OpenAIConfig, Client as OpenAiClient};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicedoc_backend::domain::conversion::{
    maintenance, ConversionService, ConversionSettings, ParallelSynthesizer, SynthesisCache,
    SynthesizerSettings, TaskRegistry,
};
use voicedoc_backend::domain::tts::LanguageCode;
use voicedoc_backend::infrastructure::config::{Config, LogFormat, TtsProvider};
use voicedoc_backend::infrastructure::db::{check_connection, create_pool};
use voicedoc_backend::infrastructure::extraction::DocumentTextExtractor;
use voicedoc_backend::infrastructure::http::{build_router, start_http_server};
use voicedoc_backend::infrastructure::repositories::{
    CacheRepository, OpenAiSpeechBackend, PollySpeechBackend, SpeechBackend,
};
use voicedoc_backend::infrastructure::storage::StorageLayout;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting VoiceDoc Backend on {}:{}",
        config.host,
        config.port
    );

    let default_language: LanguageCode = config
        .default_language
        .parse()
        .map_err(|tag| anyhow::anyhow!("Unsupported DEFAULT_LANGUAGE: {}", tag))?;

    // Prepare the data directory
    let storage = StorageLayout::new(config.data_dir.clone());
    storage
        .ensure_dirs()
        .await
        .with_context(|| format!("Failed to create data directories under {}", config.data_dir.display()))?;
    tracing::info!(data_dir = %config.data_dir.display(), "Data directories ready");

    // Open the synthesis cache database
    let pool = create_pool(&storage.database_path())
        .await
        .context("Failed to open the synthesis cache database")?;
    check_connection(&pool)
        .await
        .context("Synthesis cache database is not responding")?;
    tracing::info!("Synthesis cache database ready");

    let backend = create_speech_backend(&config).await?;
    tracing::info!(provider = backend.name(), "Speech backend initialized");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Repositories and caches
    let cache_repo = Arc::new(CacheRepository::new(pool.clone()));
    let synthesis_cache = Arc::new(SynthesisCache::new(cache_repo, config.cache_memo_capacity));
    let registry = Arc::new(TaskRegistry::new());

    // 2. Pipeline services
    let synthesizer = Arc::new(ParallelSynthesizer::new(
        backend,
        synthesis_cache.clone(),
        storage.clone(),
        SynthesizerSettings {
            workers: config.synthesis_workers,
            batch_size: config.synthesis_batch_size,
            similarity_threshold: config.similarity_threshold,
            max_request_chars: config.tts_max_chars,
        },
    ));
    let conversion_service = Arc::new(ConversionService::new(
        registry.clone(),
        Arc::new(DocumentTextExtractor::new()),
        synthesizer,
        storage.clone(),
        ConversionSettings {
            max_upload_bytes: config.max_upload_bytes,
            max_chunk_length: config.max_chunk_length,
            default_language,
        },
    ));

    // 3. Background maintenance
    let shutdown = CancellationToken::new();
    let reaper = maintenance::spawn_task_reaper(
        registry,
        storage.clone(),
        Duration::from_secs(config.reaper_interval_secs),
        Duration::from_secs(config.task_retention_secs),
        shutdown.clone(),
    );
    let janitor = maintenance::spawn_cache_janitor(
        synthesis_cache,
        Duration::from_secs(config.cache_eviction_interval_secs),
        config.cache_max_age_days,
        shutdown.clone(),
    );

    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        ctrl_c_token.cancel();
    });

    // 4. HTTP server
    let app = build_router(&config, &storage, pool, conversion_service);
    let served = start_http_server(config, app, shutdown.clone())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e));

    shutdown.cancel();
    let _ = tokio::join!(reaper, janitor);
    tracing::info!("Shutdown complete");

    served
}

async fn create_speech_backend(config: &Config) -> anyhow::Result<Arc<dyn SpeechBackend>> {
    match config.tts_provider {
        TtsProvider::Polly => {
            tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

            let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
            let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
            if !has_access_key || !has_secret_key {
                tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;
            let polly_client = aws_sdk_polly::Client::new(&aws_config);

            Ok(Arc::new(PollySpeechBackend::new(Arc::new(polly_client))))
        }
        TtsProvider::OpenAi => {
            if config.openai_api_key.is_empty() {
                anyhow::bail!("OPENAI_API_KEY is required when TTS_PROVIDER=openai");
            }
            let client = OpenAiClient::with_config(
                OpenAIConfig::new().with_api_key(config.openai_api_key.clone()),
            );

            Ok(Arc::new(OpenAiSpeechBackend::new(
                Arc::new(client),
                config.openai_tts_model.clone(),
                config.openai_tts_voice.clone(),
            )))
        }
    }
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "voicedoc_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "voicedoc_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
