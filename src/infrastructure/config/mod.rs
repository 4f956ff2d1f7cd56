use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Storage
    pub data_dir: PathBuf,
    pub max_upload_bytes: u64,
    // Speech backend
    pub tts_provider: TtsProvider,
    pub tts_max_chars: usize,
    pub aws_region: String,
    pub openai_api_key: String,
    pub openai_tts_model: String,
    pub openai_tts_voice: String,
    pub default_language: String,
    // Conversion pipeline
    pub max_chunk_length: usize,
    pub synthesis_workers: usize,
    pub synthesis_batch_size: usize,
    pub similarity_threshold: f64,
    pub cache_memo_capacity: u64,
    // Maintenance
    pub cache_max_age_days: u32,
    pub cache_eviction_interval_secs: u64,
    pub task_retention_secs: u64,
    pub reaper_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Polly,
    OpenAi,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            environment: match env_or("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match env_or("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            data_dir: PathBuf::from(env_or("DATA_DIR", "./data")),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", "52428800").parse()?,
            tts_provider: match env_or("TTS_PROVIDER", "polly").to_lowercase().as_str() {
                "openai" => TtsProvider::OpenAi,
                "polly" => TtsProvider::Polly,
                other => return Err(format!("Unknown TTS_PROVIDER: {}", other).into()),
            },
            tts_max_chars: env_or("TTS_MAX_CHARS", "5000").parse()?,
            aws_region: env_or("AWS_REGION", "eu-west-1"),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_tts_model: env_or("OPENAI_TTS_MODEL", "tts-1"),
            openai_tts_voice: env::var("OPENAI_TTS_VOICE").unwrap_or_default(),
            default_language: env_or("DEFAULT_LANGUAGE", "es"),
            max_chunk_length: env_or("MAX_CHUNK_LENGTH", "3000").parse()?,
            synthesis_workers: env_or("SYNTHESIS_WORKERS", "4").parse()?,
            synthesis_batch_size: env_or("SYNTHESIS_BATCH_SIZE", "8").parse()?,
            similarity_threshold: env_or("SIMILARITY_THRESHOLD", "0.9").parse()?,
            cache_memo_capacity: env_or("CACHE_MEMO_CAPACITY", "1000").parse()?,
            cache_max_age_days: env_or("CACHE_MAX_AGE_DAYS", "7").parse()?,
            cache_eviction_interval_secs: env_or("CACHE_EVICTION_INTERVAL_SECS", "86400").parse()?,
            task_retention_secs: env_or("TASK_RETENTION_SECS", "3600").parse()?,
            reaper_interval_secs: env_or("REAPER_INTERVAL_SECS", "300").parse()?,
        };

        for (key, value) in [
            ("MAX_CHUNK_LENGTH", config.max_chunk_length as u64),
            ("TTS_MAX_CHARS", config.tts_max_chars as u64),
            ("SYNTHESIS_WORKERS", config.synthesis_workers as u64),
            ("SYNTHESIS_BATCH_SIZE", config.synthesis_batch_size as u64),
            ("REAPER_INTERVAL_SECS", config.reaper_interval_secs),
            ("CACHE_EVICTION_INTERVAL_SECS", config.cache_eviction_interval_secs),
        ] {
            if value == 0 {
                return Err(format!("{} must be greater than zero", key).into());
            }
        }
        if !(0.0..=1.0).contains(&config.similarity_threshold) {
            return Err("SIMILARITY_THRESHOLD must be between 0 and 1".into());
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
