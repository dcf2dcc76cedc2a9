// src/config.rs
//! Service configuration collected once at startup from the environment.
//! Components receive what they need explicitly; nothing reads env vars
//! after boot.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the OpenAI-backed capabilities (story, image, TTS, STT).
    pub openai_api_key: String,
    /// Chat model used for structured story generation.
    pub story_model: String,

    /// Root for per-job working directories.
    pub work_dir: PathBuf,
    /// Root of the publicly served mirror.
    pub public_dir: PathBuf,
    /// Directory for raw uploads awaiting dubbing.
    pub upload_dir: PathBuf,

    /// Hard timeout applied to every upstream HTTP request.
    pub upstream_timeout: Duration,
    /// Maximum simultaneous scene asset generations per job.
    pub scene_concurrency: usize,
    /// Number of scenes requested from the story generator.
    pub default_scene_count: usize,

    /// HTTP bind address.
    pub bind_addr: String,

    /// JWT signing secret.
    pub jwt_secret: String,
    /// Token lifetime in minutes.
    pub token_expiry_minutes: i64,
    /// Single configured user (username, bcrypt hash).
    pub admin_username: String,
    pub admin_password_hash: String,
}

impl Config {
    /// Read configuration from the environment. Missing required values
    /// are an immediate startup failure.
    pub fn from_env() -> Result<Self, String> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| "OPENAI_API_KEY environment variable not set".to_string())?;

        let jwt_secret = std::env::var("SECRET_KEY")
            .map_err(|_| "SECRET_KEY environment variable not set".to_string())?;

        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password_hash = match std::env::var("ADMIN_PASSWORD_HASH") {
            Ok(h) => h,
            Err(_) => {
                // Fall back to hashing a plaintext password at boot.
                let plain = std::env::var("ADMIN_PASSWORD")
                    .map_err(|_| "set ADMIN_PASSWORD_HASH or ADMIN_PASSWORD".to_string())?;
                bcrypt::hash(plain, bcrypt::DEFAULT_COST)
                    .map_err(|e| format!("failed to hash admin password: {}", e))?
            }
        };

        Ok(Self {
            openai_api_key,
            story_model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
            work_dir: env_path("WORK_DIR", "outputs"),
            public_dir: env_path("PUBLIC_DIR", "public"),
            upload_dir: env_path("UPLOAD_DIR", "uploads"),
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT_SECS", 120)),
            scene_concurrency: env_parse("SCENE_CONCURRENCY", 3),
            default_scene_count: env_parse("DEFAULT_SCENE_COUNT", 3),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            jwt_secret,
            token_expiry_minutes: env_parse("TOKEN_EXPIRY_MINUTES", 30),
            admin_username,
            admin_password_hash,
        })
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
