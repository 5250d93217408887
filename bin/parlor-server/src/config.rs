//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for parlor-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set (the completion API key being the
/// one thing a real deployment must provide).
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// SQLite (or other) database URL (default: `"sqlite://parlor.db"`).
    /// Supports any sqlx-compatible connection string.
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, also write daily-rolling log files into this directory.
    pub log_dir: Option<String>,

    /// Comma-separated list of allowed CORS origins; unset means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui` (default: `true`).
    pub enable_swagger: bool,

    /// Directory where uploaded images are stored (default: `"./uploads"`).
    pub upload_dir: String,

    /// Public base URL used to build upload links returned to clients
    /// (default: `"http://127.0.0.1:3000"`).
    pub public_base_url: String,

    /// Base URL of the OpenAI-compatible completion API
    /// (default: `"https://api.openai.com/v1"`).
    pub completion_base_url: String,

    /// API key for the completion service; read from `PARLOR_OPENAI_API_KEY`
    /// with `OPENAI_API_KEY` as fallback.
    pub completion_api_key: Option<String>,

    /// Chat model identifier (default: `"gpt-4o"`).
    pub chat_model: String,

    /// Generated image size (default: `"512x512"`).
    pub image_size: String,

    /// Timeout in seconds for completion-service requests (default: `120`).
    pub upstream_timeout_secs: u64,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("PARLOR_BIND", "0.0.0.0:3000"),
            database_url: env_or("PARLOR_DATABASE_URL", "sqlite://parlor.db"),
            log_level: env_or("PARLOR_LOG", "info"),
            log_json: env_flag("PARLOR_LOG_JSON", false),
            log_dir: std::env::var("PARLOR_LOG_DIR").ok(),
            cors_allowed_origins: std::env::var("PARLOR_CORS_ORIGINS").ok(),
            enable_swagger: env_flag("PARLOR_ENABLE_SWAGGER", true),
            upload_dir: env_or("PARLOR_UPLOAD_DIR", "./uploads"),
            public_base_url: env_or("PARLOR_PUBLIC_BASE_URL", "http://127.0.0.1:3000"),
            completion_base_url: env_or("PARLOR_OPENAI_BASE_URL", "https://api.openai.com/v1"),
            completion_api_key: std::env::var("PARLOR_OPENAI_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            chat_model: env_or("PARLOR_CHAT_MODEL", "gpt-4o"),
            image_size: env_or("PARLOR_IMAGE_SIZE", "512x512"),
            upstream_timeout_secs: parse_env("PARLOR_UPSTREAM_TIMEOUT_SECS", 120),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
