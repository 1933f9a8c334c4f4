/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `APP_NAME`, `APP_ENV`, `APP_TZ`, `APP_VERSIONING`: service identity
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `API_CORS_ORIGINS`: comma list, `*` for permissive CORS
/// - `API_PRODUCTION`: enables HSTS
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `JWT_SECRET`: Secret key for JWT signing (required, 32+ characters)
/// - `JWT_*_EXPIRATION_SECONDS`, `USER_*`: token and account lifetimes
/// - `MESSAGE_LANGUAGE` / `MESSAGE_AVAILABLE_LANGUAGES`: localization
/// - `FILE_*`: upload limits and storage directory
/// - `HEALTH_*`: health indicator thresholds
///
/// # Example
///
/// ```no_run
/// use tenantry_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tenantry_shared::file::parse_size;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub user: UserConfig,
    pub message: MessageConfig,
    pub file: FileConfig,
    pub health: HealthConfig,
}

/// Service identity, echoed in response metadata
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Used as `serviceName` in the hello message
    pub name: String,
    pub env: String,
    /// Reported as `_metadata.timezone`
    pub timezone: String,
    /// Reported as `_metadata.version`
    pub versioning: String,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed origins; `*` means any
    pub cors_origins: Vec<String>,

    /// Production mode (sends HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
    pub issuer: String,
    pub access_expiration_seconds: i64,
    pub refresh_expiration_seconds: i64,
}

/// Account lifetimes
#[derive(Debug, Clone)]
pub struct UserConfig {
    pub active_key_expiration_hours: i64,
    pub password_expiration_days: i64,
}

#[derive(Debug, Clone)]
pub struct MessageConfig {
    /// Default language
    pub language: String,
    pub available_languages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FileConfig {
    pub upload_dir: PathBuf,
    /// Bytes per file
    pub max_size: u64,
    pub max_files: usize,
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub disk_path: PathBuf,
    /// Highest accepted used/size ratio
    pub disk_threshold: f64,
    /// Bytes
    pub memory_heap_threshold: u64,
    /// Bytes
    pub memory_rss_threshold: u64,
    pub object_storage_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first when present.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    ///
    /// Tests pass a map here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let max_size = parse_size(&var("FILE_MAX_SIZE", "10mb"))?;
        let memory_heap_threshold = parse_size(&var("HEALTH_MEMORY_HEAP_THRESHOLD", "300mb"))?;
        let memory_rss_threshold = parse_size(&var("HEALTH_MEMORY_RSS_THRESHOLD", "300mb"))?;

        Ok(Self {
            app: AppConfig {
                name: var("APP_NAME", "tenantry"),
                env: var("APP_ENV", "development"),
                timezone: var("APP_TZ", "UTC"),
                versioning: var("APP_VERSIONING", "1"),
            },
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: parse("API_PORT", &var("API_PORT", "8080"))?,
                cors_origins: split_list(&var("API_CORS_ORIGINS", "*")),
                production: parse("API_PRODUCTION", &var("API_PRODUCTION", "false"))?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse(
                    "DATABASE_MAX_CONNECTIONS",
                    &var("DATABASE_MAX_CONNECTIONS", "10"),
                )?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                issuer: var("JWT_ISSUER", "tenantry"),
                access_expiration_seconds: parse(
                    "JWT_ACCESS_EXPIRATION_SECONDS",
                    &var("JWT_ACCESS_EXPIRATION_SECONDS", "3600"),
                )?,
                refresh_expiration_seconds: parse(
                    "JWT_REFRESH_EXPIRATION_SECONDS",
                    &var("JWT_REFRESH_EXPIRATION_SECONDS", "1209600"),
                )?,
            },
            user: UserConfig {
                active_key_expiration_hours: parse(
                    "USER_ACTIVE_KEY_EXPIRATION_HOURS",
                    &var("USER_ACTIVE_KEY_EXPIRATION_HOURS", "72"),
                )?,
                password_expiration_days: parse(
                    "USER_PASSWORD_EXPIRATION_DAYS",
                    &var("USER_PASSWORD_EXPIRATION_DAYS", "182"),
                )?,
            },
            message: MessageConfig {
                language: var("MESSAGE_LANGUAGE", "en"),
                available_languages: split_list(&var("MESSAGE_AVAILABLE_LANGUAGES", "en,id")),
            },
            file: FileConfig {
                upload_dir: PathBuf::from(var("FILE_UPLOAD_DIR", "./uploads")),
                max_size,
                max_files: parse("FILE_MAX_FILES", &var("FILE_MAX_FILES", "3"))?,
            },
            health: HealthConfig {
                disk_path: PathBuf::from(var("HEALTH_DISK_PATH", "/")),
                disk_threshold: parse("HEALTH_DISK_THRESHOLD", &var("HEALTH_DISK_THRESHOLD", "0.75"))?,
                memory_heap_threshold,
                memory_rss_threshold,
                object_storage_url: lookup("HEALTH_OBJECT_STORAGE_URL")
                    .filter(|url| !url.trim().is_empty()),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{key} has an invalid value {raw:?}: {e}"))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
