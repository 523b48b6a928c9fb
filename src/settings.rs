use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use std::{env, fmt, str::FromStr, time::Duration};
use url::Url;

use crate::constants::{DEFAULT_PHOTOS_PER_PAGE, FLICKR_MAX_PER_PAGE};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_max_db_connections")]
    pub max_db_connections: u32,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default)]
    pub flickr_api_key: String,

    #[serde(default = "default_flickr_base_url")]
    pub flickr_base_url: String,

    #[serde(default = "default_photos_per_page")]
    pub photos_per_page: u32,

    #[serde(default = "default_half_extent")]
    pub search_half_width: f64,

    #[serde(default = "default_half_extent")]
    pub search_half_height: f64,

    #[serde(default = "default_true")]
    pub safe_search: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_prefetch_concurrency")]
    pub prefetch_concurrency: usize,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Virtual-Tourist".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_database_url() -> String {
    "sqlite://virtual_tourist.db".to_string()
}
fn default_max_db_connections() -> u32 {
    5
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}
fn default_flickr_base_url() -> String {
    "https://api.flickr.com/services/rest".to_string()
}
fn default_photos_per_page() -> u32 {
    DEFAULT_PHOTOS_PER_PAGE
}
fn default_half_extent() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    15
}
fn default_prefetch_concurrency() -> usize {
    4
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins")
                    .ignore_empty(true)
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;
        config.flickr_api_key = fill_or_env(config.flickr_api_key, "APP_FLICKR_API_KEY")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url.trim().is_empty() {
            errors.push("DATABASE_URL cannot be empty".to_string());
        }
        if self.flickr_api_key.trim().is_empty() {
            errors.push("FLICKR_API_KEY cannot be empty".to_string());
        }
        if Url::parse(&self.flickr_base_url).is_err() {
            errors.push(format!("FLICKR_BASE_URL is not a valid URL: {}", self.flickr_base_url));
        }
        if !(1..=FLICKR_MAX_PER_PAGE).contains(&self.photos_per_page) {
            errors.push(format!("PHOTOS_PER_PAGE must be between 1 and {}", FLICKR_MAX_PER_PAGE));
        }
        if !is_positive_extent(self.search_half_width) {
            errors.push("SEARCH_HALF_WIDTH must be a positive number".to_string());
        }
        if !is_positive_extent(self.search_half_height) {
            errors.push("SEARCH_HALF_HEIGHT must be a positive number".to_string());
        }
        if self.request_timeout_secs == 0 {
            errors.push("REQUEST_TIMEOUT_SECS must be at least 1".to_string());
        }
        if self.prefetch_concurrency == 0 {
            errors.push("PREFETCH_CONCURRENCY must be at least 1".to_string());
        }
        if self.max_db_connections == 0 {
            errors.push("MAX_DB_CONNECTIONS must be at least 1".to_string());
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn is_positive_extent(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn fill_or_env(current: String, env_key: &str) -> Result<String, ConfigError> {
    if current.trim().is_empty() {
        env::var(env_key).map_err(|_| ConfigError::Message(format!("{env_key} must be set")))
    } else {
        Ok(current)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for str {
    fn redact(&self) -> &str {
        if self.is_empty() {
            "[MISSING]"
        } else {
            "[REDACTED]"
        }
    }
}

impl Redact for String {
    fn redact(&self) -> &str {
        self.as_str().redact()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("database_url", &self.database_url)
            .field("max_db_connections", &self.max_db_connections)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("log_format", &self.log_format)
            .field("flickr_api_key", &self.flickr_api_key.redact())
            .field("flickr_base_url", &self.flickr_base_url)
            .field("photos_per_page", &self.photos_per_page)
            .field("search_half_width", &self.search_half_width)
            .field("search_half_height", &self.search_half_height)
            .field("safe_search", &self.safe_search)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("prefetch_concurrency", &self.prefetch_concurrency)
            .finish()
    }
}

/// Everything the Flickr client needs, split out of [`AppConfig`].
#[derive(Clone)]
pub struct FlickrSettings {
    pub api_key: String,
    pub base_url: String,
    pub half_width: f64,
    pub half_height: f64,
    pub safe_search: bool,
    pub timeout: Duration,
}

impl From<&AppConfig> for FlickrSettings {
    fn from(config: &AppConfig) -> Self {
        FlickrSettings {
            api_key: config.flickr_api_key.clone(),
            base_url: config.flickr_base_url.clone(),
            half_width: config.search_half_width,
            half_height: config.search_half_height,
            safe_search: config.safe_search,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl fmt::Debug for FlickrSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlickrSettings")
            .field("api_key", &self.api_key.redact())
            .field("base_url", &self.base_url)
            .field("half_width", &self.half_width)
            .field("half_height", &self.half_height)
            .field("safe_search", &self.safe_search)
            .field("timeout", &self.timeout)
            .finish()
    }
}
