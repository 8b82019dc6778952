//! Configuration management for Newsdesk services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder shipped in sample configuration files in place of a real key
pub const API_KEY_PLACEHOLDER: &str = "YOUR_NEWS_API_KEY_HERE";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Application behavior
    #[serde(default)]
    pub app: ApplicationConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Upstream news provider configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Page windowing limits
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Anonymous session and identity lookup
    #[serde(default)]
    pub session: SessionConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Usage and search logging
    #[serde(default)]
    pub activity: ActivityConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration (advisory, not enforced)
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// Display name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Expose internal failure details in error envelopes
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL; without one preferences and activity stay in memory
    pub url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Create missing tables on boot
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// News provider API key; absent or placeholder selects the mock dataset
    pub api_key: Option<String>,

    /// Provider base URL, including the trailing slash
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,

    /// Headline request timeout in seconds
    #[serde(default = "default_headline_timeout")]
    pub headline_timeout_secs: u64,

    /// Search request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// Country passed to the headline endpoint
    #[serde(default = "default_country")]
    pub country: String,

    /// Language used when the caller does not pick one
    #[serde(default = "default_language")]
    pub language: String,

    /// User agent sent with every upstream request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Cookie carrying the anonymous session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Lifetime of anonymous session data in seconds
    #[serde(default = "default_session_lifetime")]
    pub lifetime_secs: u64,

    /// Header supplied by the fronting identity provider
    #[serde(default = "default_user_header")]
    pub user_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// `*` or a comma separated origin list
    #[serde(default = "default_cors_origin")]
    pub allow_origin: String,

    #[serde(default = "default_cors_methods")]
    pub allow_methods: String,

    #[serde(default = "default_cors_headers")]
    pub allow_headers: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivityConfig {
    /// How far back a search-history row may be to receive its result count
    #[serde(default = "default_search_update_window")]
    pub search_update_window_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per hour
    #[serde(default = "default_rate_limit")]
    pub requests_per_hour: u32,

    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_app_name() -> String { "News Aggregator".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_auto_migrate() -> bool { true }
fn default_upstream_base_url() -> String { "https://newsapi.org/v2/".to_string() }
fn default_headline_timeout() -> u64 { 10 }
fn default_search_timeout() -> u64 { 15 }
fn default_country() -> String { "us".to_string() }
fn default_language() -> String { "en".to_string() }
fn default_user_agent() -> String { format!("Newsdesk/{}", crate::VERSION) }
fn default_page_size() -> u32 { crate::DEFAULT_PAGE_SIZE }
fn default_max_page_size() -> u32 { crate::MAX_PAGE_SIZE }
fn default_cookie_name() -> String { "news_aggregator_session".to_string() }
fn default_session_lifetime() -> u64 { 3600 }
fn default_user_header() -> String { "X-User-Id".to_string() }
fn default_enabled() -> bool { true }
fn default_cors_origin() -> String { "*".to_string() }
fn default_cors_methods() -> String { "GET, POST, PUT, DELETE, OPTIONS".to_string() }
fn default_cors_headers() -> String { "Content-Type, Authorization, X-Requested-With".to_string() }
fn default_search_update_window() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "newsdesk".to_string() }
fn default_rate_limit() -> u32 { 100 }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__UPSTREAM__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl UpstreamConfig {
    /// The configured key, if it is usable against the real provider
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != API_KEY_PLACEHOLDER)
    }

    pub fn headline_timeout(&self) -> Duration {
        Duration::from_secs(self.headline_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

impl SessionConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }
}

impl ActivityConfig {
    pub fn search_update_window(&self) -> Duration {
        Duration::from_secs(self.search_update_window_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            debug: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            auto_migrate: default_auto_migrate(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_upstream_base_url(),
            headline_timeout_secs: default_headline_timeout(),
            search_timeout_secs: default_search_timeout(),
            country: default_country(),
            language: default_language(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            lifetime_secs: default_session_lifetime(),
            user_header: default_user_header(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            allow_origin: default_cors_origin(),
            allow_methods: default_cors_methods(),
            allow_headers: default_cors_headers(),
        }
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            search_update_window_secs: default_search_update_window(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: default_rate_limit(),
            enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.pagination.max_page_size, 100);
        assert_eq!(config.upstream.headline_timeout(), Duration::from_secs(10));
        assert_eq!(config.upstream.search_timeout(), Duration::from_secs(15));
        assert!(!config.app.debug);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_placeholder_key_is_not_a_credential() {
        let mut upstream = UpstreamConfig::default();
        assert_eq!(upstream.credential(), None);

        upstream.api_key = Some(API_KEY_PLACEHOLDER.to_string());
        assert_eq!(upstream.credential(), None);

        upstream.api_key = Some("   ".to_string());
        assert_eq!(upstream.credential(), None);

        upstream.api_key = Some("abc123".to_string());
        assert_eq!(upstream.credential(), Some("abc123"));
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("app.debug", true)
            .unwrap()
            .set_override("upstream.country", "gb")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.app.debug);
        assert_eq!(config.upstream.country, "gb");
        assert_eq!(config.upstream.language, "en");
        assert_eq!(config.session.cookie_name, "news_aggregator_session");
    }
}
