//! Configuration management for TuneBridge.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (every tunable has one; credentials do not)

use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use thiserror::Error;

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3001";
pub const DEFAULT_YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives under `tunebridge/.env` in the platform-specific local data
/// directory:
/// - Linux: `~/.local/share/tunebridge/.env`
/// - macOS: `~/Library/Application Support/tunebridge/.env`
/// - Windows: `%LOCALAPPDATA%/tunebridge/.env`
///
/// A missing file is not an error; the process environment is used as is.
///
/// # Errors
///
/// Returns an error string if the directory cannot be created or the file
/// exists but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Returns the application's directory in the local data dir.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("tunebridge");
    path
}

/// Where shared playlists are stored by the conversion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Limits and costs of the YouTube Data API quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    pub daily_unit_limit: u64,
    pub max_searches_per_session: u64,
    pub cost_per_search: u64,
    /// Timezone whose midnight starts a new quota day.
    pub reset_timezone: Tz,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            daily_unit_limit: 10_000,
            max_searches_per_session: 90,
            cost_per_search: 100,
            reset_timezone: chrono_tz::America::Los_Angeles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub window: Duration,
    pub convert_max: u32,
    pub fetch_max: u32,
    pub general_max: u32,
    pub shared_max: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            convert_max: 10,
            fetch_max: 20,
            general_max: 100,
            shared_max: 100,
        }
    }
}

/// Typed view over every configuration value the application reads.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_address: String,
    pub youtube_api_key: Option<String>,
    pub youtube_api_url: String,
    pub quota: QuotaLimits,
    pub max_results: u32,
    pub throttle_delay: Duration,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_api_url: String,
    pub spotify_token_url: String,
    pub storage: StorageBackend,
    pub playlist_ttl: Duration,
    pub rate_limits: RateLimitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            youtube_api_key: None,
            youtube_api_url: DEFAULT_YOUTUBE_API_URL.to_string(),
            quota: QuotaLimits::default(),
            max_results: 5,
            throttle_delay: Duration::from_millis(50),
            cache_ttl: Duration::from_secs(86_400),
            http_timeout: Duration::from_secs(10),
            spotify_client_id: None,
            spotify_client_secret: None,
            spotify_api_url: DEFAULT_SPOTIFY_API_URL.to_string(),
            spotify_token_url: DEFAULT_SPOTIFY_TOKEN_URL.to_string(),
            storage: StorageBackend::Memory,
            playlist_ttl: Duration::from_secs(7 * 86_400),
            rate_limits: RateLimitSettings::default(),
        }
    }
}

impl Settings {
    /// Builds settings from the process environment, falling back to defaults
    /// for every tunable that is not set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but cannot be parsed.
    /// Missing credentials are not an error here; see [`Settings::require_credentials`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let quota = QuotaLimits {
            daily_unit_limit: env_parse(
                "YOUTUBE_DAILY_QUOTA_LIMIT",
                defaults.quota.daily_unit_limit,
            )?,
            max_searches_per_session: env_parse(
                "YOUTUBE_MAX_SEARCHES_PER_SESSION",
                defaults.quota.max_searches_per_session,
            )?,
            cost_per_search: env_parse("YOUTUBE_COST_PER_SEARCH", defaults.quota.cost_per_search)?,
            reset_timezone: env_parse("YOUTUBE_QUOTA_TIMEZONE", defaults.quota.reset_timezone)?,
        };
        if quota.cost_per_search == 0 {
            return Err(ConfigError::Invalid {
                name: "YOUTUBE_COST_PER_SEARCH",
                value: "0".to_string(),
            });
        }

        let rate_limits = RateLimitSettings {
            window: Duration::from_secs(env_parse(
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limits.window.as_secs(),
            )?),
            convert_max: env_parse("RATE_LIMIT_CONVERT_MAX", defaults.rate_limits.convert_max)?,
            fetch_max: env_parse("RATE_LIMIT_FETCH_MAX", defaults.rate_limits.fetch_max)?,
            general_max: env_parse("RATE_LIMIT_GENERAL_MAX", defaults.rate_limits.general_max)?,
            shared_max: env_parse("RATE_LIMIT_SHARED_MAX", defaults.rate_limits.shared_max)?,
        };

        Ok(Self {
            server_address: env_or("SERVER_ADDRESS", &defaults.server_address),
            youtube_api_key: env_opt("YOUTUBE_API_KEY"),
            youtube_api_url: env_or("YOUTUBE_API_URL", &defaults.youtube_api_url),
            quota,
            max_results: env_parse("YOUTUBE_MAX_RESULTS", defaults.max_results)?,
            throttle_delay: Duration::from_millis(env_parse(
                "YOUTUBE_THROTTLE_DELAY_MS",
                defaults.throttle_delay.as_millis() as u64,
            )?),
            cache_ttl: Duration::from_secs(env_parse(
                "SEARCH_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            http_timeout: Duration::from_secs(env_parse(
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            spotify_client_id: env_opt("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: env_opt("SPOTIFY_CLIENT_SECRET"),
            spotify_api_url: env_or("SPOTIFY_API_URL", &defaults.spotify_api_url),
            spotify_token_url: env_or("SPOTIFY_API_TOKEN_URL", &defaults.spotify_token_url),
            storage: env_parse("PLAYLIST_STORAGE", defaults.storage)?,
            playlist_ttl: Duration::from_secs(env_parse(
                "PLAYLIST_TTL_SECS",
                defaults.playlist_ttl.as_secs(),
            )?),
            rate_limits,
        })
    }

    /// Checks that every upstream credential is present.
    ///
    /// Credentials are only checked once at startup; a server running without
    /// them would fail every request.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        if self.youtube_api_key.is_none() {
            return Err(ConfigError::Missing("YOUTUBE_API_KEY"));
        }
        self.spotify_credentials()?;
        Ok(())
    }

    /// Returns the Spotify client id and secret.
    pub fn spotify_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let id = self
            .spotify_client_id
            .as_deref()
            .ok_or(ConfigError::Missing("SPOTIFY_CLIENT_ID"))?;
        let secret = self
            .spotify_client_secret
            .as_deref()
            .ok_or(ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?;
        Ok((id, secret))
    }

    /// Parses the configured bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        SocketAddr::from_str(&self.server_address).map_err(|_| ConfigError::Invalid {
            name: "SERVER_ADDRESS",
            value: self.server_address.clone(),
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env_opt(name) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
