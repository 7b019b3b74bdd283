//! # Station Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TAGGER_HTTP_PORT=8000                                              │
//! │     TAGGER_DB_PATH=/var/lib/tagger/tagger.db                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     path given on the command line or in TAGGER_CONFIG, else           │
//! │     ~/.config/tagger/tagger.toml (Linux)                               │
//! │     ~/Library/Application Support/com.tagger.station/tagger.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! mobile_url = "http://192.168.0.30:8000/mobile"
//!
//! [http]
//! port = 8000
//!
//! [hub]
//! port = 8765
//!
//! [database]
//! path = "tagger.db"
//!
//! [session]
//! timeout_minutes = 30
//!
//! [lookup]
//! providers = ["opengtindb", "openfoodfacts"]
//! opengtindb_query_id = "400000000"
//!
//! [images]
//! max_side = 800
//! jpeg_quality = 70
//!
//! [rfid]
//! enabled = true
//! device = "/dev/ttyUSB0"
//! baud_rate = 9600
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use tagger_core::validation::clamp_timeout_minutes;
use tagger_core::DEFAULT_SESSION_TIMEOUT_MINUTES;
use tagger_db::images::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SIDE};
use tagger_lookup::LookupConfig;
use tagger_sync::HubConfig;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

// =============================================================================
// Sections
// =============================================================================

fn default_http_port() -> u16 {
    8000
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

/// `[http]`: the page and JSON server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            bind_addr: default_bind_addr(),
            port: default_http_port(),
        }
    }
}

impl HttpSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tagger.db")
}

fn default_max_connections() -> u32 {
    5
}

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// `[paths]`: where pages, assets and photos live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_images_dir")]
    pub images: PathBuf,

    #[serde(default = "default_views_dir")]
    pub views: PathBuf,

    #[serde(default = "default_mobile_views_dir")]
    pub mobile_views: PathBuf,

    #[serde(default = "default_public_dir")]
    pub public: PathBuf,

    /// Served by `/image/{ean}` when a barcode has no photo.
    #[serde(default = "default_placeholder")]
    pub placeholder_image: PathBuf,
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_views_dir() -> PathBuf {
    PathBuf::from("views")
}
fn default_mobile_views_dir() -> PathBuf {
    PathBuf::from("mobile_views")
}
fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_placeholder() -> PathBuf {
    PathBuf::from("images/dummy.png")
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            images: default_images_dir(),
            views: default_views_dir(),
            mobile_views: default_mobile_views_dir(),
            public: default_public_dir(),
            placeholder_image: default_placeholder(),
        }
    }
}

fn default_timeout_minutes() -> u32 {
    DEFAULT_SESSION_TIMEOUT_MINUTES
}

/// `[session]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Initial timeout; clamped to `[0, 480]` on load. 0 never expires.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            timeout_minutes: default_timeout_minutes(),
        }
    }
}

fn default_max_side() -> u32 {
    DEFAULT_MAX_SIDE
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

/// `[images]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "default_max_side")]
    pub max_side: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        ImageSettings {
            max_side: default_max_side(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_rfid_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_retry_secs() -> u64 {
    3
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    1000
}

/// `[rfid]`: serial RFID reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfidSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_rfid_device")]
    pub device: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long one read blocks before the monitor polls again.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Delay before reopening the device after an error.
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
}

impl Default for RfidSettings {
    fn default() -> Self {
        RfidSettings {
            enabled: true,
            device: default_rfid_device(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            retry_secs: default_retry_secs(),
        }
    }
}

fn default_mobile_url() -> String {
    "http://192.168.0.30:8000/mobile".to_string()
}

// =============================================================================
// Main Station Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// URL encoded in the `/qr` image; phones open it to reach the mobile page.
    #[serde(default = "default_mobile_url")]
    pub mobile_url: String,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub images: ImageSettings,

    #[serde(default)]
    pub rfid: RfidSettings,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            mobile_url: default_mobile_url(),
            http: HttpSettings::default(),
            hub: HubConfig::default(),
            database: DatabaseSettings::default(),
            paths: PathSettings::default(),
            session: SessionSettings::default(),
            lookup: LookupConfig::default(),
            images: ImageSettings::default(),
            rfid: RfidSettings::default(),
        }
    }
}

impl StationConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tagger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let explicit = config_path.or_else(|| std::env::var("TAGGER_CONFIG").ok().map(PathBuf::from));
        if let Some(path) = explicit.clone().or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading station config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else if explicit.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "config file not found: {}",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.session.timeout_minutes = clamp_timeout_minutes(config.session.timeout_minutes as i64);
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load station config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let mobile_url = self.mobile_url.trim();
        if mobile_url.is_empty() {
            return Err(ConfigError::Invalid("mobile_url must not be empty".into()));
        }
        match url::Url::parse(mobile_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid(format!(
                    "mobile_url must be http(s), got scheme '{}'",
                    url.scheme()
                )))
            }
            Err(e) => {
                return Err(ConfigError::Invalid(format!("mobile_url is not a URL: {}", e)));
            }
        }

        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http.port must be greater than 0".into()));
        }
        if self.hub.port == 0 {
            return Err(ConfigError::Invalid("hub.port must be greater than 0".into()));
        }

        if self.images.max_side == 0 {
            return Err(ConfigError::Invalid("images.max_side must be greater than 0".into()));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "images.jpeg_quality must be within 1..=100, got {}",
                self.images.jpeg_quality
            )));
        }

        if self.rfid.enabled && self.rfid.baud_rate == 0 {
            return Err(ConfigError::Invalid("rfid.baud_rate must be greater than 0".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("TAGGER_HTTP_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding HTTP port from environment");
                self.http.port = p;
            }
        }

        if let Ok(port) = std::env::var("TAGGER_HUB_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding hub port from environment");
                self.hub.port = p;
            }
        }

        if let Ok(path) = std::env::var("TAGGER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("TAGGER_MOBILE_URL") {
            self.mobile_url = url;
        }

        if let Ok(minutes) = std::env::var("TAGGER_SESSION_TIMEOUT") {
            if let Ok(m) = minutes.trim().parse::<i64>() {
                self.session.timeout_minutes = clamp_timeout_minutes(m);
            }
        }

        if let Ok(device) = std::env::var("TAGGER_RFID_DEVICE") {
            self.rfid.device = device;
        }

        if let Ok(baud) = std::env::var("TAGGER_RFID_BAUD") {
            match baud.trim().parse::<u32>() {
                Ok(baud) if baud > 0 => self.rfid.baud_rate = baud,
                _ => warn!(value = %baud, "Invalid TAGGER_RFID_BAUD value"),
            }
        }

        if let Ok(enabled) = std::env::var("TAGGER_RFID_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.rfid.enabled = true,
                "0" | "false" | "no" => self.rfid.enabled = false,
                _ => warn!(value = %enabled, "Unknown TAGGER_RFID_ENABLED value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tagger", "station")
            .map(|dirs| dirs.config_dir().join("tagger.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StationConfig::default();
        assert_eq!(config.http.port, 8000);
        assert_eq!(config.hub.port, 8765);
        assert_eq!(config.hub.max_message_size, None);
        assert_eq!(config.session.timeout_minutes, 30);
        assert_eq!(config.images.max_side, 800);
        assert_eq!(config.images.jpeg_quality, 70);
        assert_eq!(config.rfid.device, "/dev/ttyUSB0");
        assert_eq!(config.rfid.baud_rate, 9600);
        assert_eq!(config.rfid.read_timeout_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = StationConfig::default();

        config.mobile_url = "  ".into();
        assert!(config.validate().is_err());

        config.mobile_url = "ftp://host/mobile".into();
        assert!(config.validate().is_err());

        config.mobile_url = "https://station.local/mobile".into();
        assert!(config.validate().is_ok());

        config.images.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.images.jpeg_quality = 85;

        config.images.max_side = 0;
        assert!(config.validate().is_err());
        config.images.max_side = 1024;

        config.rfid.baud_rate = 0;
        assert!(config.validate().is_err());
        config.rfid.enabled = false;
        assert!(config.validate().is_ok());
        config.rfid = RfidSettings::default();

        config.http.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: StationConfig = toml::from_str(
            r#"
            mobile_url = "http://10.0.0.5:8000/mobile"

            [hub]
            port = 9001
            max_message_size = 1048576

            [lookup]
            providers = ["openfoodfacts"]

            [rfid]
            device = "/dev/ttyACM0"
            baud_rate = 115200
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.port, 9001);
        assert_eq!(config.hub.bind_addr, "0.0.0.0");
        assert_eq!(config.hub.max_message_size, Some(1_048_576));
        assert_eq!(config.lookup.providers, vec!["openfoodfacts"]);
        assert_eq!(config.lookup.timeout_secs, 5);
        assert_eq!(config.http.port, 8000);
        assert_eq!(config.rfid.device, "/dev/ttyACM0");
        assert_eq!(config.rfid.baud_rate, 115_200);
        assert_eq!(config.rfid.read_timeout_ms, 1000);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = StationConfig::load(Some(dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagger.toml");
        std::fs::write(&path, "[session]\ntimeout_minutes = 9999\n").unwrap();

        let config = StationConfig::load(Some(path)).unwrap();
        assert_eq!(config.session.timeout_minutes, 480);
    }
}
