use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::key::Credential;
use crate::probe::{ProbeRequest, DEFAULT_ACCEPT, DEFAULT_USER_AGENT};

/// RGB color represented as a 3-element array.
pub type Rgb = [u8; 3];

/// Remote endpoints used by the probe.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Returns the caller's public IPv4 address as a bare string
    pub ip_url: String,
    /// Search API URL; the key is appended as a query parameter
    pub search_url: String,
    /// Query parameter carrying the key
    pub key_param: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            ip_url: "http://axelstudios.com/ip.php".to_string(),
            search_url: "http://bcl.nrel.gov/api/search/?api_version=1.1&show_rows=0".to_string(),
            key_param: "oauth_consumer_key".to_string(),
        }
    }
}

/// Headers sent with every request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    pub accept: String,
    /// Must match a browser build the server accepts
    pub user_agent: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            accept: DEFAULT_ACCEPT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Behavior configuration for the UI.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Event polling interval in milliseconds
    pub poll_ms: u64,
    /// Cursor blink interval in milliseconds
    pub cursor_blink_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            poll_ms: 50,
            cursor_blink_ms: 530,
        }
    }
}

/// Theme configuration for UI elements.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThemeConfig {
    // Status line colors
    /// Status: waiting for input
    pub status_idle: Rgb,
    /// Status: request in flight
    pub status_busy: Rgb,
    /// Status: key verified
    pub status_success: Rgb,
    /// Status: any failure
    pub status_error: Rgb,

    // General UI colors
    /// Main background color
    pub bg_primary: Rgb,
    /// Input field background
    pub bg_input: Rgb,
    /// Frame border color
    pub border: Rgb,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            status_idle: [200, 200, 210],
            status_busy: [100, 200, 255],
            status_success: [100, 255, 100],
            status_error: [255, 100, 100],

            bg_primary: [20, 20, 25],
            bg_input: [30, 30, 35],
            border: [0, 255, 255], // Cyan
        }
    }
}

impl ThemeConfig {
    /// Convert an RGB array to a ratatui Color.
    pub fn to_color(rgb: &Rgb) -> ratatui::style::Color {
        ratatui::style::Color::Rgb(rgb[0], rgb[1], rgb[2])
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub endpoints: EndpointConfig,
    pub request: RequestConfig,
    pub behavior: BehaviorConfig,
    pub theme: ThemeConfig,
}

impl Config {
    /// Returns the default config file path: ~/.config/bcl-diag/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("bcl-diag").join("config.toml"))
    }

    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Self {
        Self::default_path()
            .and_then(|path| Self::load_from_path(&path).ok())
            .unwrap_or_default()
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Write this configuration to `path` unless a file is already there.
    ///
    /// Returns true if the file was written.
    pub fn write_if_missing(&self, path: impl AsRef<Path>) -> anyhow::Result<bool> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(false);
        }
        self.save_to_path(path)?;
        Ok(true)
    }

    /// Validate the endpoint and header settings for the probe.
    pub fn probe_config(&self) -> Result<ProbeConfig, ConfigError> {
        let ip_url = parse_endpoint("ip_url", &self.endpoints.ip_url)?;
        let search_url = parse_endpoint("search_url", &self.endpoints.search_url)?;
        if self.endpoints.key_param.trim().is_empty() {
            return Err(ConfigError::EmptyKeyParam);
        }

        Ok(ProbeConfig {
            ip_url,
            search_url,
            key_param: self.endpoints.key_param.clone(),
            accept: self.request.accept.clone(),
            user_agent: self.request.user_agent.clone(),
        })
    }
}

fn parse_endpoint(name: &'static str, url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidEndpoint {
        name,
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidEndpoint {
            name,
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Invalid probe settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {name} '{url}': {reason}")]
    InvalidEndpoint {
        name: &'static str,
        url: String,
        reason: String,
    },
    #[error("key_param must not be empty")]
    EmptyKeyParam,
}

/// Validated settings the verification session runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub ip_url: Url,
    pub search_url: Url,
    pub key_param: String,
    pub accept: String,
    pub user_agent: String,
}

impl ProbeConfig {
    /// Settings with the given endpoints and the stock headers.
    pub fn new(ip_url: Url, search_url: Url) -> Self {
        Self {
            ip_url,
            search_url,
            key_param: "oauth_consumer_key".to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Search URL with the key appended.
    pub fn credential_url(&self, credential: &Credential) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair(&self.key_param, credential.as_str());
        url
    }

    /// GET request for `url` carrying the configured headers.
    pub fn request(&self, url: Url) -> ProbeRequest {
        ProbeRequest::new(url)
            .with_header("Accept", self.accept.as_str())
            .with_header("User-Agent", self.user_agent.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::normalize;

    #[test]
    fn test_default_probe_config() {
        let probe = Config::default().probe_config().unwrap();
        assert_eq!(probe.ip_url.as_str(), "http://axelstudios.com/ip.php");
        assert_eq!(probe.key_param, "oauth_consumer_key");
        assert_eq!(probe.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_credential_url_appends_key() {
        let probe = Config::default().probe_config().unwrap();
        let key = normalize("0123456789abcdefABCDEF0123456789").unwrap().credential;
        assert_eq!(
            probe.credential_url(&key).as_str(),
            "http://bcl.nrel.gov/api/search/?api_version=1.1&show_rows=0&oauth_consumer_key=0123456789abcdefABCDEF0123456789"
        );
    }

    #[test]
    fn test_request_headers() {
        let probe = Config::default().probe_config().unwrap();
        let request = probe.request(probe.ip_url.clone());
        assert_eq!(
            request.headers,
            vec![
                ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
                ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = Config::default();
        config.endpoints.ip_url = "not a url".to_string();
        assert!(matches!(
            config.probe_config(),
            Err(ConfigError::InvalidEndpoint { name: "ip_url", .. })
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let mut config = Config::default();
        config.endpoints.search_url = "ftp://bcl.nrel.gov/api/search/".to_string();
        let err = config.probe_config().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme 'ftp'"));
    }

    #[test]
    fn test_empty_key_param_rejected() {
        let mut config = Config::default();
        config.endpoints.key_param = " ".to_string();
        assert_eq!(config.probe_config(), Err(ConfigError::EmptyKeyParam));
    }
}
