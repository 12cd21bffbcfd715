//! Connection settings for a MediaMosa server.

use crate::error::{MediaMosaError, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Configuration for connecting to a MediaMosa back-end.
///
/// The user/password pair belongs to a "connector application" login set up
/// in the MediaMosa administration pages.
#[derive(Clone, Deserialize)]
pub struct MediaMosaConfig {
    /// Back-end host name, or a full base URL (e.g. "http://127.0.0.1:8080")
    pub host: String,
    /// Application login name
    pub user: String,
    /// Shared secret for the DBUS_COOKIE_SHA1 handshake
    pub password: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl MediaMosaConfig {
    /// Create a config with default port and timeouts.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Load configuration from `mediamosa.toml` (if present) and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Some(Path::new("mediamosa.toml")))
    }

    /// Load configuration from the given file (if it exists) and environment.
    ///
    /// Environment variables are prefixed with `MEDIAMOSA_`, e.g.
    /// `MEDIAMOSA_HOST` or `MEDIAMOSA_CONNECT_TIMEOUT_SECS`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path.filter(|p| p.exists()) {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("MEDIAMOSA").try_parsing(true),
        );

        let config: Self = settings
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MediaMosaError::InvalidConfiguration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject empty host, user or password.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("host", &self.host),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(MediaMosaError::InvalidConfiguration(format!(
                    "{} cannot be empty",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Debug for MediaMosaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaMosaConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

// Default values
fn default_port() -> u16 {
    80
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
