use std::str::FromStr;
use std::time::Duration;

use pinboard_core::grid::DEFAULT_VIEWPORT_WIDTH;

/// Default PocketBase address for local development.
pub const DEFAULT_POCKETBASE_URL: &str = "http://127.0.0.1:8090";

/// Default REST request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// PocketBase server address.
    pub pocketbase_url: String,
    /// Auth token sent with every request, if any.
    pub pocketbase_token: Option<String>,
    /// User whose dashboards are listed at startup.
    pub user: Option<String>,
    /// Dashboard opened and kept live until shutdown.
    pub dashboard: Option<String>,
    /// Viewport width used for widget placement, in pixels.
    pub viewport_width: i32,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `POCKETBASE_URL`       | `http://127.0.0.1:8090`  |
    /// | `POCKETBASE_TOKEN`     | unset                    |
    /// | `PINBOARD_USER`        | unset                    |
    /// | `PINBOARD_DASHBOARD`   | unset                    |
    /// | `VIEWPORT_WIDTH`       | `1200`                   |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let pocketbase_url =
            optional("POCKETBASE_URL").unwrap_or_else(|| DEFAULT_POCKETBASE_URL.into());

        let viewport_width: i32 = parse_var(
            &optional,
            "VIEWPORT_WIDTH",
            DEFAULT_VIEWPORT_WIDTH,
            "a positive integer",
        )?;
        if viewport_width <= 0 {
            return Err(ConfigError::Invalid {
                name: "VIEWPORT_WIDTH",
                expected: "a positive integer",
                value: viewport_width.to_string(),
            });
        }

        let request_timeout_secs: u64 = parse_var(
            &optional,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            "a whole number of seconds",
        )?;

        Ok(Self {
            pocketbase_url,
            pocketbase_token: optional("POCKETBASE_TOKEN"),
            user: optional("PINBOARD_USER"),
            dashboard: optional("PINBOARD_DASHBOARD"),
            viewport_width,
            request_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: FromStr>(
    optional: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, expected, value }),
        None => Ok(default),
    }
}
