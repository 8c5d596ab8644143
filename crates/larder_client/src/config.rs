//! Configuration for the client.

use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default service base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.anylist.com/";
/// Default live channel URL.
pub const DEFAULT_SOCKET_URL: &str = "wss://www.anylist.com/data/add-user-listener";
/// API version sent with every request.
pub const DEFAULT_API_VERSION: &str = "3";

/// Configuration for a client session.
#[derive(Clone)]
pub struct ClientConfig {
    /// Account email.
    pub email: String,
    /// Account password. Also the secret the credentials file is sealed with.
    pub password: String,
    /// Service base URL.
    pub base_url: String,
    /// Live channel URL.
    pub socket_url: String,
    /// API version header value.
    pub api_version: String,
    /// Where to persist credentials. `None` disables persistence.
    pub credentials_file: Option<PathBuf>,
    /// Keepalive period of the live channel.
    pub heartbeat_interval: Duration,
    /// Reconnect policy of the live channel.
    pub reconnect: RetryConfig,
}

impl ClientConfig {
    /// Creates a configuration for an account.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credentials_file: None,
            heartbeat_interval: Duration::from_secs(5),
            reconnect: RetryConfig::default(),
        }
    }

    /// Sets the service base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the live channel URL.
    pub fn with_socket_url(mut self, url: impl Into<String>) -> Self {
        self.socket_url = url.into();
        self
    }

    /// Sets the API version header value.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Enables credential persistence at a path.
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Sets the keepalive period.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the reconnect policy.
    pub fn with_reconnect(mut self, reconnect: RetryConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Returns the absolute URL of a service path.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Returns the live channel settings.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            url: self.socket_url.clone(),
            heartbeat_interval: self.heartbeat_interval,
            reconnect: self.reconnect.clone(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("socket_url", &self.socket_url)
            .field("api_version", &self.api_version)
            .field("credentials_file", &self.credentials_file)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

/// Settings of the live channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Channel URL.
    pub url: String,
    /// Keepalive period.
    pub heartbeat_interval: Duration,
    /// Reconnect policy.
    pub reconnect: RetryConfig,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of consecutive failed attempts before giving up.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter
            let jitter = delay_secs * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(2)
    }
}
