//! Configuration for the client.

use crate::error::{ClientError, ClientResult};
use rand::Rng;
use std::time::Duration;

/// Statuses below 500 retried by default: request timeout and rate limit.
///
/// Every 5xx status is retried on top of these unless
/// [`RetryConfig::with_server_errors`] turns that off.
pub const DEFAULT_RETRY_STATUSES: [u16; 2] = [408, 429];

/// Returns true for 5xx statuses.
pub fn is_server_error(status: u16) -> bool {
    (500..=599).contains(&status)
}

/// Well-known API deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// The production API.
    Production,
    /// The sandbox for trying things out without spending money.
    Sandbox,
}

impl Environment {
    /// Returns the base URL of the deployment.
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://toloka.yandex.com",
            Environment::Sandbox => "https://sandbox.toloka.yandex.com",
        }
    }
}

/// Configuration for a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash. Requests go to `<base_url>/api<path>`.
    pub base_url: String,
    /// OAuth token sent with every request.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent header.
    pub user_agent: String,
    /// Retry configuration for individual requests.
    pub retry: RetryConfig,
    /// Operation polling configuration.
    pub poll: PollConfig,
    /// Pagination configuration.
    pub pagination: PaginationConfig,
}

impl ClientConfig {
    /// Creates a configuration for an explicit base URL.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: Duration::from_secs(10),
            user_agent: format!("crowdkit/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
            poll: PollConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }

    /// Creates a configuration for a well-known deployment.
    pub fn for_environment(environment: Environment, token: impl Into<String>) -> Self {
        Self::new(environment.base_url(), token)
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the polling configuration.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the pagination configuration.
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Returns the full URL for an API path such as `/v1/tasks`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Checks that the configuration can drive a client.
    pub fn validate(&self) -> ClientResult<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::InvalidConfig("base_url is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ClientError::InvalidConfig(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 || self.poll.multiplier < 1.0 {
            return Err(ClientError::InvalidConfig(
                "backoff multipliers must be at least 1.0".into(),
            ));
        }
        if self.pagination.max_empty_pages == 0 {
            return Err(ClientError::InvalidConfig(
                "pagination.max_empty_pages must be at least 1".into(),
            ));
        }
        if self.pagination.page_size == Some(0) {
            return Err(ClientError::InvalidConfig(
                "pagination.page_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
    /// Whether every 5xx status is retried.
    pub retry_server_errors: bool,
    /// Further HTTP statuses that are retried.
    pub retry_statuses: Vec<u16>,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
            retry_server_errors: true,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
            retry_server_errors: true,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
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

    /// Sets whether every 5xx status is retried.
    pub fn with_server_errors(mut self, retry: bool) -> Self {
        self.retry_server_errors = retry;
        self
    }

    /// Replaces the set of further retried statuses.
    pub fn with_retry_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    /// Returns true if a response with this status should be retried.
    pub fn retries_status(&self, status: u16) -> bool {
        (self.retry_server_errors && is_server_error(status)) || self.retry_statuses.contains(&status)
    }

    /// Returns true if the error is worth another attempt under this policy.
    pub fn should_retry(&self, error: &ClientError) -> bool {
        match error {
            ClientError::Api(api) => self.retries_status(api.status),
            other => other.is_retryable(),
        }
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
            // Up to 25% on top
            let jitter = delay_secs * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Configuration for polling long-running operations.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the first poll of an operation that started recently.
    pub initial_delay: Duration,
    /// Delay after the first unfinished poll.
    pub interval: Duration,
    /// Upper bound of the delay between polls.
    pub max_interval: Duration,
    /// Growth factor of the delay between polls.
    pub multiplier: f64,
    /// Give up waiting after this long. `None` waits until the operation ends.
    pub timeout: Option<Duration>,
}

impl PollConfig {
    /// Creates the default polling configuration.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 1.5,
            timeout: None,
        }
    }

    /// Polls back to back. Meant for tests against in-memory backends.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            multiplier: 1.0,
            timeout: None,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the first interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the maximum interval.
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Sets the growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets a deadline for waiting on one operation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Delay after the `poll`-th unfinished poll (0-indexed).
    pub fn interval_for(&self, poll: u32) -> Duration {
        let secs = self.interval.as_secs_f64() * self.multiplier.powi(poll as i32);
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()))
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for exhaustive pagination.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Page size requested from the server. `None` uses the server default.
    pub page_size: Option<u32>,
    /// Consecutive empty pages with `has_more` tolerated before stopping.
    pub max_empty_pages: u32,
}

impl PaginationConfig {
    /// Creates the default pagination configuration.
    pub fn new() -> Self {
        Self {
            page_size: None,
            max_empty_pages: 1,
        }
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets how many consecutive empty pages end an enumeration.
    pub fn with_max_empty_pages(mut self, max: u32) -> Self {
        self.max_empty_pages = max;
        self
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ApiErrorKind};

    #[test]
    fn client_config_builder() {
        let config = ClientConfig::new("https://api.example.com/", "secret")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("tests")
            .with_pagination(PaginationConfig::new().with_page_size(25));

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.url_for("/v1/tasks"), "https://api.example.com/api/v1/tasks");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "tests");
        assert_eq!(config.pagination.page_size, Some(25));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_presets() {
        let config = ClientConfig::for_environment(Environment::Sandbox, "t");
        assert_eq!(config.base_url, Environment::Sandbox.base_url());
        assert_ne!(
            Environment::Sandbox.base_url(),
            Environment::Production.base_url()
        );
    }

    #[test]
    fn validation_rejects_unusable_configs() {
        let base = ClientConfig::new("https://api.example.com", "t");

        assert!(base.clone().with_retry(RetryConfig::new(0)).validate().is_err());
        assert!(ClientConfig::new("", "t").validate().is_err());
        assert!(base
            .clone()
            .with_pagination(PaginationConfig::new().with_max_empty_pages(0))
            .validate()
            .is_err());
        assert!(base
            .clone()
            .with_pagination(PaginationConfig::new().with_page_size(0))
            .validate()
            .is_err());
        assert!(base
            .with_poll(PollConfig::new().with_multiplier(0.5))
            .validate()
            .is_err());
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(125));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        let delay = config.delay_for_attempt(5);
        assert!(delay <= Duration::from_millis(6250));
    }

    #[test]
    fn retry_delay_without_jitter_is_exact() {
        let config = RetryConfig::new(4)
            .with_jitter(false)
            .with_initial_delay(Duration::from_millis(50));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(200));
    }

    #[test]
    fn retry_statuses_drive_classification() {
        let config = RetryConfig::default();
        let unavailable = ClientError::Api(ApiError::new(503, ApiErrorKind::Unknown, "", ""));
        let not_found = ClientError::Api(ApiError::new(404, ApiErrorKind::DoesNotExist, "", ""));
        let throttled = ClientError::Api(ApiError::new(429, ApiErrorKind::TooManyRequests, "", ""));
        assert!(config.should_retry(&unavailable));
        assert!(config.should_retry(&throttled));
        assert!(!config.should_retry(&not_found));

        let strict = config.with_server_errors(false).with_retry_statuses([500]);
        assert!(!strict.should_retry(&unavailable));
        assert!(strict.should_retry(&ClientError::Api(ApiError::new(500, ApiErrorKind::Internal, "", ""))));
        assert!(strict.should_retry(&ClientError::Timeout));
    }

    #[test]
    fn every_server_error_is_retried() {
        let config = RetryConfig::default();
        for status in [500, 501, 502, 503, 504, 599] {
            let err = ClientError::Api(ApiError::new(status, ApiErrorKind::Unknown, "", ""));
            assert!(config.should_retry(&err), "status {status}");
        }
        for status in [400, 401, 403, 404, 409] {
            let err = ClientError::Api(ApiError::new(status, ApiErrorKind::Unknown, "", ""));
            assert!(!config.should_retry(&err), "status {status}");
        }
        assert!(!is_server_error(499));
        assert!(!is_server_error(600));
    }

    #[test]
    fn poll_intervals_grow_to_cap() {
        let poll = PollConfig::new();
        assert_eq!(poll.interval_for(0), Duration::from_secs(1));
        assert_eq!(poll.interval_for(1), Duration::from_millis(1500));
        assert_eq!(poll.interval_for(20), Duration::from_secs(10));
        assert_eq!(PollConfig::immediate().interval_for(5), Duration::ZERO);
    }
}
