use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Connection settings for the time-series write endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8086".to_string(),
            org: String::new(),
            bucket: String::new(),
            token: String::new(),
            timeout: Duration::from_secs(20),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("telemetry-forwarder/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub bytes_sent: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    bytes_sent: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    pub fn record_request(&self, success: bool, bytes: usize, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
            self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// HTTP client for `{base}/api/v2/write`.
///
/// Cheap to clone: the underlying connection pool and the counters are
/// shared between clones.
#[derive(Debug, Clone)]
pub struct InfluxClient {
    pub(crate) client: Client,
    pub(crate) config: ClientConfig,
    write_url: Url,
    pub(crate) stats: Arc<ClientStats>,
}

impl InfluxClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let write_url = build_write_url(&config)?;

        if config.timeout.is_zero() || config.connection_timeout.is_zero() {
            return Err(ClientError::InvalidConfiguration(
                "Timeouts must be greater than zero".to_string(),
            ));
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            write_url,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            bytes_sent: self.stats.bytes_sent.load(Ordering::Relaxed),
            average_response_time,
        }
    }
}

/// `{base}/api/v2/write?org=..&bucket=..&precision=s`, keeping any path
/// prefix already present on the base URL.
pub fn build_write_url(config: &ClientConfig) -> Result<Url, ClientError> {
    let mut url: Url = config
        .base_url
        .parse()
        .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid base URL: {e}")))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidConfiguration(format!(
            "Base URL must be http(s): {}",
            config.base_url
        )));
    }

    let path = format!("{}/api/v2/write", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut()
        .clear()
        .append_pair("org", &config.org)
        .append_pair("bucket", &config.bucket)
        .append_pair("precision", "s");

    Ok(url)
}
