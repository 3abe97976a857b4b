//! Retrying delivery of finished log records to the collector.
//!
//! The pipeline owns the retry/timeout policy; the actual HTTP call sits
//! behind the [`Transport`] trait so tests can substitute the wire.

use crate::record::LogRecord;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Fixed ceiling on how long a single delivery attempt may run.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Error type for a single transport attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The collector answered with a non-success status.
    #[error("collector returned status {0}")]
    Status(u16),

    /// The attempt did not settle within [`ATTEMPT_TIMEOUT`].
    #[error("attempt timed out")]
    Timeout,
}

/// Seam between the delivery pipeline and the HTTP client carrying records
/// to the collector.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform one POST of `record` to the collector.
    async fn send(&self, record: &LogRecord) -> Result<(), TransportError>;
}

/// Production transport backed by `reqwest`.
///
/// Posts to `{collector_url}/logs` with the `X-API-Key` header; the JSON
/// content type is set by the serializer.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport for the given collector base URL and API key.
    pub fn new(collector_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/logs", collector_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    /// Full URL records are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, record: &LogRecord) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .json(record)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(response.status().as_u16()))
        }
    }
}

/// Ships records with linear backoff and a fixed per-attempt timeout.
///
/// A failed attempt (transport error, non-success status, or timeout) is
/// retried after `retry_delay × attempt_number` — linear growth, not
/// exponential. Success on any attempt short-circuits the loop; exhausting
/// the ceiling drops the record.
#[derive(Clone)]
pub struct DeliveryPipeline {
    transport: Arc<dyn Transport>,
    retry_attempts: u32,
    retry_delay: Duration,
    debug: bool,
}

impl DeliveryPipeline {
    /// Create a pipeline over the given transport.
    ///
    /// `retry_attempts` is the total attempt ceiling and is clamped to at
    /// least one.
    pub fn new(transport: Arc<dyn Transport>, retry_attempts: u32, retry_delay: Duration, debug: bool) -> Self {
        Self {
            transport,
            retry_attempts: retry_attempts.max(1),
            retry_delay,
            debug,
        }
    }

    /// Attempt delivery until success or the attempt ceiling is reached.
    ///
    /// Failures never escape to the caller: each attempt failure is logged
    /// as a warning with its attempt number, and exhaustion is logged as an
    /// error after which the record is dropped. There is no persistence and
    /// no dead-letter queue.
    pub async fn deliver(&self, record: &LogRecord) {
        if self.debug {
            match serde_json::to_string(record) {
                Ok(payload) => tracing::debug!(%payload, "sending log record"),
                Err(e) => tracing::debug!(error = %e, "log record not serializable"),
            }
        }

        for attempt in 1..=self.retry_attempts {
            let outcome = match tokio::time::timeout(ATTEMPT_TIMEOUT, self.transport.send(record)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            };

            match outcome {
                Ok(()) => {
                    if self.debug {
                        tracing::debug!(attempt, endpoint = %record.endpoint, "log record delivered");
                    }
                    return;
                }
                Err(error) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.retry_attempts,
                        error = %error,
                        "log delivery attempt failed"
                    );
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        tracing::error!(
            attempts = self.retry_attempts,
            endpoint = %record.endpoint,
            "log delivery exhausted, dropping record"
        );
    }
}
