//! Orchestration of the session registry, sanitizer, and delivery pipeline.

use crate::config::TrackerConfig;
use crate::delivery::{DeliveryPipeline, HttpTransport, Transport};
use crate::mask::mask_value;
use crate::record::{LogRecord, RequestOutcome};
use crate::session::SessionRegistry;
use serde_json::json;
use std::sync::Arc;

/// Error type for tracker construction.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Construction refuses to proceed without a non-empty API key; the
    /// collector rejects unauthenticated traffic.
    #[error("API key is required")]
    MissingApiKey,
}

/// Entry point of the SDK: pairs `start`/`end` calls into log records and
/// hands them to the delivery pipeline.
///
/// Nothing that happens after construction ever propagates an error into the
/// instrumented application: unknown sessions are logged and skipped, and
/// delivery failures surface only through the pipeline's own logging.
///
/// # Example
///
/// ```ignore
/// use apitrail::{RequestOutcome, Tracker, TrackerConfig};
/// use serde_json::json;
///
/// let tracker = Tracker::new(TrackerConfig::new("my-api-key"))?;
///
/// let session_id = tracker.start("/api/users");
/// let users = fetch_users().await;
/// tracker
///     .end(&session_id, RequestOutcome::new().status_code(200).response(json!(users)))
///     .await;
/// ```
pub struct Tracker {
    pub(crate) config: Arc<TrackerConfig>,
    pub(crate) sessions: SessionRegistry,
    pub(crate) pipeline: DeliveryPipeline,
}

impl Tracker {
    /// Create a tracker shipping records over HTTP to the configured
    /// collector.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        let transport = Arc::new(HttpTransport::new(&config.collector_url, &config.api_key));
        Self::with_transport(config, transport)
    }

    /// Create a tracker over a caller-supplied transport.
    pub fn with_transport(config: TrackerConfig, transport: Arc<dyn Transport>) -> Result<Self, TrackerError> {
        if config.api_key.trim().is_empty() {
            return Err(TrackerError::MissingApiKey);
        }

        let pipeline = DeliveryPipeline::new(transport, config.retry_attempts, config.retry_delay, config.debug);
        Ok(Self {
            config: Arc::new(config),
            sessions: SessionRegistry::new(),
            pipeline,
        })
    }

    /// Open a session for a GET operation and return its id.
    pub fn start(&self, endpoint: &str) -> String {
        self.start_with_method(endpoint, "GET")
    }

    /// Open a session for the given endpoint and method and return its id.
    /// Never blocks.
    pub fn start_with_method(&self, endpoint: &str, method: &str) -> String {
        self.sessions.start(endpoint, method)
    }

    /// Close a session and deliver its log record.
    ///
    /// Consumes the session, computes the elapsed time from its monotonic
    /// start instant, sanitizes the outcome payloads, and awaits delivery
    /// including all retries. An unknown or already-consumed id logs a
    /// warning and returns without side effects; callers who do not want to
    /// wait for delivery should spawn this future instead of awaiting it.
    pub async fn end(&self, session_id: &str, outcome: RequestOutcome) {
        let Some(session) = self.sessions.consume(session_id) else {
            tracing::warn!(session_id, "unknown or already-ended session, skipping log record");
            return;
        };

        let elapsed_ms = session.started.elapsed().as_millis() as u64;
        let record = self.compose_record(session.endpoint, session.method, elapsed_ms, outcome);
        self.pipeline.deliver(&record).await;
    }

    /// Number of sessions started but not yet ended.
    ///
    /// Orphaned sessions are never reclaimed; this counter growing without
    /// bound means some `start` calls are not being paired with `end`.
    pub fn sessions_in_flight(&self) -> usize {
        self.sessions.len()
    }

    /// Drop a session without producing a record.
    pub(crate) fn discard(&self, session_id: &str) {
        let _ = self.sessions.consume(session_id);
    }

    /// Build an immutable record from an outcome, applying sanitization and
    /// the configured defaults.
    pub(crate) fn compose_record(
        &self,
        endpoint: String,
        method: String,
        elapsed_ms: u64,
        outcome: RequestOutcome,
    ) -> LogRecord {
        let rules = &self.config.mask_rules;
        LogRecord {
            endpoint,
            method,
            response_time: elapsed_ms,
            status_code: outcome.status_code.unwrap_or(200),
            environment: outcome
                .environment
                .unwrap_or_else(|| self.config.environment.clone()),
            host: self.config.host.clone(),
            body: outcome.body.map(|v| mask_value(&v, rules)),
            params: outcome.params.map(|v| mask_value(&v, rules)),
            request_headers: outcome.request_headers.map(|v| mask_value(&v, rules)),
            response: outcome.response.map(|v| mask_value(&v, rules)),
            metadata: outcome.metadata.unwrap_or_else(|| json!({})),
        }
    }

    /// Dispatch delivery as a background task that is never awaited by the
    /// caller; failures surface only through the pipeline's logging.
    pub(crate) fn spawn_delivery(&self, record: LogRecord) {
        let pipeline = self.pipeline.clone();
        tokio::spawn(async move {
            pipeline.deliver(&record).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::TransportError;
    use crate::mask::MASK_MARKER;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct CapturingTransport {
        records: Mutex<Vec<LogRecord>>,
    }

    impl CapturingTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(Vec::new()),
            })
        }

        fn records(&self) -> Vec<LogRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for CapturingTransport {
        async fn send(&self, record: &LogRecord) -> Result<(), TransportError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn tracker_with(transport: Arc<CapturingTransport>, config: TrackerConfig) -> Tracker {
        Tracker::with_transport(config, transport).unwrap()
    }

    #[test]
    fn construction_requires_api_key() {
        assert!(matches!(
            Tracker::new(TrackerConfig::new("")),
            Err(TrackerError::MissingApiKey)
        ));
        assert!(matches!(
            Tracker::new(TrackerConfig::new("   ")),
            Err(TrackerError::MissingApiKey)
        ));
        assert!(Tracker::new(TrackerConfig::new("key")).is_ok());
    }

    #[tokio::test]
    async fn start_then_end_delivers_a_record() {
        let transport = CapturingTransport::new();
        let tracker = tracker_with(
            transport.clone(),
            TrackerConfig::new("key").environment("test").host("api-1"),
        );

        let session_id = tracker.start("/api/users");
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker
            .end(
                &session_id,
                RequestOutcome::new().status_code(200).response(json!({ "id": 1 })),
            )
            .await;

        let records = transport.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.endpoint, "/api/users");
        assert_eq!(record.method, "GET");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.environment, "test");
        assert_eq!(record.host.as_deref(), Some("api-1"));
        assert_eq!(record.response, Some(json!({ "id": 1 })));
        assert!(record.response_time >= 10);
        assert!(tracker.sessions.is_empty());
    }

    #[tokio::test]
    async fn end_with_unknown_session_is_a_no_op() {
        let transport = CapturingTransport::new();
        let tracker = tracker_with(transport.clone(), TrackerConfig::new("key"));

        tracker.end("missing", RequestOutcome::new()).await;

        assert!(transport.records().is_empty());
    }

    #[tokio::test]
    async fn end_twice_delivers_once() {
        let transport = CapturingTransport::new();
        let tracker = tracker_with(transport.clone(), TrackerConfig::new("key"));

        let session_id = tracker.start("/once");
        tracker.end(&session_id, RequestOutcome::new()).await;
        tracker.end(&session_id, RequestOutcome::new()).await;

        assert_eq!(transport.records().len(), 1);
    }

    #[tokio::test]
    async fn outcome_payloads_are_sanitized_but_metadata_is_not() {
        let transport = CapturingTransport::new();
        let tracker = tracker_with(transport.clone(), TrackerConfig::new("key"));

        let session_id = tracker.start_with_method("/login", "post");
        tracker
            .end(
                &session_id,
                RequestOutcome::new()
                    .body(json!({ "email": "a@b.com", "password": "hunter2" }))
                    .metadata(json!({ "password": "not-a-payload" })),
            )
            .await;

        let record = &transport.records()[0];
        assert_eq!(record.method, "POST");
        assert_eq!(
            record.body,
            Some(json!({ "email": "a@b.com", "password": MASK_MARKER }))
        );
        assert_eq!(record.metadata, json!({ "password": "not-a-payload" }));
    }

    #[tokio::test]
    async fn defaults_apply_when_outcome_is_empty() {
        let transport = CapturingTransport::new();
        let tracker = tracker_with(transport.clone(), TrackerConfig::new("key"));

        let session_id = tracker.start("/defaults");
        tracker.end(&session_id, RequestOutcome::new()).await;

        let record = &transport.records()[0];
        assert_eq!(record.status_code, 200);
        assert_eq!(record.environment, "production");
        assert_eq!(record.host, None);
        assert_eq!(record.metadata, json!({}));
        assert!(record.body.is_none());
    }

    #[tokio::test]
    async fn per_call_environment_overrides_config() {
        let transport = CapturingTransport::new();
        let tracker = tracker_with(transport.clone(), TrackerConfig::new("key").environment("production"));

        let session_id = tracker.start("/env");
        tracker
            .end(&session_id, RequestOutcome::new().environment("canary"))
            .await;

        assert_eq!(transport.records()[0].environment, "canary");
    }
}
