//! Tracking middleware: auto-generates a log record per request/response
//! cycle.

use super::contract::{BoxedNext, MiddlewareLayer, Request, Response};
use crate::record::RequestOutcome;
use crate::tracker::Tracker;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Request headers recorded on every tracked request.
const REQUEST_HEADER_WHITELIST: [&str; 3] = ["content-type", "user-agent", "accept"];

/// Middleware that wraps a framework request/response cycle with a tracked
/// session.
///
/// On entry it opens a session and captures its own monotonic instant; after
/// the framework finishes the response it composes a log record from the
/// request and the outgoing payload, dispatches delivery as a background
/// task, and returns the original payload untouched. Telemetry never delays
/// or alters the response, and delivery failures surface only through the
/// delivery pipeline's own logging.
///
/// # Example
///
/// ```ignore
/// use apitrail::{Tracker, TrackerConfig, TrackingLayer};
/// use std::sync::Arc;
///
/// let tracker = Arc::new(Tracker::new(TrackerConfig::new("my-api-key"))?);
/// framework.install(TrackingLayer::new(tracker));
/// ```
#[derive(Clone)]
pub struct TrackingLayer {
    tracker: Arc<Tracker>,
}

impl TrackingLayer {
    /// Create a tracking layer over a shared tracker.
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    /// Decode query parameters from the request URI.
    fn extract_query_params(req: &Request) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(query) = req.query_string() {
            for pair in query.split('&') {
                let mut parts = pair.splitn(2, '=');
                if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                    params.insert(
                        urlencoding::decode(key).unwrap_or_default().into_owned(),
                        urlencoding::decode(value).unwrap_or_default().into_owned(),
                    );
                }
            }
        }
        params
    }

    /// Capture the whitelisted request headers, or `None` when none are
    /// present.
    fn capture_headers(req: &Request) -> Option<Value> {
        let mut captured = serde_json::Map::new();
        for name in REQUEST_HEADER_WHITELIST {
            if let Some(value) = req.headers().get(name) {
                if let Ok(value) = value.to_str() {
                    captured.insert(name.to_string(), Value::String(value.to_string()));
                }
            }
        }
        if captured.is_empty() {
            None
        } else {
            Some(Value::Object(captured))
        }
    }

    /// Interpret a payload as structured data. Non-JSON and empty payloads
    /// yield `None`; failure to interpret is swallowed, never propagated.
    fn interpret_payload(bytes: &Bytes) -> Option<Value> {
        if bytes.is_empty() {
            return None;
        }
        serde_json::from_slice(bytes).ok()
    }
}

impl MiddlewareLayer for TrackingLayer {
    fn call(&self, req: Request, next: BoxedNext) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> {
        let tracker = self.tracker.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            let method = req.method().to_string();

            // The registry's instant is not used on this path; the layer
            // keeps its own because the response is finalized outside the
            // registry's bookkeeping.
            let session_id = tracker.start_with_method(&path, &method);
            let started = Instant::now();

            let query_params = Self::extract_query_params(&req);
            let request_headers = Self::capture_headers(&req);
            let route_params = req.path_params().clone();
            let request_body = req.body().cloned().and_then(|b| Self::interpret_payload(&b));

            let response = next(req).await;

            let elapsed_ms = started.elapsed().as_millis() as u64;
            let (parts, body) = response.into_parts();
            let body_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(_) => Bytes::new(),
            };
            let response_payload = Self::interpret_payload(&body_bytes);

            let mut outcome = RequestOutcome::new().status_code(parts.status.as_u16());
            if let Some(body) = request_body {
                outcome = outcome.body(body);
            }
            if !query_params.is_empty() {
                if let Ok(params) = serde_json::to_value(&query_params) {
                    outcome = outcome.params(params);
                }
            }
            if let Some(headers) = request_headers {
                outcome = outcome.request_headers(headers);
            }
            if let Some(payload) = response_payload {
                outcome = outcome.response(payload);
            }
            if !route_params.is_empty() {
                if let Ok(params) = serde_json::to_value(&route_params) {
                    outcome = outcome.metadata(json!({ "routeParams": params }));
                }
            }

            let record = tracker.compose_record(path, method, elapsed_ms, outcome);
            tracker.spawn_delivery(record);
            tracker.discard(&session_id);

            // Hand the framework back exactly what it produced.
            http::Response::from_parts(parts, Full::new(body_bytes))
        })
    }

    fn clone_box(&self) -> Box<dyn MiddlewareLayer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::delivery::{Transport, TransportError};
    use crate::mask::MASK_MARKER;
    use crate::record::LogRecord;
    use async_trait::async_trait;
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

    fn test_tracker(transport: Arc<CapturingTransport>) -> Arc<Tracker> {
        Arc::new(Tracker::with_transport(TrackerConfig::new("key").environment("test"), transport).unwrap())
    }

    fn json_next(status: u16, payload: &'static str) -> BoxedNext {
        Arc::new(move |_req: Request| {
            Box::pin(async move {
                http::Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Full::new(Bytes::from(payload)))
                    .unwrap()
            }) as Pin<Box<dyn Future<Output = Response> + Send + 'static>>
        })
    }

    fn make_request(method: &str, uri: &str, body: &'static [u8]) -> Request {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("user-agent", "apitrail-tests")
            .body(())
            .unwrap();
        Request::from_http_request(req, Bytes::from_static(body))
    }

    async fn wait_for_record(transport: &CapturingTransport) -> LogRecord {
        for _ in 0..50 {
            if let Some(record) = transport.records().into_iter().next() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no record delivered");
    }

    #[tokio::test]
    async fn response_passes_through_unmodified() {
        let transport = CapturingTransport::new();
        let layer = TrackingLayer::new(test_tracker(transport.clone()));

        let req = make_request("GET", "/api/users", b"");
        let response = layer.call(req, json_next(200, r#"{"id":1}"#)).await;

        assert_eq!(response.status(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn record_is_composed_from_the_cycle() {
        let transport = CapturingTransport::new();
        let tracker = test_tracker(transport.clone());
        let layer = TrackingLayer::new(tracker.clone());

        let req = make_request("POST", "/api/login?next=%2Fhome", br#"{"password":"hunter2"}"#);
        let _ = layer.call(req, json_next(201, r#"{"ok":true}"#)).await;

        let record = wait_for_record(&transport).await;
        assert_eq!(record.endpoint, "/api/login");
        assert_eq!(record.method, "POST");
        assert_eq!(record.status_code, 201);
        assert_eq!(record.environment, "test");
        assert_eq!(record.body, Some(serde_json::json!({ "password": MASK_MARKER })));
        assert_eq!(record.params, Some(serde_json::json!({ "next": "/home" })));
        assert_eq!(record.response, Some(serde_json::json!({ "ok": true })));
        let headers = record.request_headers.unwrap();
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["user-agent"], "apitrail-tests");
        assert!(headers.get("accept").is_none());
    }

    #[tokio::test]
    async fn non_json_response_is_recorded_as_absent() {
        let transport = CapturingTransport::new();
        let layer = TrackingLayer::new(test_tracker(transport.clone()));

        let req = make_request("GET", "/plain", b"");
        let response = layer.call(req, json_next(200, "hello, world")).await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello, world");

        let record = wait_for_record(&transport).await;
        assert!(record.response.is_none());
    }

    #[tokio::test]
    async fn empty_query_is_omitted() {
        let transport = CapturingTransport::new();
        let layer = TrackingLayer::new(test_tracker(transport.clone()));

        let req = make_request("GET", "/bare", b"");
        let _ = layer.call(req, json_next(200, "{}")).await;

        let record = wait_for_record(&transport).await;
        assert!(record.params.is_none());
    }

    #[tokio::test]
    async fn route_params_are_carried_in_metadata() {
        let transport = CapturingTransport::new();
        let layer = TrackingLayer::new(test_tracker(transport.clone()));

        let mut params = HashMap::new();
        params.insert("id".to_string(), "42".to_string());
        let req = http::Request::builder().method("GET").uri("/users/42").body(()).unwrap();
        let req = Request::from_http_request(req, Bytes::new()).with_path_params(params);

        let _ = layer.call(req, json_next(200, "{}")).await;

        let record = wait_for_record(&transport).await;
        assert_eq!(record.metadata, serde_json::json!({ "routeParams": { "id": "42" } }));
    }

    #[tokio::test]
    async fn registry_entry_is_cleaned_up() {
        let transport = CapturingTransport::new();
        let tracker = test_tracker(transport.clone());
        let layer = TrackingLayer::new(tracker.clone());

        let req = make_request("GET", "/cleanup", b"");
        let _ = layer.call(req, json_next(200, "{}")).await;

        assert!(tracker.sessions.is_empty());
    }
}
