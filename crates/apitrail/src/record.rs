//! Wire-format log record and the caller-supplied outcome it is built from.

use serde::Serialize;
use serde_json::Value;

/// The finished, immutable telemetry unit submitted to the collector.
///
/// Serialized as the JSON body of `POST {collector_url}/logs`. Constructed
/// only by the [`Tracker`](crate::Tracker), with every payload field already
/// sanitized; never mutated after being handed to the delivery pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Path identifier of the tracked operation.
    pub endpoint: String,
    /// Uppercase HTTP verb.
    pub method: String,
    /// Elapsed wall time between start and end, in whole milliseconds.
    pub response_time: u64,
    /// HTTP status of the outcome (200 when unspecified).
    pub status_code: u16,
    /// Deployment environment tag.
    pub environment: String,
    /// Optional host identifier, static per tracker instance.
    pub host: Option<String>,
    /// Sanitized request body, if supplied.
    pub body: Option<Value>,
    /// Sanitized query parameters, if supplied.
    pub params: Option<Value>,
    /// Sanitized request headers, if supplied.
    pub request_headers: Option<Value>,
    /// Sanitized response payload, if supplied.
    pub response: Option<Value>,
    /// Free-form caller-supplied metadata. Not sanitized.
    pub metadata: Value,
}

/// Outcome data handed to [`Tracker::end`](crate::Tracker::end).
///
/// Every field is optional; unspecified fields fall back to the defaults
/// documented on [`LogRecord`].
///
/// # Example
///
/// ```ignore
/// use apitrail::RequestOutcome;
/// use serde_json::json;
///
/// let outcome = RequestOutcome::new()
///     .status_code(201)
///     .body(json!({ "email": "a@b.com", "password": "hunter2" }))
///     .response(json!({ "id": 1 }));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOutcome {
    /// HTTP status of the tracked operation.
    pub status_code: Option<u16>,
    /// Per-call environment override.
    pub environment: Option<String>,
    /// Raw request body; sanitized before inclusion.
    pub body: Option<Value>,
    /// Raw query parameters; sanitized before inclusion.
    pub params: Option<Value>,
    /// Raw request headers; sanitized before inclusion.
    pub request_headers: Option<Value>,
    /// Raw response payload; sanitized before inclusion.
    pub response: Option<Value>,
    /// Free-form metadata, passed through without sanitization.
    pub metadata: Option<Value>,
}

impl RequestOutcome {
    /// Create an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP status code.
    pub fn status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Override the environment tag for this record only.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Attach the request body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach query parameters.
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Attach request headers.
    pub fn request_headers(mut self, headers: Value) -> Self {
        self.request_headers = Some(headers);
        self
    }

    /// Attach the response payload.
    pub fn response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Attach free-form metadata.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_camel_case_wire_keys() {
        let record = LogRecord {
            endpoint: "/api/users".to_string(),
            method: "GET".to_string(),
            response_time: 42,
            status_code: 200,
            environment: "production".to_string(),
            host: None,
            body: None,
            params: None,
            request_headers: Some(json!({ "content-type": "application/json" })),
            response: Some(json!({ "id": 1 })),
            metadata: json!({}),
        };

        let wire = serde_json::to_value(&record).unwrap();

        assert_eq!(
            wire,
            json!({
                "endpoint": "/api/users",
                "method": "GET",
                "responseTime": 42,
                "statusCode": 200,
                "environment": "production",
                "host": null,
                "body": null,
                "params": null,
                "requestHeaders": { "content-type": "application/json" },
                "response": { "id": 1 },
                "metadata": {}
            })
        );
    }

    #[test]
    fn outcome_builder_sets_fields() {
        let outcome = RequestOutcome::new()
            .status_code(404)
            .environment("staging")
            .metadata(json!({ "traceId": "abc" }));

        assert_eq!(outcome.status_code, Some(404));
        assert_eq!(outcome.environment.as_deref(), Some("staging"));
        assert_eq!(outcome.metadata, Some(json!({ "traceId": "abc" })));
        assert!(outcome.body.is_none());
    }
}
