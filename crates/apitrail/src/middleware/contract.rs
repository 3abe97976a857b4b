//! Integration contract between the tracker and a host web framework.
//!
//! A framework embeds the SDK by constructing a [`Request`] for each
//! incoming call, handing it to the installed [`MiddlewareLayer`] together
//! with a [`BoxedNext`] continuation for the rest of its pipeline, and
//! transmitting the returned [`Response`]. The layer must invoke the
//! continuation exactly once and return its payload unmodified.

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use http_body_util::Full;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Buffered HTTP response handed back to the framework for transmission.
pub type Response = http::Response<Full<Bytes>>;

/// Continuation invoking the remainder of the framework's request pipeline,
/// ending in the framework's own response finalization.
pub type BoxedNext =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>> + Send + Sync>;

/// One incoming framework request: parsed head, buffered body bytes, and
/// the route parameters the framework's router matched.
pub struct Request {
    parts: Parts,
    body: Option<Bytes>,
    path_params: HashMap<String, String>,
}

impl Request {
    /// Create a request from its parts.
    pub fn new(parts: Parts, body: Bytes, path_params: HashMap<String, String>) -> Self {
        Self {
            parts,
            body: Some(body),
            path_params,
        }
    }

    /// Create a request from an `http::Request` head and buffered body
    /// bytes, with no route parameters.
    pub fn from_http_request<B>(req: http::Request<B>, body: Bytes) -> Self {
        let (parts, _) = req.into_parts();
        Self::new(parts, body, HashMap::new())
    }

    /// Attach route parameters matched by the framework's router.
    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    /// Get the HTTP method.
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI.
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the request path.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get the query string.
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Borrow the buffered body bytes, if still present.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Take the body bytes (can only be called once).
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Get the route parameters.
    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .finish()
    }
}

/// Trait for middleware wrapping one request/response cycle.
pub trait MiddlewareLayer: Send + Sync + 'static {
    /// Apply this middleware to a request, calling `next` to continue the
    /// framework's chain.
    fn call(&self, req: Request, next: BoxedNext) -> Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

    /// Clone this middleware into a boxed trait object.
    fn clone_box(&self) -> Box<dyn MiddlewareLayer>;
}

impl Clone for Box<dyn MiddlewareLayer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
