//! Framework integration: the host-framework contract and the tracking
//! middleware layer.
//!
//! The contract types define what a host framework must supply per
//! request — method, path, headers, buffered body, query string, route
//! parameters, and a continuation that finalizes the response exactly once.
//! [`TrackingLayer`] implements [`MiddlewareLayer`] against that contract:
//! install it once and every request/response cycle produces a log record
//! with no further caller intervention.

mod contract;
mod layer;

pub use contract::{BoxedNext, MiddlewareLayer, Request, Response};
pub use layer::TrackingLayer;
