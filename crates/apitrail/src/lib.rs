//! # apitrail
//!
//! API request telemetry SDK: tracks request lifecycles, masks sensitive
//! fields, and ships structured log records to a remote collector — without
//! blocking or altering the instrumented request.
//!
//! Three subsystems do the work:
//!
//! - the [`SessionRegistry`] correlates an asynchronous `start` call with a
//!   later `end` call across arbitrary intervening work,
//! - the sanitizer ([`mask_value`]) recursively redacts sensitive values
//!   from arbitrarily nested payloads before they leave the process,
//! - the [`DeliveryPipeline`] ships finished records with linear-backoff
//!   retries and per-attempt timeout enforcement.
//!
//! The [`Tracker`] orchestrates all three; [`TrackingLayer`] does the same
//! automatically for every request a host web framework handles.
//!
//! ## Manual tracking
//!
//! ```ignore
//! use apitrail::{RequestOutcome, Tracker, TrackerConfig};
//! use serde_json::json;
//!
//! let tracker = Tracker::new(TrackerConfig::new("my-api-key"))?;
//!
//! let session_id = tracker.start_with_method("/api/users", "POST");
//! let user = create_user().await;
//! tracker
//!     .end(
//!         &session_id,
//!         RequestOutcome::new().status_code(201).response(json!(user)),
//!     )
//!     .await;
//! ```
//!
//! ## Framework middleware
//!
//! ```ignore
//! use apitrail::{Tracker, TrackerConfig, TrackingLayer};
//! use std::sync::Arc;
//!
//! let tracker = Arc::new(Tracker::new(TrackerConfig::from_env()?)?);
//! framework.install(TrackingLayer::new(tracker));
//! ```
//!
//! Delivery is best-effort: after the retry ceiling is exhausted a record is
//! dropped and the failure logged. No ordering is guaranteed between
//! concurrent deliveries, and nothing inside the SDK ever propagates an
//! error into the instrumented application — the sole construction-time
//! exception is a missing API key.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod delivery;
pub mod mask;
pub mod middleware;
pub mod record;
pub mod session;
pub mod tracker;

pub use config::{load_dotenv, ConfigError, TrackerConfig};
pub use delivery::{DeliveryPipeline, HttpTransport, Transport, TransportError, ATTEMPT_TIMEOUT};
pub use mask::{mask_value, MaskRuleSet, DEFAULT_MASKED_FIELDS, MASK_MARKER};
pub use middleware::{BoxedNext, MiddlewareLayer, Request, Response, TrackingLayer};
pub use record::{LogRecord, RequestOutcome};
pub use session::{Session, SessionRegistry};
pub use tracker::{Tracker, TrackerError};
