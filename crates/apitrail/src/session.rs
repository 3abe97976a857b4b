//! In-flight session bookkeeping.
//!
//! A session is created by `start` and removed by exactly one matching
//! `consume`. The registry is instance-owned (held by the
//! [`Tracker`](crate::Tracker)), never a process-wide singleton. Sessions
//! that are started but never ended stay in the map indefinitely; callers
//! are responsible for pairing every `start` with an `end`.

use dashmap::DashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// One in-flight tracked operation between `start` and `end`.
#[derive(Debug, Clone)]
pub struct Session {
    /// Path identifier supplied by the caller or derived from the framework.
    pub endpoint: String,
    /// Uppercase HTTP verb.
    pub method: String,
    /// Monotonic instant captured when the session was opened.
    pub started: Instant,
}

/// Mapping from opaque session ids to in-flight sessions.
///
/// Retrieval is destructive: [`consume`](Self::consume) is a single atomic
/// map removal, so at most one caller ever obtains a given session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session and return its id. Never blocks.
    ///
    /// The id combines a nanosecond timestamp with a random suffix, which is
    /// unique within a process lifetime; cryptographic uniqueness is not
    /// required. The start instant comes from [`Instant::now`], immune to
    /// wall-clock adjustments.
    pub fn start(&self, endpoint: &str, method: &str) -> String {
        let session_id = next_session_id();
        self.sessions.insert(
            session_id.clone(),
            Session {
                endpoint: endpoint.to_string(),
                method: method.to_uppercase(),
                started: Instant::now(),
            },
        );
        session_id
    }

    /// Atomically retrieve and remove a session.
    ///
    /// Returns `None` for unknown or already-consumed ids; the caller treats
    /// that as a non-fatal condition.
    pub fn consume(&self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id).map(|(_, session)| session)
    }

    /// Number of sessions currently in flight.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are in flight.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn next_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}-{:08x}", nanos, rand::random::<u32>())
}
