//! Event log for one binding invocation
//!
//! Audit trail of every stage, from request to completion.
//! - Event: envelope with id + timestamp + kind
//! - EventKind: invocation level and per-property level
//! - EventLog: thread-safe, append-only log

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the invocation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since invocation start (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // INVOCATION LEVEL
    // ═══════════════════════════════════════════
    InvocationStarted {
        component_type: Option<String>,
        markup_len: usize,
    },
    ComponentDetected {
        component_type: String,
    },
    TagExtracted {
        tag: String,
        has_inner_text: bool,
    },
    PropsDecoded {
        props: Value,
    },
    InstanceCreated {
        component: String,
        instance: String,
    },
    InvocationCompleted {
        applied: Vec<String>,
        unresolved: Vec<String>,
        duration_ms: u64,
    },
    InvocationFailed {
        error: String,
    },

    // ═══════════════════════════════════════════
    // PROPERTY LEVEL
    // ═══════════════════════════════════════════
    PropertiesApplied {
        keys: Vec<String>,
    },
    PropertiesRejected {
        keys: Vec<String>,
        error: String,
    },
    TextBound {
        key: String,
    },
    TextFailed {
        key: String,
        reason: String,
    },
    ImageApplied {
        key: String,
        layer: String,
    },
    ImageFailed {
        key: String,
        reason: String,
    },
}

impl EventKind {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::InvocationFailed { .. }
                | Self::PropertiesRejected { .. }
                | Self::TextFailed { .. }
                | Self::ImageFailed { .. }
        )
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    /// Create a new event log (call at invocation start)
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (thread-safe, returns event ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.elapsed_ms(),
            kind,
        };

        self.events.write().push(event);
        id
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn failures(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.is_failure())
            .collect()
    }

    /// Serialize to JSON for `--events`
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for EventLog {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.events.read().serialize(serializer)
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.len())
            .finish()
    }
}
