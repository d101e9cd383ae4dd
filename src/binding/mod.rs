//! Binding Module - free-text values into text layers
//!
//! - `strategy`: ranked, pure slot selection
//! - [`bind`]: load font → write text → read back, per assignment
//!
//! Data flow:
//! ```text
//! Resolution.free_text ──┐
//! instance text slots ───┼→ choose_slot → load_font → set_text → text (verify)
//! main text slots ───────┘                                        ↓
//!                                                           BindingOutcome
//! ```

mod strategy;

pub use strategy::{choose_slot, SlotQuery, Strategy, STRATEGIES};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::host::{CandidateSlot, Host};
use crate::schema::ResolvedAssignment;

/// One assignment that did not land as requested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotFailure {
    /// No candidate slot exists
    NoSlot { key: String },
    /// The host could not list the text slots
    Lookup { key: String, reason: String },
    /// The host refused the font load or the write
    Apply { key: String, slot: String, reason: String },
    /// Written, but the slot reads back something else
    Mismatch {
        key: String,
        slot: String,
        expected: String,
        actual: String,
    },
}

impl SlotFailure {
    pub fn key(&self) -> &str {
        match self {
            SlotFailure::NoSlot { key }
            | SlotFailure::Lookup { key, .. }
            | SlotFailure::Apply { key, .. }
            | SlotFailure::Mismatch { key, .. } => key,
        }
    }
}

/// Terminal result of one invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BindingOutcome {
    /// Bag keys that reached the target
    pub assignments_applied: Vec<String>,
    /// Bag keys with no matching (or compatible) target property
    pub unresolved_keys: Vec<String>,
    pub slot_failures: Vec<SlotFailure>,
}

impl BindingOutcome {
    pub fn merge(&mut self, other: BindingOutcome) {
        self.assignments_applied.extend(other.assignments_applied);
        self.unresolved_keys.extend(other.unresolved_keys);
        self.slot_failures.extend(other.slot_failures);
    }
}

/// Write each free-text assignment into its chosen slot
///
/// Failures are isolated: every assignment is attempted.
#[instrument(skip_all, fields(assignments = free_text.len(), slots = slots.len()))]
pub async fn bind(
    host: &dyn Host,
    free_text: &[ResolvedAssignment],
    slots: &[CandidateSlot],
    main_slots: Option<&[CandidateSlot]>,
) -> BindingOutcome {
    let mut outcome = BindingOutcome::default();

    for (index, assignment) in free_text.iter().enumerate() {
        let query = SlotQuery {
            assignment,
            index,
            pending: free_text.len(),
            slots,
            main_slots,
        };

        let Some((slot_index, strategy)) = choose_slot(&query) else {
            warn!(key = %assignment.key, "no text slot available");
            outcome.slot_failures.push(SlotFailure::NoSlot {
                key: assignment.key.clone(),
            });
            continue;
        };

        let slot = &slots[slot_index];
        debug!(key = %assignment.key, slot = %slot.name, strategy, "slot chosen");

        match write_slot(host, slot, &assignment.value.to_string()).await {
            Ok(()) => outcome.assignments_applied.push(assignment.key.clone()),
            Err(failure) => {
                let failure = failure.into_failure(&assignment.key, &slot.name);
                warn!(?failure, "free-text assignment failed");
                outcome.slot_failures.push(failure);
            }
        }
    }

    outcome
}

enum WriteError {
    Host(String),
    Mismatch { expected: String, actual: String },
}

impl WriteError {
    fn into_failure(self, key: &str, slot: &str) -> SlotFailure {
        match self {
            WriteError::Host(reason) => SlotFailure::Apply {
                key: key.to_string(),
                slot: slot.to_string(),
                reason,
            },
            WriteError::Mismatch { expected, actual } => SlotFailure::Mismatch {
                key: key.to_string(),
                slot: slot.to_string(),
                expected,
                actual,
            },
        }
    }
}

async fn write_slot(host: &dyn Host, slot: &CandidateSlot, text: &str) -> Result<(), WriteError> {
    let host_err = |e: crate::host::HostError| WriteError::Host(e.to_string());

    host.load_font(&slot.id).await.map_err(host_err)?;
    host.set_text(&slot.id, text).map_err(host_err)?;

    let actual = host.text(&slot.id).map_err(host_err)?;
    if actual != text {
        return Err(WriteError::Mismatch {
            expected: text.to_string(),
            actual,
        });
    }
    Ok(())
}
