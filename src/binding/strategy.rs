//! Slot selection strategies
//!
//! Each strategy is a pure function over one pending assignment and the
//! current slot list. [`choose_slot`] walks them in rank order and returns
//! the first hit.

use crate::host::CandidateSlot;
use crate::schema::{normalize_identifier, ResolvedAssignment};

/// Inputs for choosing a slot for one assignment
#[derive(Debug, Clone, Copy)]
pub struct SlotQuery<'a> {
    pub assignment: &'a ResolvedAssignment,
    /// Position of `assignment` among the pending ones
    pub index: usize,
    /// Number of pending free-text assignments
    pub pending: usize,
    /// Text slots of the live instance, in document order
    pub slots: &'a [CandidateSlot],
    /// Text slots of the main component, when known
    pub main_slots: Option<&'a [CandidateSlot]>,
}

pub type Strategy = fn(&SlotQuery<'_>) -> Option<usize>;

/// Ranked strategies, first success wins
pub const STRATEGIES: [(&str, Strategy); 5] = [
    ("single_slot", single_slot),
    ("bound_to_property", bound_to_property),
    ("first_bound", first_bound),
    ("positional", positional),
    ("first_slot", first_slot),
];

/// Index of the chosen slot plus the strategy that chose it
pub fn choose_slot(query: &SlotQuery<'_>) -> Option<(usize, &'static str)> {
    STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(query).map(|index| (index, *name)))
}

/// Exactly one slot exists
pub fn single_slot(query: &SlotQuery<'_>) -> Option<usize> {
    (query.slots.len() == 1).then_some(0)
}

/// A slot whose text is bound to this assignment's own property
pub fn bound_to_property(query: &SlotQuery<'_>) -> Option<usize> {
    let target = &query.assignment.target_identifier;
    let normalized = normalize_identifier(target);

    query.slots.iter().position(|slot| match &slot.bound_reference {
        Some(reference) => {
            reference == target || (!normalized.is_empty() && normalize_identifier(reference) == normalized)
        }
        None => false,
    })
}

/// The first slot exposing any bound reference
pub fn first_bound(query: &SlotQuery<'_>) -> Option<usize> {
    query.slots.iter().position(|slot| slot.bound_reference.is_some())
}

/// Same slot count on the main component and the instance
///
/// A single pending assignment goes to the first slot; with several, the
/// i-th assignment goes to the i-th slot.
pub fn positional(query: &SlotQuery<'_>) -> Option<usize> {
    let main = query.main_slots?;
    if main.len() != query.slots.len() || query.slots.is_empty() {
        return None;
    }
    if query.pending == 1 {
        return Some(0);
    }
    (query.index < query.slots.len()).then_some(query.index)
}

pub fn first_slot(query: &SlotQuery<'_>) -> Option<usize> {
    (!query.slots.is_empty()).then_some(0)
}
