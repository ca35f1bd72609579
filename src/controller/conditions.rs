//! Status condition helpers
//!
//! [`map_conditions`] mirrors a child's conditions onto its parent. A mirrored
//! condition is stamped with the parent's generation so the parent's own
//! staleness checks stay relative to the parent.

use chrono::Utc;
use tracing::trace;

use crate::crd::{Condition, CONDITION_AVAILABLE};

/// Find a condition by type
pub fn find_status_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Insert or update a condition by type.
///
/// The transition time only moves when the status actually changes.
pub fn set_status_condition(conditions: &mut Vec<Condition>, new: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == new.type_) {
        Some(existing) => {
            if existing.status != new.status {
                existing.status = new.status;
                existing.last_transition_time = Utc::now();
            }
            existing.reason = new.reason;
            existing.message = new.message;
            existing.observed_generation = new.observed_generation;
        }
        None => conditions.push(new),
    }
}

/// Returns true if the condition type is mirrored from children to parents.
///
/// Mirrored are the well-known `Available` condition and every
/// domain-prefixed condition (`example.com/Ready`) produced by probes.
pub fn is_mapped_condition(type_: &str) -> bool {
    type_ == CONDITION_AVAILABLE || type_.contains('/')
}

/// Copy mapped conditions from a source object onto a target object.
///
/// Conditions computed for an older source generation are skipped. Target
/// conditions with no counterpart on the source are left as they are.
pub fn map_conditions(
    source_generation: i64,
    source_conditions: &[Condition],
    target_generation: i64,
    target_conditions: &mut Vec<Condition>,
) {
    for condition in source_conditions {
        if !is_mapped_condition(&condition.type_) {
            continue;
        }
        if condition.observed_generation != source_generation {
            trace!(
                condition = %condition.type_,
                observed = condition.observed_generation,
                generation = source_generation,
                "skipping outdated condition"
            );
            continue;
        }

        set_status_condition(
            target_conditions,
            Condition {
                observed_generation: target_generation,
                ..condition.clone()
            },
        );
    }
}
