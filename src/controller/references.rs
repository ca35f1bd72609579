//! Registry of RemotePhaseReferences kept in ObjectSet status

use crate::crd::RemotePhaseReference;

/// Add a reference, replacing an existing entry with the same name in place.
pub fn upsert_remote_phase(
    mut refs: Vec<RemotePhaseReference>,
    reference: RemotePhaseReference,
) -> Vec<RemotePhaseReference> {
    match refs.iter_mut().find(|r| r.name == reference.name) {
        Some(existing) => *existing = reference,
        None => refs.push(reference),
    }
    refs
}
