//! Controllers for ObjectSet CRDs
//!
//! The ObjectSet controller drives each phase through [`RemotePhaseReconciler`],
//! which owns the lifecycle of the phase's ObjectSetPhase object.

mod client;
mod conditions;
mod generic;
mod object_set;
mod probing;
mod references;
mod remote_phase;

pub use client::{finalizers_patch, KubeObjectSetClient, ObjectSetClient};
pub use conditions::{find_status_condition, is_mapped_condition, map_conditions, set_status_condition};
pub use generic::{GenericObjectSet, GenericObjectSetPhase, ObjectKey, ObjectSetScope};
pub use object_set::{
    error_policy, reconcile, Context, OBJECT_SET_FINALIZER, REASON_AVAILABLE,
    REASON_PROBE_FAILURE, TEARDOWN_REQUEUE,
};
pub use probing::ProbingResult;
pub use references::upsert_remote_phase;
pub use remote_phase::{
    object_set_phase_name, pause_patch, RemotePhaseReconciler, NO_STATUS_PROBE_FAILURE,
};
