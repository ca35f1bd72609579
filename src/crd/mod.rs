//! Custom Resource Definitions for the ObjectSet operator
//!
//! This module contains all CRD definitions used by the operator.

mod object_set;
mod object_set_phase;
mod types;

pub use object_set::{ClusterObjectSet, ClusterObjectSetSpec, ObjectSet, ObjectSetSpec, ObjectSetStatus};
pub use object_set_phase::{
    ClusterObjectSetPhase, ClusterObjectSetPhaseSpec, ObjectSetPhase, ObjectSetPhaseSpec,
    ObjectSetPhaseStatus,
};
pub use types::{
    Condition, ConditionStatus, ControlledObjectReference, ObjectSetLifecycleState,
    ObjectSetObject, ObjectSetProbe, ObjectSetTemplatePhase, ObjectSetTemplateSpec,
    PreviousRevisionReference, ProbeKindSelector, ProbeSelector, RemotePhaseReference,
    CONDITION_AVAILABLE,
};
