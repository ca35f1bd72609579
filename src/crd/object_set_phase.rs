//! ObjectSetPhase and ClusterObjectSetPhase Custom Resource Definitions
//!
//! An ObjectSetPhase is the remote representation of a single phase of an
//! ObjectSet. It is created by the ObjectSet controller and reconciled by an
//! external controller selected by the phase class.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    Condition, ControlledObjectReference, ObjectSetProbe, ObjectSetTemplatePhase,
    PreviousRevisionReference,
};

/// Specification for an ObjectSetPhase
///
/// Everything except `paused` is immutable once created.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "package-operator.run",
    version = "v1alpha1",
    kind = "ObjectSetPhase",
    plural = "objectsetphases",
    shortname = "osp",
    status = "ObjectSetPhaseStatus",
    derive = "PartialEq",
    namespaced,
    printcolumn = r#"{"name":"Revision","type":"integer","jsonPath":".spec.revision"}"#,
    printcolumn = r#"{"name":"Paused","type":"boolean","jsonPath":".spec.paused"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetPhaseSpec {
    /// Disables reconciliation of the phase
    #[serde(default)]
    pub paused: bool,

    /// Revision of the owning ObjectSet
    #[serde(default)]
    pub revision: i64,

    /// Previous revisions of the owning ObjectSet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous: Vec<PreviousRevisionReference>,

    /// Availability probes inherited from the owning ObjectSet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availability_probes: Vec<ObjectSetProbe>,

    /// The phase this object represents
    #[serde(flatten)]
    pub phase: ObjectSetTemplatePhase,
}

/// Specification for a ClusterObjectSetPhase
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "package-operator.run",
    version = "v1alpha1",
    kind = "ClusterObjectSetPhase",
    plural = "clusterobjectsetphases",
    shortname = "cosp",
    status = "ObjectSetPhaseStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Revision","type":"integer","jsonPath":".spec.revision"}"#,
    printcolumn = r#"{"name":"Paused","type":"boolean","jsonPath":".spec.paused"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct ClusterObjectSetPhaseSpec {
    /// Shared ObjectSetPhase fields
    #[serde(flatten)]
    pub inner: ObjectSetPhaseSpec,
}

/// Status shared by ObjectSetPhase and ClusterObjectSetPhase
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetPhaseStatus {
    /// Conditions reported by the phase controller
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Objects actively controlled by this phase
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controller_of: Vec<ControlledObjectReference>,
}
