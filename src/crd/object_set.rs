//! ObjectSet and ClusterObjectSet Custom Resource Definitions
//!
//! An ObjectSet describes one revision of a deployment as an ordered list of
//! phases. Phases carrying a class are delegated to ObjectSetPhase children.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{
    Condition, ControlledObjectReference, ObjectSetLifecycleState, ObjectSetTemplateSpec,
    PreviousRevisionReference, RemotePhaseReference,
};

/// Specification for an ObjectSet
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "package-operator.run",
    version = "v1alpha1",
    kind = "ObjectSet",
    plural = "objectsets",
    shortname = "os",
    status = "ObjectSetStatus",
    namespaced,
    printcolumn = r#"{"name":"Revision","type":"integer","jsonPath":".spec.revision"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.conditions[?(@.type==\"Available\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetSpec {
    /// Phases and probes of this revision
    #[serde(flatten)]
    pub template: ObjectSetTemplateSpec,

    /// Desired lifecycle state
    #[serde(default)]
    pub lifecycle_state: ObjectSetLifecycleState,

    /// Revision number, assigned by whatever created this ObjectSet
    #[serde(default)]
    pub revision: i64,

    /// Previous revisions of this ObjectSet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous: Vec<PreviousRevisionReference>,
}

/// Specification for a ClusterObjectSet
///
/// Same shape as [`ObjectSetSpec`], for cluster-scoped deployments.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "package-operator.run",
    version = "v1alpha1",
    kind = "ClusterObjectSet",
    plural = "clusterobjectsets",
    shortname = "cos",
    status = "ObjectSetStatus",
    printcolumn = r#"{"name":"Revision","type":"integer","jsonPath":".spec.revision"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct ClusterObjectSetSpec {
    /// Shared ObjectSet fields
    #[serde(flatten)]
    pub inner: ObjectSetSpec,
}

/// Status shared by ObjectSet and ClusterObjectSet
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetStatus {
    /// Conditions representing the object set state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// ObjectSetPhases belonging to this object set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_phases: Vec<RemotePhaseReference>,

    /// Objects actively controlled by this object set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controller_of: Vec<ControlledObjectReference>,
}
