//! Shared types used across ObjectSet CRDs

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reporting whether an object set or phase is available
pub const CONDITION_AVAILABLE: &str = "Available";

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Available, or a prefixed `example.com/Ready`)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Generation of the owning object this condition was computed from
    #[serde(default)]
    pub observed_generation: i64,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the condition transitioned
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            observed_generation: 0,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Set the observed generation and return self for chaining
    pub fn observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = generation;
        self
    }

    /// Returns true if the condition status is True
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Lifecycle state of an ObjectSet
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ObjectSetLifecycleState {
    /// Objects are reconciled
    #[default]
    Active,
    /// Reconciliation is stopped, objects are left as they are
    Paused,
    /// The revision has been superseded
    Archived,
}

/// A single object managed by a phase
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ObjectSetObject {
    /// Full object manifest
    pub object: serde_json::Value,
}

/// One phase of an object set template
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetTemplatePhase {
    /// Name of the phase
    pub name: String,

    /// Class of the phase. When set, the phase is delegated to an
    /// ObjectSetPhase handled by the controller registered for that class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Objects belonging to this phase
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ObjectSetObject>,
}

impl ObjectSetTemplatePhase {
    /// Create an inline phase with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the class and return self for chaining
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Returns true if this phase is handled by a remote controller
    pub fn is_remote(&self) -> bool {
        self.class.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Selects objects a probe applies to
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSelector {
    /// Group and kind of selected objects
    pub kind: ProbeKindSelector,
    /// Label selector over selected objects (`key=value,...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Group/kind pair selecting objects
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ProbeKindSelector {
    /// API group
    #[serde(default)]
    pub group: String,
    /// Kind
    pub kind: String,
}

/// Availability probe definition, copied verbatim onto phases
///
/// The probe expressions are evaluated by the phase controller; this
/// operator only carries them.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ObjectSetProbe {
    /// Objects the probes apply to
    pub selector: ProbeSelector,
    /// Probe definitions
    pub probes: Vec<serde_json::Value>,
}

/// Reference to the previous revision of an object set
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct PreviousRevisionReference {
    /// Name of the previous revision
    pub name: String,
}

/// Weak reference from an ObjectSet to one of its ObjectSetPhases
///
/// Used for status reporting only; ownership is expressed by owner references.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct RemotePhaseReference {
    /// Name of the ObjectSetPhase
    pub name: String,
    /// UID of the ObjectSetPhase
    pub uid: String,
}

impl RemotePhaseReference {
    /// Create a new reference
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
        }
    }
}

/// Reference to an object actively controlled by a phase
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ControlledObjectReference {
    /// Object kind
    pub kind: String,
    /// Object API group
    #[serde(default)]
    pub group: String,
    /// Object name
    pub name: String,
    /// Object namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Phases and probes shared by ObjectSets and package templates
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSetTemplateSpec {
    /// Ordered list of phases
    #[serde(default)]
    pub phases: Vec<ObjectSetTemplatePhase>,

    /// Availability probes applied to all phases
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub availability_probes: Vec<ObjectSetProbe>,
}
