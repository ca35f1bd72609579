//! Scope-independent access to ObjectSets and ObjectSetPhases
//!
//! ObjectSets exist as namespaced `ObjectSet` and cluster-scoped
//! `ClusterObjectSet`; each is served by the matching phase kind. The
//! reconcilers work against [`GenericObjectSet`] and [`GenericObjectSetPhase`]
//! so the same state machine drives both scopes.

use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::{
    ClusterObjectSet, ClusterObjectSetPhase, ClusterObjectSetPhaseSpec, Condition,
    ControlledObjectReference, ObjectSet, ObjectSetLifecycleState, ObjectSetPhase,
    ObjectSetPhaseSpec, ObjectSetPhaseStatus, ObjectSetProbe, ObjectSetSpec, ObjectSetStatus,
    ObjectSetTemplatePhase, PreviousRevisionReference, RemotePhaseReference,
};

/// Resource scope, selecting which phase kind backs an object set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectSetScope {
    /// ObjectSet / ObjectSetPhase
    Namespaced,
    /// ClusterObjectSet / ClusterObjectSetPhase
    Cluster,
}

impl ObjectSetScope {
    /// Create an empty phase object of this scope
    pub fn new_phase(self) -> GenericObjectSetPhase {
        match self {
            Self::Namespaced => GenericObjectSetPhase::Namespaced(ObjectSetPhase::new(
                "",
                ObjectSetPhaseSpec::default(),
            )),
            Self::Cluster => GenericObjectSetPhase::Cluster(ClusterObjectSetPhase::new(
                "",
                ClusterObjectSetPhaseSpec::default(),
            )),
        }
    }

    /// Kind of the phase objects of this scope
    pub fn phase_kind(self) -> &'static str {
        match self {
            Self::Namespaced => "ObjectSetPhase",
            Self::Cluster => "ClusterObjectSetPhase",
        }
    }
}

/// Name and optional namespace identifying an object
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// Object name
    pub name: String,
    /// Object namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
}

impl ObjectKey {
    /// Create a key
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()),
        }
    }

    /// Key of an existing resource
    pub fn from_resource<K: Resource>(resource: &K) -> Self {
        Self::new(resource.name_any(), resource.namespace())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Common capability surface of ObjectSet and ClusterObjectSet
pub trait GenericObjectSet:
    Resource<DynamicType = ()> + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Scope of this kind and of the phases it owns
    const SCOPE: ObjectSetScope;

    /// Shared spec fields
    fn object_set_spec(&self) -> &ObjectSetSpec;

    /// Status, if any has been reported yet
    fn object_set_status(&self) -> Option<&ObjectSetStatus>;

    /// Status, created empty if absent
    fn object_set_status_mut(&mut self) -> &mut ObjectSetStatus;

    /// Ordered phases
    fn phases(&self) -> &[ObjectSetTemplatePhase] {
        &self.object_set_spec().template.phases
    }

    /// Availability probes applied to all phases
    fn availability_probes(&self) -> &[ObjectSetProbe] {
        &self.object_set_spec().template.availability_probes
    }

    /// Revision number
    fn revision(&self) -> i64 {
        self.object_set_spec().revision
    }

    /// Previous revisions
    fn previous(&self) -> &[PreviousRevisionReference] {
        &self.object_set_spec().previous
    }

    /// True if the lifecycle state is Paused
    fn is_paused(&self) -> bool {
        self.object_set_spec().lifecycle_state == ObjectSetLifecycleState::Paused
    }

    /// Metadata generation, 0 when unset
    fn generation(&self) -> i64 {
        self.meta().generation.unwrap_or(0)
    }

    /// Status conditions
    fn conditions(&self) -> &[Condition] {
        self.object_set_status()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Mutable status conditions
    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.object_set_status_mut().conditions
    }

    /// References to remote phases
    fn remote_phases(&self) -> &[RemotePhaseReference] {
        self.object_set_status()
            .map(|s| s.remote_phases.as_slice())
            .unwrap_or_default()
    }

    /// Replace the references to remote phases
    fn set_remote_phases(&mut self, refs: Vec<RemotePhaseReference>) {
        self.object_set_status_mut().remote_phases = refs;
    }
}

impl GenericObjectSet for ObjectSet {
    const SCOPE: ObjectSetScope = ObjectSetScope::Namespaced;

    fn object_set_spec(&self) -> &ObjectSetSpec {
        &self.spec
    }

    fn object_set_status(&self) -> Option<&ObjectSetStatus> {
        self.status.as_ref()
    }

    fn object_set_status_mut(&mut self) -> &mut ObjectSetStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

impl GenericObjectSet for ClusterObjectSet {
    const SCOPE: ObjectSetScope = ObjectSetScope::Cluster;

    fn object_set_spec(&self) -> &ObjectSetSpec {
        &self.spec.inner
    }

    fn object_set_status(&self) -> Option<&ObjectSetStatus> {
        self.status.as_ref()
    }

    fn object_set_status_mut(&mut self) -> &mut ObjectSetStatus {
        self.status.get_or_insert_with(Default::default)
    }
}

/// An ObjectSetPhase of either scope
#[derive(Clone, Debug, PartialEq)]
pub enum GenericObjectSetPhase {
    /// Namespaced ObjectSetPhase
    Namespaced(ObjectSetPhase),
    /// Cluster-scoped ClusterObjectSetPhase
    Cluster(ClusterObjectSetPhase),
}

impl GenericObjectSetPhase {
    /// Scope of this phase
    pub fn scope(&self) -> ObjectSetScope {
        match self {
            Self::Namespaced(_) => ObjectSetScope::Namespaced,
            Self::Cluster(_) => ObjectSetScope::Cluster,
        }
    }

    /// Object metadata
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Namespaced(p) => &p.metadata,
            Self::Cluster(p) => &p.metadata,
        }
    }

    /// Mutable object metadata
    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Namespaced(p) => &mut p.metadata,
            Self::Cluster(p) => &mut p.metadata,
        }
    }

    /// Shared spec fields
    pub fn spec(&self) -> &ObjectSetPhaseSpec {
        match self {
            Self::Namespaced(p) => &p.spec,
            Self::Cluster(p) => &p.spec.inner,
        }
    }

    /// Mutable shared spec fields
    pub fn spec_mut(&mut self) -> &mut ObjectSetPhaseSpec {
        match self {
            Self::Namespaced(p) => &mut p.spec,
            Self::Cluster(p) => &mut p.spec.inner,
        }
    }

    /// Reported status, if any
    pub fn status(&self) -> Option<&ObjectSetPhaseStatus> {
        match self {
            Self::Namespaced(p) => p.status.as_ref(),
            Self::Cluster(p) => p.status.as_ref(),
        }
    }

    /// Key identifying this object
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.name(), self.meta().namespace.clone())
    }

    /// Object name
    pub fn name(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    /// Object UID, empty until the object has been persisted
    pub fn uid(&self) -> String {
        self.meta().uid.clone().unwrap_or_default()
    }

    /// Metadata generation, 0 when unset
    pub fn generation(&self) -> i64 {
        self.meta().generation.unwrap_or(0)
    }

    /// Resource version observed when this object was read
    pub fn resource_version(&self) -> Option<&str> {
        self.meta().resource_version.as_deref()
    }

    /// Set the phase this object represents
    pub fn set_phase(&mut self, phase: ObjectSetTemplatePhase) {
        self.spec_mut().phase = phase;
    }

    /// Set the availability probes
    pub fn set_availability_probes(&mut self, probes: Vec<ObjectSetProbe>) {
        self.spec_mut().availability_probes = probes;
    }

    /// Set the revision
    pub fn set_revision(&mut self, revision: i64) {
        self.spec_mut().revision = revision;
    }

    /// Set the previous revisions
    pub fn set_previous(&mut self, previous: Vec<PreviousRevisionReference>) {
        self.spec_mut().previous = previous;
    }

    /// True if reconciliation of the phase is paused
    pub fn is_paused(&self) -> bool {
        self.spec().paused
    }

    /// Pause or unpause the phase
    pub fn set_paused(&mut self, paused: bool) {
        self.spec_mut().paused = paused;
    }

    /// Reported status conditions
    pub fn conditions(&self) -> &[Condition] {
        self.status()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Objects the phase reports as actively controlled
    pub fn status_controller_of(&self) -> Vec<ControlledObjectReference> {
        self.status()
            .map(|s| s.controller_of.clone())
            .unwrap_or_default()
    }
}
