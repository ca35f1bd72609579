//! In-memory object store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

use objectset_operator::controller::{
    GenericObjectSetPhase, ObjectKey, ObjectSetClient, ObjectSetScope,
};
use objectset_operator::crd::{
    Condition, ControlledObjectReference, ObjectSetPhaseStatus, ObjectSetStatus,
};
use objectset_operator::error::api_error;
use objectset_operator::Error;

/// A recorded store call
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Get(String),
    Create(String),
    Update(String),
    Patch(String, serde_json::Value),
    Delete(String),
    GetNamespace(String),
    PatchStatus(String),
    PatchFinalizers(String, Vec<String>),
}

#[derive(Default)]
struct State {
    phases: HashMap<ObjectKey, GenericObjectSetPhase>,
    namespaces: HashMap<String, Namespace>,
    statuses: HashMap<ObjectKey, ObjectSetStatus>,
    calls: Vec<Call>,
    next_uid: u64,
    next_resource_version: u64,
}

impl State {
    fn resource_version(&mut self) -> String {
        self.next_resource_version += 1;
        self.next_resource_version.to_string()
    }
}

/// Object store keeping phases, namespaces and ObjectSet statuses in memory
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace, optionally already terminating
    pub fn add_namespace(&self, name: &str, terminating: bool) {
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                deletion_timestamp: terminating.then(|| Time(chrono::Utc::now())),
                ..Default::default()
            },
            ..Default::default()
        };
        self.state
            .lock()
            .unwrap()
            .namespaces
            .insert(name.to_string(), namespace);
    }

    /// Stored phase, if any
    pub fn phase(&self, key: &ObjectKey) -> Option<GenericObjectSetPhase> {
        self.state.lock().unwrap().phases.get(key).cloned()
    }

    /// Report status on a phase as its controller would
    pub fn report_status(
        &self,
        key: &ObjectKey,
        conditions: Vec<Condition>,
        controller_of: Vec<ControlledObjectReference>,
    ) {
        let mut state = self.state.lock().unwrap();
        let resource_version = state.resource_version();
        let phase = state.phases.get_mut(key).expect("phase exists");
        phase.meta_mut().resource_version = Some(resource_version);
        let status = Some(ObjectSetPhaseStatus {
            conditions,
            controller_of,
        });
        match phase {
            GenericObjectSetPhase::Namespaced(p) => p.status = status,
            GenericObjectSetPhase::Cluster(p) => p.status = status,
        }
    }

    /// Add a finalizer to a stored phase as a foreign controller would
    pub fn add_finalizer(&self, key: &ObjectKey, finalizer: &str) {
        let mut state = self.state.lock().unwrap();
        let resource_version = state.resource_version();
        let meta = state.phases.get_mut(key).expect("phase exists").meta_mut();
        meta.finalizers
            .get_or_insert_with(Vec::new)
            .push(finalizer.to_string());
        meta.resource_version = Some(resource_version);
    }

    /// Remove all finalizers as their owner would, completing a pending deletion
    pub fn release_finalizers(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let Some(phase) = state.phases.get_mut(key) else {
            return;
        };
        phase.meta_mut().finalizers = None;
        if phase.meta().deletion_timestamp.is_some() {
            state.phases.remove(key);
        }
    }

    /// Bump the generation of a phase as a spec change would
    pub fn bump_generation(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let meta = state.phases.get_mut(key).expect("phase exists").meta_mut();
        meta.generation = Some(meta.generation.unwrap_or(0) + 1);
    }

    /// Last status written for an ObjectSet
    pub fn object_set_status(&self, key: &ObjectKey) -> Option<ObjectSetStatus> {
        self.state.lock().unwrap().statuses.get(key).cloned()
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create(_)))
    }

    pub fn patches(&self) -> usize {
        self.count(|c| matches!(c, Call::Patch(..)))
    }

    pub fn deletes(&self) -> usize {
        self.count(|c| matches!(c, Call::Delete(_)))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }
}

fn not_found(key: &ObjectKey) -> Error {
    api_error(404, "NotFound", format!("{} not found", key)).into()
}

fn conflict(key: &ObjectKey) -> Error {
    api_error(409, "Conflict", format!("{} has been modified", key)).into()
}

#[async_trait]
impl ObjectSetClient for FakeStore {
    async fn get_phase(
        &self,
        _scope: ObjectSetScope,
        key: &ObjectKey,
    ) -> Result<Option<GenericObjectSetPhase>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get(key.to_string()));
        Ok(state.phases.get(key).cloned())
    }

    async fn create_phase(
        &self,
        phase: &GenericObjectSetPhase,
    ) -> Result<GenericObjectSetPhase, Error> {
        let key = phase.key();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(key.to_string()));
        if state.phases.contains_key(&key) {
            return Err(api_error(409, "AlreadyExists", format!("{} already exists", key)).into());
        }

        state.next_uid += 1;
        let uid = format!("uid-{}", state.next_uid);
        let resource_version = state.resource_version();
        let mut created = phase.clone();
        let meta = created.meta_mut();
        meta.uid = Some(uid);
        meta.generation = Some(1);
        meta.resource_version = Some(resource_version);
        state.phases.insert(key, created.clone());
        Ok(created)
    }

    async fn update_phase(
        &self,
        phase: &GenericObjectSetPhase,
    ) -> Result<GenericObjectSetPhase, Error> {
        let key = phase.key();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(key.to_string()));
        let stored_version = match state.phases.get(&key) {
            Some(stored) => stored.resource_version().map(str::to_string),
            None => return Err(not_found(&key)),
        };
        if phase.resource_version().map(str::to_string) != stored_version {
            return Err(conflict(&key));
        }

        let mut updated = phase.clone();
        updated.meta_mut().resource_version = Some(state.resource_version());
        let released = updated.meta().deletion_timestamp.is_some()
            && updated.meta().finalizers.as_deref().unwrap_or_default().is_empty();
        if released {
            state.phases.remove(&key);
        } else {
            state.phases.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn patch_phase(
        &self,
        phase: &GenericObjectSetPhase,
        patch: &serde_json::Value,
    ) -> Result<GenericObjectSetPhase, Error> {
        let key = phase.key();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Patch(key.to_string(), patch.clone()));
        let resource_version = state.resource_version();
        let stored = state.phases.get_mut(&key).ok_or_else(|| not_found(&key))?;

        if let Some(expected) = patch.pointer("/metadata/resourceVersion").and_then(|v| v.as_str())
        {
            if stored.resource_version() != Some(expected) {
                return Err(conflict(&key));
            }
        }
        if let Some(paused) = patch.pointer("/spec/paused").and_then(|v| v.as_bool()) {
            stored.set_paused(paused);
            let meta = stored.meta_mut();
            meta.generation = Some(meta.generation.unwrap_or(0) + 1);
        }
        stored.meta_mut().resource_version = Some(resource_version);
        Ok(stored.clone())
    }

    async fn delete_phase(&self, phase: &GenericObjectSetPhase) -> Result<(), Error> {
        let key = phase.key();
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(key.to_string()));
        let stored = state.phases.get_mut(&key).ok_or_else(|| not_found(&key))?;

        if stored.meta().finalizers.as_deref().unwrap_or_default().is_empty() {
            state.phases.remove(&key);
        } else if stored.meta().deletion_timestamp.is_none() {
            stored.meta_mut().deletion_timestamp = Some(Time(chrono::Utc::now()));
        }
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::GetNamespace(name.to_string()));
        state
            .namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(&ObjectKey::new(name, None)))
    }

    async fn patch_object_set_status(
        &self,
        _scope: ObjectSetScope,
        key: &ObjectKey,
        status: &ObjectSetStatus,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PatchStatus(key.to_string()));
        state.statuses.insert(key.clone(), status.clone());
        Ok(())
    }

    async fn patch_object_set_finalizers(
        &self,
        _scope: ObjectSetScope,
        key: &ObjectKey,
        finalizers: &[String],
        _resource_version: Option<String>,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::PatchFinalizers(key.to_string(), finalizers.to_vec()));
        Ok(())
    }
}
