//! Remote phase reconciliation
//!
//! Phases with a class are not reconciled by this operator directly. Instead
//! each one is materialized as an ObjectSetPhase named
//! `<object set name>-<phase name>`, which an external controller picks up.
//! This module keeps those objects in line with their ObjectSet:
//!
//! - Creates the ObjectSetPhase when missing. Everything but `paused` is
//!   immutable after creation, so pausing is the only field converged later.
//! - Records the phase in the ObjectSet's `status.remotePhases`.
//! - Mirrors phase conditions onto the ObjectSet.
//! - Turns the phase's `Available` condition into a [`ProbingResult`].
//! - On teardown, deletes the phase and reports completion only once the
//!   object is really gone.

use std::sync::Arc;

use kube::ResourceExt;
use tracing::{debug, info, instrument};

use super::client::ObjectSetClient;
use super::conditions::{find_status_condition, map_conditions};
use super::generic::{GenericObjectSet, GenericObjectSetPhase, ObjectKey, ObjectSetScope};
use super::probing::ProbingResult;
use super::references::upsert_remote_phase;
use crate::crd::{
    ControlledObjectReference, ObjectSetTemplatePhase, RemotePhaseReference, CONDITION_AVAILABLE,
};
use crate::Error;

/// Failed-probe reason used while a phase has not reported availability for
/// its current generation
pub const NO_STATUS_PROBE_FAILURE: &str = "no status reported";

/// Name of the ObjectSetPhase backing `phase_name` of `object_set_name`
pub fn object_set_phase_name(object_set_name: &str, phase_name: &str) -> String {
    format!("{}-{}", object_set_name, phase_name)
}

/// Merge patch setting `spec.paused`, guarded by the observed resource version
pub fn pause_patch(paused: bool, resource_version: Option<&str>) -> serde_json::Value {
    let mut patch = serde_json::json!({
        "spec": {
            "paused": paused
        }
    });
    if let Some(rv) = resource_version {
        patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
    }
    patch
}

/// Reconciles ObjectSetPhase objects for a parent ObjectSet
pub struct RemotePhaseReconciler {
    client: Arc<dyn ObjectSetClient>,
    scope: ObjectSetScope,
}

impl RemotePhaseReconciler {
    /// Create a reconciler producing phase objects of the given scope
    pub fn new(client: Arc<dyn ObjectSetClient>, scope: ObjectSetScope) -> Self {
        Self { client, scope }
    }

    /// Compute the ObjectSetPhase that should exist for `phase`.
    ///
    /// Labels and annotations are copied from the ObjectSet as they are.
    /// Only the paused flag itself is carried forward. Nothing records
    /// whether a phase was paused on its own, so an active ObjectSet always
    /// wants its phases unpaused.
    pub fn desired_object_set_phase<O: GenericObjectSet>(
        &self,
        object_set: &O,
        phase: &ObjectSetTemplatePhase,
    ) -> Result<GenericObjectSetPhase, Error> {
        let kind = self.scope.phase_kind();
        let object_set_name = object_set.meta().name.clone().unwrap_or_default();
        if object_set_name.is_empty() {
            return Err(Error::construction(kind, "owning object set has no name"));
        }

        let owner = object_set.controller_owner_ref(&()).ok_or_else(|| {
            Error::construction(
                kind,
                format!("object set {} has no uid to own {}", object_set_name, kind),
            )
        })?;

        let mut desired = self.scope.new_phase();
        let meta = desired.meta_mut();
        meta.name = Some(object_set_phase_name(&object_set_name, &phase.name));
        meta.namespace = object_set.namespace();
        meta.labels = object_set.meta().labels.clone();
        meta.annotations = object_set.meta().annotations.clone();
        meta.owner_references = Some(vec![owner]);

        desired.set_phase(phase.clone());
        desired.set_availability_probes(object_set.availability_probes().to_vec());
        desired.set_revision(object_set.revision());
        desired.set_previous(object_set.previous().to_vec());
        if object_set.is_paused() {
            desired.set_paused(true);
        }

        Ok(desired)
    }

    /// Drive the ObjectSetPhase for `phase` towards its desired state.
    ///
    /// Registers the phase in the ObjectSet's status and mirrors its
    /// conditions; the caller persists the ObjectSet status. Returns the
    /// objects the phase reports as active and its probing result. Inline
    /// phases (no class) are not handled here and yield empty results.
    #[instrument(
        skip_all,
        fields(object_set = %object_set.name_any(), phase = %phase.name)
    )]
    pub async fn reconcile<O: GenericObjectSet>(
        &self,
        object_set: &mut O,
        phase: &ObjectSetTemplatePhase,
    ) -> Result<(Vec<ControlledObjectReference>, ProbingResult), Error> {
        if !phase.is_remote() {
            return Ok((Vec::new(), ProbingResult::default()));
        }

        let desired = self.desired_object_set_phase(object_set, phase)?;

        let mut current = match self
            .client
            .get_phase(self.scope, &desired.key())
            .await
            .map_err(|e| e.context("getting existing ObjectSetPhase"))?
        {
            Some(current) => current,
            None => {
                info!(name = %desired.key(), "creating ObjectSetPhase");
                self.client
                    .create_phase(&desired)
                    .await
                    .map_err(|e| e.context("creating ObjectSetPhase"))?
            }
        };

        let refs = upsert_remote_phase(
            object_set.remote_phases().to_vec(),
            RemotePhaseReference::new(current.name(), current.uid()),
        );
        object_set.set_remote_phases(refs);

        // The patch bumps the phase's generation, so conditions are judged
        // against the patched object.
        if current.is_paused() != desired.is_paused() {
            info!(paused = desired.is_paused(), "updating ObjectSetPhase pause state");
            let patch = pause_patch(desired.is_paused(), current.resource_version());
            current = self
                .client
                .patch_phase(&current, &patch)
                .await
                .map_err(|e| e.context("patching ObjectSetPhase"))?;
        }

        let generation = object_set.generation();
        map_conditions(
            current.generation(),
            current.conditions(),
            generation,
            object_set.conditions_mut(),
        );

        let active_objects = current.status_controller_of();
        let probing = match find_status_condition(current.conditions(), CONDITION_AVAILABLE) {
            Some(available) if available.observed_generation == current.generation() => {
                if available.is_true() {
                    ProbingResult::default()
                } else {
                    ProbingResult::failed(&phase.name, vec![available.message.clone()])
                }
            }
            _ => {
                debug!(
                    generation = current.generation(),
                    "ObjectSetPhase has not reported availability yet"
                );
                ProbingResult::failed(&phase.name, vec![NO_STATUS_PROBE_FAILURE.to_string()])
            }
        };

        Ok((active_objects, probing))
    }

    /// Ensure the ObjectSetPhase for `phase` is deleted.
    ///
    /// Returns `Ok(true)` only once the object can no longer be found. The
    /// pass that issues the delete always returns `Ok(false)`, since the
    /// object may linger behind its finalizers.
    #[instrument(
        skip_all,
        fields(object_set = %object_set.name_any(), phase = %phase.name)
    )]
    pub async fn teardown<O: GenericObjectSet>(
        &self,
        object_set: &O,
        phase: &ObjectSetTemplatePhase,
    ) -> Result<bool, Error> {
        let key = ObjectKey::new(
            object_set_phase_name(&object_set.name_any(), &phase.name),
            object_set.namespace(),
        );

        let result = self.teardown_phase(&key).await;
        info!(
            phase = %phase.name,
            cleanup_done = matches!(result, Ok(true)),
            "teardown of remote phase"
        );
        result
    }

    async fn teardown_phase(&self, key: &ObjectKey) -> Result<bool, Error> {
        let Some(mut current) = self
            .client
            .get_phase(self.scope, key)
            .await
            .map_err(|e| e.context("getting ObjectSetPhase"))?
        else {
            return Ok(true);
        };

        // Objects in a terminating namespace are collected regardless of
        // finalizers, and the finalizer owner may be terminating with them.
        if let Some(namespace) = &key.namespace {
            let ns = self
                .client
                .get_namespace(namespace)
                .await
                .map_err(|e| e.context("getting Namespace of ObjectSetPhase"))?;

            if ns.metadata.deletion_timestamp.is_some() {
                info!(
                    namespace = %namespace,
                    "removing finalizers from ObjectSetPhase since containing namespace is in deletion"
                );
                current.meta_mut().finalizers = None;
                current = self
                    .client
                    .update_phase(&current)
                    .await
                    .map_err(|e| e.context("removing finalizers from ObjectSetPhase"))?;
            }
        }

        match self.client.delete_phase(&current).await {
            Ok(()) => Ok(false),
            Err(e) if e.is_not_found() => Ok(true),
            Err(e) => Err(e.context("deleting ObjectSetPhase")),
        }
    }
}
