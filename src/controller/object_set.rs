//! ObjectSet and ClusterObjectSet controller
//!
//! One pass per event, driving every phase of the ObjectSet through the
//! remote phase reconciler and folding the results into the ObjectSet's
//! `Available` condition. While the ObjectSet is being deleted its phases
//! are torn down, and the finalizer is released only once all are gone.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument};

use super::client::{KubeObjectSetClient, ObjectSetClient};
use super::conditions::set_status_condition;
use super::generic::{GenericObjectSet, ObjectKey};
use super::probing::ProbingResult;
use super::remote_phase::RemotePhaseReconciler;
use crate::backoff::FailureTracker;
use crate::config::ControllerConfig;
use crate::crd::{Condition, ConditionStatus, CONDITION_AVAILABLE};
use crate::Error;

/// Finalizer guarding ObjectSets until their phases are torn down
pub const OBJECT_SET_FINALIZER: &str = "package-operator.run/cached";

/// Reason of the `Available` condition when a phase is not available
pub const REASON_PROBE_FAILURE: &str = "ProbeFailure";

/// Reason of the `Available` condition when all phases are available
pub const REASON_AVAILABLE: &str = "Available";

/// Requeue delay while phases are still being deleted
pub const TEARDOWN_REQUEUE: Duration = Duration::from_secs(5);

const AVAILABLE_MESSAGE: &str = "Object is available and passes all probes.";

/// Controller context shared across reconciliation passes
pub struct Context {
    /// Object store access (trait object for testability)
    pub client: Arc<dyn ObjectSetClient>,
    /// Controller configuration
    pub config: ControllerConfig,
    /// Consecutive failures per ObjectSet, driving the error policy
    pub failures: FailureTracker,
}

impl Context {
    /// Create a context backed by the given Kubernetes client
    pub fn new(client: Client, config: ControllerConfig) -> Self {
        Self::with_client(Arc::new(KubeObjectSetClient::new(client)), config)
    }

    /// Create a context around any [`ObjectSetClient`]
    pub fn with_client(client: Arc<dyn ObjectSetClient>, config: ControllerConfig) -> Self {
        let failures = FailureTracker::new(config.backoff());
        Self {
            client,
            config,
            failures,
        }
    }
}

/// Reconcile an ObjectSet or ClusterObjectSet
///
/// Returns the requeue action for a completed pass. Any error aborts the pass
/// and is handed to [`error_policy`].
#[instrument(skip(object_set, ctx), fields(object_set = %object_set.name_any()))]
pub async fn reconcile<O: GenericObjectSet>(
    object_set: Arc<O>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    let key = ObjectKey::from_resource(object_set.as_ref());
    let phases = RemotePhaseReconciler::new(ctx.client.clone(), O::SCOPE);

    let action = if object_set.meta().deletion_timestamp.is_some() {
        teardown(object_set.as_ref(), &key, &phases, &ctx).await?
    } else {
        ensure_finalizer(object_set.as_ref(), &key, &ctx).await?;
        reconcile_phases(object_set.as_ref(), &key, &phases, &ctx).await?
    };

    ctx.failures.reset(&key.to_string());
    Ok(action)
}

/// Error policy: requeue with per-object exponential backoff
pub fn error_policy<O: GenericObjectSet>(
    object_set: Arc<O>,
    error: &Error,
    ctx: Arc<Context>,
) -> Action {
    let key = ObjectKey::from_resource(object_set.as_ref()).to_string();
    let delay = ctx.failures.record_failure(&key);
    error!(
        error = %error,
        object_set = %key,
        requeue_ms = delay.as_millis() as u64,
        "reconciliation failed"
    );
    Action::requeue(delay)
}

async fn ensure_finalizer<O: GenericObjectSet>(
    object_set: &O,
    key: &ObjectKey,
    ctx: &Context,
) -> Result<(), Error> {
    if object_set.finalizers().iter().any(|f| f == OBJECT_SET_FINALIZER) {
        return Ok(());
    }

    info!("adding finalizer");
    let mut finalizers = object_set.finalizers().to_vec();
    finalizers.push(OBJECT_SET_FINALIZER.to_string());
    ctx.client
        .patch_object_set_finalizers(O::SCOPE, key, &finalizers, object_set.resource_version())
        .await
        .map_err(|e| e.context("adding ObjectSet finalizer"))
}

async fn teardown<O: GenericObjectSet>(
    object_set: &O,
    key: &ObjectKey,
    phases: &RemotePhaseReconciler,
    ctx: &Context,
) -> Result<Action, Error> {
    if !object_set.finalizers().iter().any(|f| f == OBJECT_SET_FINALIZER) {
        return Ok(Action::await_change());
    }

    let mut all_done = true;
    for phase in object_set.phases() {
        if phase.is_remote() {
            all_done &= phases.teardown(object_set, phase).await?;
        }
    }

    if !all_done {
        debug!("waiting for phases to be deleted");
        return Ok(Action::requeue(TEARDOWN_REQUEUE));
    }

    info!("all phases deleted, removing finalizer");
    let finalizers: Vec<String> = object_set
        .finalizers()
        .iter()
        .filter(|f| f.as_str() != OBJECT_SET_FINALIZER)
        .cloned()
        .collect();
    ctx.client
        .patch_object_set_finalizers(O::SCOPE, key, &finalizers, object_set.resource_version())
        .await
        .map_err(|e| e.context("removing ObjectSet finalizer"))?;

    Ok(Action::await_change())
}

async fn reconcile_phases<O: GenericObjectSet>(
    object_set: &O,
    key: &ObjectKey,
    phases: &RemotePhaseReconciler,
    ctx: &Context,
) -> Result<Action, Error> {
    let mut working = object_set.clone();
    let mut controller_of = Vec::new();
    let mut failure: Option<ProbingResult> = None;

    for phase in object_set.phases() {
        let (active, probing) = phases.reconcile(&mut working, phase).await?;
        controller_of.extend(active);
        if failure.is_none() && !probing.is_empty() {
            failure = Some(probing);
        }
    }

    let generation = working.generation();
    let available = match &failure {
        Some(probing) => Condition::new(
            CONDITION_AVAILABLE,
            ConditionStatus::False,
            REASON_PROBE_FAILURE,
            probing.to_string(),
        ),
        None => Condition::new(
            CONDITION_AVAILABLE,
            ConditionStatus::True,
            REASON_AVAILABLE,
            AVAILABLE_MESSAGE,
        ),
    }
    .observed_generation(generation);
    set_status_condition(working.conditions_mut(), available);
    working.object_set_status_mut().controller_of = controller_of;

    if working.object_set_status() != object_set.object_set_status() {
        debug!(available = failure.is_none(), "updating ObjectSet status");
        if let Some(status) = working.object_set_status() {
            ctx.client
                .patch_object_set_status(O::SCOPE, key, status)
                .await
                .map_err(|e| e.context("patching ObjectSet status"))?;
        }
    }

    Ok(Action::requeue(ctx.config.requeue_interval()))
}
