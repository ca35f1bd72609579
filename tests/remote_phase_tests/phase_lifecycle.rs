//! Lifecycle of a single remote phase
//!
//! These tests follow one ObjectSetPhase from creation through pausing and
//! status reporting to deletion, one reconciliation pass at a time.

use objectset_operator::controller::{
    find_status_condition, GenericObjectSet, ProbingResult, NO_STATUS_PROBE_FAILURE,
};
use objectset_operator::crd::{
    Condition, ConditionStatus, ControlledObjectReference, ObjectSetStatus, RemotePhaseReference,
    CONDITION_AVAILABLE,
};

use super::{db_key, db_phase, sample_object_set, set_paused, setup, Call};

fn available(status: ConditionStatus, generation: i64, message: &str) -> Condition {
    Condition::new(CONDITION_AVAILABLE, status, "ProbesPassed", message)
        .observed_generation(generation)
}

// =============================================================================
// Creation
// =============================================================================

/// Story: the first pass creates the phase and reports that it has no status yet
///
/// The ObjectSet `app` has a single remote phase `db` and no phase object
/// exists. One pass creates `app-db` carrying revision 3, and since nobody
/// has reported on it yet the phase counts as not available.
#[tokio::test]
async fn story_first_pass_creates_phase_without_status() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();

    let (active, probing) = reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    assert_eq!(store.creates(), 1);
    let phase = store.phase(&db_key()).unwrap();
    assert_eq!(phase.spec().revision, 3);
    assert_eq!(phase.spec().phase.name, "db");
    assert!(active.is_empty());
    assert_eq!(
        probing,
        ProbingResult::failed("db", vec![NO_STATUS_PROBE_FAILURE.to_string()])
    );
    assert_eq!(
        object_set.remote_phases(),
        [RemotePhaseReference::new("app-db", phase.uid())]
    );
}

/// Story: repeated passes never create a second phase object
#[tokio::test]
async fn story_creation_is_idempotent() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();

    for _ in 0..3 {
        reconciler
            .reconcile(&mut object_set, &db_phase())
            .await
            .unwrap();
    }

    assert_eq!(store.creates(), 1);
    assert_eq!(store.patches(), 0);
    assert_eq!(object_set.remote_phases().len(), 1);
}

/// Story: a reference left by an earlier incarnation of the phase is replaced
#[tokio::test]
async fn story_stale_reference_is_replaced_not_duplicated() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    object_set.status = Some(ObjectSetStatus {
        remote_phases: vec![
            RemotePhaseReference::new("app-db", "old-uid"),
            RemotePhaseReference::new("app-cache", "cache-uid"),
        ],
        ..Default::default()
    });

    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    let uid = store.phase(&db_key()).unwrap().uid();
    assert_eq!(
        object_set.remote_phases(),
        [
            RemotePhaseReference::new("app-db", uid),
            RemotePhaseReference::new("app-cache", "cache-uid"),
        ]
    );
}

// =============================================================================
// Availability
// =============================================================================

/// Story: a phase reporting Available for its current generation is healthy
///
/// The mirrored condition on the ObjectSet is stamped with the ObjectSet's
/// own generation, not the phase's.
#[tokio::test]
async fn story_available_phase_is_healthy() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    let generation = store.phase(&db_key()).unwrap().generation();
    store.report_status(
        &db_key(),
        vec![available(ConditionStatus::True, generation, "")],
        vec![ControlledObjectReference {
            kind: "StatefulSet".to_string(),
            group: "apps".to_string(),
            name: "postgres".to_string(),
            namespace: Some("ns".to_string()),
        }],
    );

    let (active, probing) = reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    assert!(probing.is_empty());
    assert_eq!(active.len(), 1);
    let mirrored = find_status_condition(object_set.conditions(), CONDITION_AVAILABLE).unwrap();
    assert!(mirrored.is_true());
    assert_eq!(mirrored.observed_generation, 5);
}

/// Story: an Available condition from an older generation is not trusted
///
/// The phase reported True, then its spec changed. Until its controller
/// catches up the phase counts as unreported, never as healthy.
#[tokio::test]
async fn story_outdated_available_condition_is_unreported() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    let generation = store.phase(&db_key()).unwrap().generation();
    store.report_status(
        &db_key(),
        vec![available(ConditionStatus::True, generation, "")],
        vec![],
    );
    store.bump_generation(&db_key());

    let (_, probing) = reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    assert_eq!(
        probing,
        ProbingResult::failed("db", vec![NO_STATUS_PROBE_FAILURE.to_string()])
    );
}

#[tokio::test]
async fn unavailable_phase_reports_its_message() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    store.report_status(
        &db_key(),
        vec![available(ConditionStatus::False, 1, "postgres: 0/1 replicas ready")],
        vec![],
    );

    let (_, probing) = reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    assert_eq!(
        probing.to_string(),
        r#"Phase "db" failed: postgres: 0/1 replicas ready"#
    );
}

// =============================================================================
// Pausing
// =============================================================================

/// Story: pausing follows the ObjectSet with exactly one patch per flip
#[tokio::test]
async fn story_pause_flips_are_patched_once_each() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    set_paused(&mut object_set, true);
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    assert!(store.phase(&db_key()).unwrap().is_paused());
    assert_eq!(store.patches(), 0);

    for (pass, paused) in [false, true].into_iter().enumerate() {
        set_paused(&mut object_set, paused);

        reconciler
            .reconcile(&mut object_set, &db_phase())
            .await
            .unwrap();
        assert_eq!(store.phase(&db_key()).unwrap().is_paused(), paused);
        assert_eq!(store.patches(), pass + 1);

        // A second pass without a change sends nothing.
        reconciler
            .reconcile(&mut object_set, &db_phase())
            .await
            .unwrap();
        assert_eq!(store.patches(), pass + 1);
    }
}

/// Story: the pause patch only carries the flag and the observed version
#[tokio::test]
async fn story_pause_patch_is_minimal() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    let observed = store
        .phase(&db_key())
        .unwrap()
        .resource_version()
        .map(str::to_string)
        .unwrap();
    store.clear_calls();

    set_paused(&mut object_set, true);
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    let patches: Vec<_> = store
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Patch(_, patch) => Some(patch),
            _ => None,
        })
        .collect();
    assert_eq!(
        patches,
        vec![serde_json::json!({
            "metadata": {"resourceVersion": observed},
            "spec": {"paused": true}
        })]
    );
}

/// Story: a phase that was available counts as unreported right after pausing
///
/// Pausing changes the phase's spec. Its Available condition belongs to the
/// previous generation until its controller reports again, so it is neither
/// trusted nor mirrored onto the ObjectSet.
#[tokio::test]
async fn story_pausing_available_phase_resets_its_verdict() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    let generation = store.phase(&db_key()).unwrap().generation();
    store.report_status(
        &db_key(),
        vec![available(ConditionStatus::True, generation, "")],
        vec![],
    );

    set_paused(&mut object_set, true);
    let (_, probing) = reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    assert!(store.phase(&db_key()).unwrap().generation() > generation);
    assert_eq!(
        probing,
        ProbingResult::failed("db", vec![NO_STATUS_PROBE_FAILURE.to_string()])
    );
    assert!(find_status_condition(object_set.conditions(), CONDITION_AVAILABLE).is_none());
}

// =============================================================================
// Teardown
// =============================================================================

/// Story: teardown reports completion only once the phase is really gone
///
/// A foreign finalizer keeps the phase around after the delete call. Each
/// pass until the finalizer is released reports not done.
#[tokio::test]
async fn story_teardown_waits_for_finalizers() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    store.add_finalizer(&db_key(), "example.com/cleanup");

    assert!(!reconciler.teardown(&object_set, &db_phase()).await.unwrap());
    assert!(!reconciler.teardown(&object_set, &db_phase()).await.unwrap());
    assert!(store.phase(&db_key()).is_some());

    store.release_finalizers(&db_key());

    assert!(reconciler.teardown(&object_set, &db_phase()).await.unwrap());
}

/// Story: the pass that deletes is never the pass that reports done
#[tokio::test]
async fn story_delete_pass_never_reports_done() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    let first = reconciler.teardown(&object_set, &db_phase()).await.unwrap();
    assert!(!first);
    assert_eq!(store.deletes(), 1);
    assert!(store.phase(&db_key()).is_none());

    let second = reconciler.teardown(&object_set, &db_phase()).await.unwrap();
    assert!(second);
    assert_eq!(store.deletes(), 1);
}

/// Story: phases in a terminating namespace lose their finalizers first
///
/// The finalizer's owner may be going away with the namespace, so the
/// finalizers are cleared before the delete is issued.
#[tokio::test]
async fn story_terminating_namespace_clears_finalizers_before_delete() {
    let (store, reconciler) = setup();
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();
    store.add_finalizer(&db_key(), "example.com/cleanup");
    store.add_namespace("ns", true);
    store.clear_calls();

    assert!(!reconciler.teardown(&object_set, &db_phase()).await.unwrap());

    let key = db_key().to_string();
    assert_eq!(
        store.calls(),
        vec![
            Call::Get(key.clone()),
            Call::GetNamespace("ns".to_string()),
            Call::Update(key.clone()),
            Call::Delete(key),
        ]
    );
    assert!(store.phase(&db_key()).is_none());
    assert!(reconciler.teardown(&object_set, &db_phase()).await.unwrap());
}

#[tokio::test]
async fn namespace_lookup_failure_is_retryable() {
    let store = std::sync::Arc::new(super::FakeStore::new());
    let reconciler = objectset_operator::controller::RemotePhaseReconciler::new(
        store.clone(),
        objectset_operator::controller::ObjectSetScope::Namespaced,
    );
    let mut object_set = sample_object_set();
    reconciler
        .reconcile(&mut object_set, &db_phase())
        .await
        .unwrap();

    let result = reconciler.teardown(&object_set, &db_phase()).await;

    assert!(result.is_err());
    assert_eq!(store.deletes(), 0);
    assert!(store.phase(&db_key()).is_some());
}
