//! ObjectSet control loop over the in-memory store

use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::runtime::controller::Action;

use objectset_operator::config::ControllerConfig;
use objectset_operator::controller::{
    find_status_condition, reconcile, Context, ObjectKey, OBJECT_SET_FINALIZER,
    REASON_PROBE_FAILURE, TEARDOWN_REQUEUE,
};
use objectset_operator::crd::{Condition, ConditionStatus, ObjectSetTemplatePhase, CONDITION_AVAILABLE};

use super::{db_key, sample_object_set, Call, FakeStore};

fn context(store: &Arc<FakeStore>) -> Arc<Context> {
    Arc::new(Context::with_client(
        store.clone(),
        ControllerConfig::default(),
    ))
}

fn app_key() -> ObjectKey {
    ObjectKey::new("app", Some("ns".to_string()))
}

/// Story: an ObjectSet goes from unreported to available
///
/// The first pass adds the finalizer, creates the phase and marks the
/// ObjectSet unavailable. Once the phase reports Available, the next pass
/// marks the ObjectSet available.
#[tokio::test]
async fn story_object_set_becomes_available() {
    let store = Arc::new(FakeStore::new());
    store.add_namespace("ns", false);
    let ctx = context(&store);
    let object_set = Arc::new(sample_object_set());

    reconcile(object_set.clone(), ctx.clone()).await.unwrap();

    assert!(store.calls().contains(&Call::PatchFinalizers(
        app_key().to_string(),
        vec![OBJECT_SET_FINALIZER.to_string()],
    )));
    let status = store.object_set_status(&app_key()).unwrap();
    let condition = find_status_condition(&status.conditions, CONDITION_AVAILABLE).unwrap();
    assert_eq!(condition.status, ConditionStatus::False);
    assert_eq!(condition.reason, REASON_PROBE_FAILURE);
    assert_eq!(condition.message, r#"Phase "db" failed: no status reported"#);

    let generation = store.phase(&db_key()).unwrap().generation();
    store.report_status(
        &db_key(),
        vec![
            Condition::new(CONDITION_AVAILABLE, ConditionStatus::True, "ProbesPassed", "")
                .observed_generation(generation),
        ],
        vec![],
    );

    let mut finalized = sample_object_set();
    finalized.metadata.finalizers = Some(vec![OBJECT_SET_FINALIZER.to_string()]);
    let action = reconcile(Arc::new(finalized), ctx).await.unwrap();

    assert_eq!(action, Action::requeue(std::time::Duration::from_secs(60)));
    let status = store.object_set_status(&app_key()).unwrap();
    let condition = find_status_condition(&status.conditions, CONDITION_AVAILABLE).unwrap();
    assert!(condition.is_true());
    assert_eq!(condition.observed_generation, 5);
    assert_eq!(status.remote_phases.len(), 1);
}

/// Story: a deleted ObjectSet keeps its finalizer until its phases are gone
#[tokio::test]
async fn story_deletion_releases_finalizer_after_teardown() {
    let store = Arc::new(FakeStore::new());
    store.add_namespace("ns", false);
    let ctx = context(&store);

    let mut object_set = sample_object_set();
    object_set.metadata.finalizers = Some(vec![OBJECT_SET_FINALIZER.to_string()]);
    object_set
        .spec
        .template
        .phases
        .push(ObjectSetTemplatePhase::new("inline"));
    reconcile(Arc::new(object_set.clone()), ctx.clone())
        .await
        .unwrap();
    store.add_finalizer(&db_key(), "example.com/cleanup");

    object_set.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
    let object_set = Arc::new(object_set);

    let action = reconcile(object_set.clone(), ctx.clone()).await.unwrap();
    assert_eq!(action, Action::requeue(TEARDOWN_REQUEUE));
    assert!(store.phase(&db_key()).is_some());

    store.release_finalizers(&db_key());
    store.clear_calls();

    let action = reconcile(object_set, ctx).await.unwrap();
    assert_eq!(action, Action::await_change());
    assert_eq!(
        store.calls(),
        vec![
            Call::Get(db_key().to_string()),
            Call::PatchFinalizers(app_key().to_string(), vec![]),
        ]
    );
}
