//! Object store access for the ObjectSet controllers
//!
//! [`ObjectSetClient`] is the only way the reconcilers talk to the API
//! server. Every call is a single attempt; retries are left to the
//! controller's error policy.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use super::generic::{GenericObjectSetPhase, ObjectKey, ObjectSetScope};
use crate::crd::{ClusterObjectSet, ClusterObjectSetPhase, ObjectSet, ObjectSetPhase, ObjectSetStatus};
use crate::{Error, FIELD_MANAGER};

/// Trait abstracting Kubernetes operations on ObjectSets and their phases
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectSetClient: Send + Sync {
    /// Get a phase object, `None` if it does not exist
    async fn get_phase(
        &self,
        scope: ObjectSetScope,
        key: &ObjectKey,
    ) -> Result<Option<GenericObjectSetPhase>, Error>;

    /// Create a phase object, returning it as persisted
    async fn create_phase(
        &self,
        phase: &GenericObjectSetPhase,
    ) -> Result<GenericObjectSetPhase, Error>;

    /// Replace a phase object, returning it as persisted
    async fn update_phase(
        &self,
        phase: &GenericObjectSetPhase,
    ) -> Result<GenericObjectSetPhase, Error>;

    /// Apply a JSON merge patch to a phase object, returning it as persisted
    ///
    /// A `metadata.resourceVersion` in the patch makes the write conditional.
    async fn patch_phase(
        &self,
        phase: &GenericObjectSetPhase,
        patch: &serde_json::Value,
    ) -> Result<GenericObjectSetPhase, Error>;

    /// Issue a delete for a phase object
    ///
    /// Success only means the deletion was accepted; finalizers may keep the
    /// object around.
    async fn delete_phase(&self, phase: &GenericObjectSetPhase) -> Result<(), Error>;

    /// Get a namespace
    async fn get_namespace(&self, name: &str) -> Result<Namespace, Error>;

    /// Merge-patch the status of an ObjectSet or ClusterObjectSet
    async fn patch_object_set_status(
        &self,
        scope: ObjectSetScope,
        key: &ObjectKey,
        status: &ObjectSetStatus,
    ) -> Result<(), Error>;

    /// Replace the finalizers of an ObjectSet or ClusterObjectSet
    ///
    /// With a `resource_version` the write fails with a conflict if the
    /// object changed since it was observed.
    async fn patch_object_set_finalizers(
        &self,
        scope: ObjectSetScope,
        key: &ObjectKey,
        finalizers: &[String],
        resource_version: Option<String>,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeObjectSetClient {
    client: Client,
}

impl KubeObjectSetClient {
    /// Create a new KubeObjectSetClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn phase_api(&self, key: &ObjectKey) -> Api<ObjectSetPhase> {
        match key.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        }
    }

    fn cluster_phase_api(&self) -> Api<ClusterObjectSetPhase> {
        Api::all(self.client.clone())
    }

    fn object_set_api(&self, key: &ObjectKey) -> Api<ObjectSet> {
        match key.namespace.as_deref() {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        }
    }

    fn cluster_object_set_api(&self) -> Api<ClusterObjectSet> {
        Api::all(self.client.clone())
    }
}

/// Merge patch replacing `metadata.finalizers`, guarded by the observed
/// resource version when one is given
pub fn finalizers_patch(finalizers: &[String], resource_version: Option<&str>) -> serde_json::Value {
    let mut patch = serde_json::json!({
        "metadata": {
            "finalizers": finalizers
        }
    });
    if let Some(rv) = resource_version {
        patch["metadata"]["resourceVersion"] = serde_json::json!(rv);
    }
    patch
}

async fn patch_object<K>(api: &Api<K>, name: &str, patch: &serde_json::Value) -> Result<K, Error>
where
    K: Clone + DeserializeOwned + std::fmt::Debug,
{
    Ok(api
        .patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await?)
}

async fn patch_status<K>(api: &Api<K>, name: &str, status: &ObjectSetStatus) -> Result<(), Error>
where
    K: Clone + DeserializeOwned + std::fmt::Debug,
{
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

async fn create_object<K>(api: &Api<K>, object: &K) -> Result<K, Error>
where
    K: Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    let pp = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    Ok(api.create(&pp, object).await?)
}

async fn replace_object<K>(api: &Api<K>, name: &str, object: &K) -> Result<K, Error>
where
    K: Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    let pp = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    Ok(api.replace(name, &pp, object).await?)
}

#[async_trait]
impl ObjectSetClient for KubeObjectSetClient {
    async fn get_phase(
        &self,
        scope: ObjectSetScope,
        key: &ObjectKey,
    ) -> Result<Option<GenericObjectSetPhase>, Error> {
        let phase = match scope {
            ObjectSetScope::Namespaced => self
                .phase_api(key)
                .get_opt(&key.name)
                .await?
                .map(GenericObjectSetPhase::Namespaced),
            ObjectSetScope::Cluster => self
                .cluster_phase_api()
                .get_opt(&key.name)
                .await?
                .map(GenericObjectSetPhase::Cluster),
        };
        Ok(phase)
    }

    async fn create_phase(
        &self,
        phase: &GenericObjectSetPhase,
    ) -> Result<GenericObjectSetPhase, Error> {
        debug!(phase = %phase.key(), "creating phase object");
        let created = match phase {
            GenericObjectSetPhase::Namespaced(p) => GenericObjectSetPhase::Namespaced(
                create_object(&self.phase_api(&phase.key()), p).await?,
            ),
            GenericObjectSetPhase::Cluster(p) => GenericObjectSetPhase::Cluster(
                create_object(&self.cluster_phase_api(), p).await?,
            ),
        };
        Ok(created)
    }

    async fn update_phase(
        &self,
        phase: &GenericObjectSetPhase,
    ) -> Result<GenericObjectSetPhase, Error> {
        let key = phase.key();
        let updated = match phase {
            GenericObjectSetPhase::Namespaced(p) => GenericObjectSetPhase::Namespaced(
                replace_object(&self.phase_api(&key), &key.name, p).await?,
            ),
            GenericObjectSetPhase::Cluster(p) => GenericObjectSetPhase::Cluster(
                replace_object(&self.cluster_phase_api(), &key.name, p).await?,
            ),
        };
        Ok(updated)
    }

    async fn patch_phase(
        &self,
        phase: &GenericObjectSetPhase,
        patch: &serde_json::Value,
    ) -> Result<GenericObjectSetPhase, Error> {
        let key = phase.key();
        let patched = match phase.scope() {
            ObjectSetScope::Namespaced => GenericObjectSetPhase::Namespaced(
                patch_object(&self.phase_api(&key), &key.name, patch).await?,
            ),
            ObjectSetScope::Cluster => GenericObjectSetPhase::Cluster(
                patch_object(&self.cluster_phase_api(), &key.name, patch).await?,
            ),
        };
        Ok(patched)
    }

    async fn delete_phase(&self, phase: &GenericObjectSetPhase) -> Result<(), Error> {
        let key = phase.key();
        let dp = DeleteParams::background();
        match phase.scope() {
            ObjectSetScope::Namespaced => {
                self.phase_api(&key).delete(&key.name, &dp).await?;
            }
            ObjectSetScope::Cluster => {
                self.cluster_phase_api().delete(&key.name, &dp).await?;
            }
        }
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace, Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn patch_object_set_status(
        &self,
        scope: ObjectSetScope,
        key: &ObjectKey,
        status: &ObjectSetStatus,
    ) -> Result<(), Error> {
        match scope {
            ObjectSetScope::Namespaced => {
                patch_status(&self.object_set_api(key), &key.name, status).await
            }
            ObjectSetScope::Cluster => {
                patch_status(&self.cluster_object_set_api(), &key.name, status).await
            }
        }
    }

    async fn patch_object_set_finalizers(
        &self,
        scope: ObjectSetScope,
        key: &ObjectKey,
        finalizers: &[String],
        resource_version: Option<String>,
    ) -> Result<(), Error> {
        let patch = finalizers_patch(finalizers, resource_version.as_deref());
        match scope {
            ObjectSetScope::Namespaced => {
                patch_object(&self.object_set_api(key), &key.name, &patch).await?;
            }
            ObjectSetScope::Cluster => {
                patch_object(&self.cluster_object_set_api(), &key.name, &patch).await?;
            }
        }
        Ok(())
    }
}
