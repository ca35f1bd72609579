//! PackageManifest types (`manifests.package-operator.run/v1alpha1`)

use serde::{Deserialize, Serialize};

use crate::crd::ObjectSetProbe;

/// API group of PackageManifest
pub const PACKAGE_MANIFEST_GROUP: &str = "manifests.package-operator.run";

/// Kind of PackageManifest
pub const PACKAGE_MANIFEST_KIND: &str = "PackageManifest";

/// Versions of PackageManifest this loader understands
pub const SUPPORTED_VERSIONS: &[&str] = &["v1alpha1"];

/// Package metadata and phase layout, read from `manifest.yaml`
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// `<group>/<version>`
    pub api_version: String,
    /// Always `PackageManifest`
    pub kind: String,
    /// Manifest metadata
    #[serde(default)]
    pub metadata: PackageManifestMetadata,
    /// Manifest spec
    #[serde(default)]
    pub spec: PackageManifestSpec,
}

/// Metadata of a PackageManifest
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PackageManifestMetadata {
    /// Package name
    #[serde(default)]
    pub name: String,
}

/// Spec of a PackageManifest
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifestSpec {
    /// Scopes the package can be installed in
    #[serde(default)]
    pub scopes: Vec<PackageManifestScope>,
    /// Ordered phases objects are assigned to
    #[serde(default)]
    pub phases: Vec<PackageManifestPhase>,
    /// Availability probes for all phases
    #[serde(default)]
    pub availability_probes: Vec<ObjectSetProbe>,
}

/// Installation scope of a package
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PackageManifestScope {
    /// Installed through a ClusterPackage
    Cluster,
    /// Installed through a namespaced Package
    Namespaced,
}

/// A phase declared by the manifest
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PackageManifestPhase {
    /// Phase name
    pub name: String,
    /// Class delegating the phase to a remote controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl PackageManifest {
    /// True if `name` is one of the declared phases
    pub fn has_phase(&self, name: &str) -> bool {
        self.spec.phases.iter().any(|p| p.name == name)
    }
}

/// Group and version of an `apiVersion` string
///
/// Core group resources have no `/` and yield an empty group.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Render a group/kind the way Kubernetes does: `Kind.group`, or `Kind`
/// for the core group
pub fn group_kind(kind: &str, group: &str) -> String {
    if group.is_empty() {
        kind.to_string()
    } else {
        format!("{}.{}", kind, group)
    }
}
