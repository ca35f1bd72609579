//! Package content loading
//!
//! A package is a folder holding a `manifest.yaml` PackageManifest plus YAML
//! files with the objects to deploy. Each object names its phase through the
//! `package-operator.run/phase` annotation. Loading validates the whole
//! package and reports every problem at once.

mod files;
mod loader;
mod manifest;
mod template;

pub use files::{import_folder, Files};
pub use loader::{
    package_from_files, Package, PackageObject, ValidationError, ValidationErrors,
    PACKAGE_MANIFEST_FILE, PACKAGE_MANIFEST_FILE_ALT, PHASE_ANNOTATION,
};
pub use manifest::{
    PackageManifest, PackageManifestMetadata, PackageManifestPhase, PackageManifestScope,
    PackageManifestSpec, PACKAGE_MANIFEST_GROUP, PACKAGE_MANIFEST_KIND, SUPPORTED_VERSIONS,
};
pub use template::template_spec_from_package;
