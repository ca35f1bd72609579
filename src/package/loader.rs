//! Package validation and parsing
//!
//! [`package_from_files`] turns raw [`Files`] into a [`Package`]. Problems
//! are collected rather than returned one at a time, so a single run reports
//! everything wrong with a package.

use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::Error;

use super::files::Files;
use super::manifest::{
    group_kind, split_api_version, PackageManifest, PACKAGE_MANIFEST_GROUP, PACKAGE_MANIFEST_KIND,
    SUPPORTED_VERSIONS,
};

/// Primary manifest file name
pub const PACKAGE_MANIFEST_FILE: &str = "manifest.yaml";

/// Alternative manifest file name
pub const PACKAGE_MANIFEST_FILE_ALT: &str = "manifest.yml";

/// Annotation assigning an object to a manifest phase
pub const PHASE_ANNOTATION: &str = "package-operator.run/phase";

/// A single problem found in package contents
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No manifest file in the package
    #[error("PackageManifest not found:\n  searched at {},{}", PACKAGE_MANIFEST_FILE, PACKAGE_MANIFEST_FILE_ALT)]
    ManifestNotFound,

    /// A file is not valid YAML
    #[error("Invalid YAML in {path}:\n  {message}")]
    InvalidYaml {
        /// File path
        path: String,
        /// Parser message
        message: String,
    },

    /// The manifest file holds something other than a PackageManifest
    #[error(
        "PackageManifest unknown GVK in {path}:\n  GroupKind must be {}.{}, is: {group_kind}",
        PACKAGE_MANIFEST_KIND,
        PACKAGE_MANIFEST_GROUP
    )]
    UnknownGroupKind {
        /// File path
        path: String,
        /// Group/kind found in the file
        group_kind: String,
    },

    /// The manifest uses a PackageManifest version this loader does not know
    #[error("PackageManifest unknown GVK in {path}:\n  unknown version {version}, supported versions: {}", SUPPORTED_VERSIONS.join(","))]
    UnsupportedVersion {
        /// File path
        path: String,
        /// Version found in the file
        version: String,
    },

    /// The manifest has the right type but invalid content
    #[error("Invalid PackageManifest in {path}:\n  {message}")]
    InvalidManifest {
        /// File path
        path: String,
        /// What is wrong
        message: String,
    },

    /// A YAML document is not a Kubernetes object
    #[error("Invalid object in {path} document {index}:\n  {message}")]
    InvalidObject {
        /// File path
        path: String,
        /// Zero-based document index within the file
        index: usize,
        /// What is wrong
        message: String,
    },

    /// An object is not assigned to a phase
    #[error(
        "Missing phase annotation in {path} document {index}:\n  objects must carry the {} annotation",
        PHASE_ANNOTATION
    )]
    MissingPhaseAnnotation {
        /// File path
        path: String,
        /// Zero-based document index within the file
        index: usize,
    },

    /// An object is assigned to a phase the manifest does not declare
    #[error("Unknown phase in {path} document {index}:\n  phase {phase:?} is not declared in the PackageManifest")]
    UnknownPhase {
        /// File path
        path: String,
        /// Zero-based document index within the file
        index: usize,
        /// Phase named by the annotation
        phase: String,
    },
}

/// All problems found in package contents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Record a problem
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// True if no problem was recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recorded problems in discovery order
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package validation errors:")?;
        for error in &self.0 {
            write!(f, "\n- {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// An object of the package, assigned to a manifest phase
#[derive(Clone, Debug, PartialEq)]
pub struct PackageObject {
    /// File the object was read from
    pub path: String,
    /// Zero-based document index within the file
    pub index: usize,
    /// Phase named by the object's phase annotation
    pub phase: String,
    /// The object
    pub object: serde_json::Value,
}

/// A validated package
#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    /// The package manifest
    pub manifest: PackageManifest,
    /// Objects in file path order, then document order
    pub objects: Vec<PackageObject>,
}

/// Validate and parse package contents
pub fn package_from_files(files: &Files) -> Result<Package, Error> {
    let manifest = load_manifest(files).map_err(ValidationErrors::from)?;

    let mut errors = ValidationErrors::default();
    let mut objects = Vec::new();
    for (path, content) in files {
        if is_manifest_file(path) || !is_yaml_file(path) {
            continue;
        }
        load_objects(path, content, &manifest, &mut objects, &mut errors);
    }

    debug!(
        package = %manifest.metadata.name,
        objects = objects.len(),
        problems = errors.errors().len(),
        "loaded package"
    );
    Ok(errors.into_result(Package { manifest, objects })?)
}

fn is_manifest_file(path: &str) -> bool {
    path == PACKAGE_MANIFEST_FILE || path == PACKAGE_MANIFEST_FILE_ALT
}

fn is_yaml_file(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml")
}

fn load_manifest(files: &Files) -> Result<PackageManifest, ValidationError> {
    let (path, content) = [PACKAGE_MANIFEST_FILE, PACKAGE_MANIFEST_FILE_ALT]
        .iter()
        .find_map(|name| files.get(*name).map(|content| (*name, content)))
        .ok_or(ValidationError::ManifestNotFound)?;

    let value: serde_yaml::Value =
        serde_yaml::from_slice(content).map_err(|e| ValidationError::InvalidYaml {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let api_version = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let kind = value.get("kind").and_then(|v| v.as_str()).unwrap_or_default();
    let (group, version) = split_api_version(api_version);

    if group != PACKAGE_MANIFEST_GROUP || kind != PACKAGE_MANIFEST_KIND {
        return Err(ValidationError::UnknownGroupKind {
            path: path.to_string(),
            group_kind: group_kind(kind, group),
        });
    }
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ValidationError::UnsupportedVersion {
            path: path.to_string(),
            version: version.to_string(),
        });
    }

    let manifest: PackageManifest =
        serde_yaml::from_value(value).map_err(|e| ValidationError::InvalidManifest {
            path: path.to_string(),
            message: e.to_string(),
        })?;

    let mut seen = std::collections::BTreeSet::new();
    for phase in &manifest.spec.phases {
        if phase.name.is_empty() {
            return Err(ValidationError::InvalidManifest {
                path: path.to_string(),
                message: "phase names must not be empty".to_string(),
            });
        }
        if !seen.insert(phase.name.as_str()) {
            return Err(ValidationError::InvalidManifest {
                path: path.to_string(),
                message: format!("phase {:?} is declared more than once", phase.name),
            });
        }
    }

    Ok(manifest)
}

fn load_objects(
    path: &str,
    content: &[u8],
    manifest: &PackageManifest,
    objects: &mut Vec<PackageObject>,
    errors: &mut ValidationErrors,
) {
    for (index, document) in serde_yaml::Deserializer::from_slice(content).enumerate() {
        let value = match serde_yaml::Value::deserialize(document) {
            Ok(value) => value,
            Err(e) => {
                // The parser cannot resume after a syntax error.
                errors.push(ValidationError::InvalidYaml {
                    path: path.to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };
        if value.is_null() {
            continue;
        }

        match to_package_object(path, index, value, manifest) {
            Ok(object) => objects.push(object),
            Err(e) => errors.push(e),
        }
    }
}

fn to_package_object(
    path: &str,
    index: usize,
    value: serde_yaml::Value,
    manifest: &PackageManifest,
) -> Result<PackageObject, ValidationError> {
    let invalid = |message: String| ValidationError::InvalidObject {
        path: path.to_string(),
        index,
        message,
    };

    if !value.is_mapping() {
        return Err(invalid("document is not an object".to_string()));
    }
    let object = serde_json::to_value(&value).map_err(|e| invalid(e.to_string()))?;
    if object.get("kind").and_then(|k| k.as_str()).is_none() {
        return Err(invalid("object has no kind".to_string()));
    }

    let phase = object
        .pointer("/metadata/annotations")
        .and_then(|a| a.get(PHASE_ANNOTATION))
        .and_then(|p| p.as_str())
        .ok_or_else(|| ValidationError::MissingPhaseAnnotation {
            path: path.to_string(),
            index,
        })?
        .to_string();

    if !manifest.has_phase(&phase) {
        return Err(ValidationError::UnknownPhase {
            path: path.to_string(),
            index,
            phase,
        });
    }

    Ok(PackageObject {
        path: path.to_string(),
        index,
        phase,
        object,
    })
}
