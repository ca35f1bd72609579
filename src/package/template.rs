//! ObjectSet templates from packages

use super::loader::Package;
use crate::crd::{ObjectSetObject, ObjectSetTemplatePhase, ObjectSetTemplateSpec};

/// Build the ObjectSet template for a package
///
/// Phases follow the manifest order and keep their class. Objects land in
/// the phase their annotation names, in package file order.
pub fn template_spec_from_package(package: &Package) -> ObjectSetTemplateSpec {
    let phases = package
        .manifest
        .spec
        .phases
        .iter()
        .map(|manifest_phase| ObjectSetTemplatePhase {
            name: manifest_phase.name.clone(),
            class: manifest_phase.class.clone(),
            objects: package
                .objects
                .iter()
                .filter(|o| o.phase == manifest_phase.name)
                .map(|o| ObjectSetObject {
                    object: o.object.clone(),
                })
                .collect(),
        })
        .collect();

    ObjectSetTemplateSpec {
        phases,
        availability_probes: package.manifest.spec.availability_probes.clone(),
    }
}
