// src/manifest.rs

//! Manifest construction
//!
//! Builds the descriptor's output-side manifest by cross-referencing three
//! sources: the pack's `.json` entries (seed), the descriptor's own
//! definition resources (example flags and page paths), and the auxiliary
//! internals index (relative paths, images, pages).

use crate::archive::EntrySet;
use crate::descriptor::{Descriptor, ManifestPage, ManifestResource, Reference, PAGE_EXTENSION};
use crate::error::{Error, Result};
use crate::internals::SpecInternals;

/// Default license applied when the descriptor declares none.
pub const DEFAULT_LICENSE: &str = "CC0-1.0";

/// The canonical URL is everything before the resource-type marker segment.
pub fn canonical_url(descriptor: &Descriptor) -> Result<String> {
    match descriptor.url.find("/ImplementationGuide/") {
        Some(idx) => Ok(descriptor.url[..idx].to_string()),
        None => Err(Error::MalformedUrl(descriptor.url.clone())),
    }
}

/// Seed one bare manifest row per `.json` entry in the pack.
///
/// `TYPE-id.json` becomes the reference `TYPE/id`; the first `-` splits
/// type from id, so ids may themselves contain dashes.
pub fn seed_from_json_entries(entries: &EntrySet, descriptor: &mut Descriptor) {
    for name in entries.keys() {
        let Some(stem) = name.strip_suffix(".json") else {
            continue;
        };
        let Some((resource_type, id)) = stem.split_once('-') else {
            continue;
        };
        descriptor.manifest.resource.push(ManifestResource {
            reference: Reference::new(format!("{}/{}", resource_type, id)),
            ..Default::default()
        });
    }
}

/// Copy example flags and page paths from the definition resources onto
/// the matching manifest rows. Definitions with no matching row are
/// skipped silently; the pack simply did not ship that resource.
pub fn merge_definitions(descriptor: &mut Descriptor) {
    let definitions = std::mem::take(&mut descriptor.definition.resource);
    let mut merged = Vec::with_capacity(definitions.len());
    for mut definition in definitions {
        let reference = definition.reference.reference.clone();
        let row = reference
            .as_deref()
            .and_then(|r| find_resource(&mut descriptor.manifest.resource, r));
        if let Some(row) = row {
            row.example_boolean = definition.example_boolean;
            let page = definition.extension_value(PAGE_EXTENSION).map(str::to_string);
            if let Some(page) = page {
                row.relative_path = Some(page);
                definition.remove_extension(PAGE_EXTENSION);
            }
        }
        merged.push(definition);
    }
    descriptor.definition.resource = merged;
}

/// Fold the auxiliary internals index into the manifest.
pub fn merge_internals(
    descriptor: &mut Descriptor,
    internals: &SpecInternals,
    canonical: &str,
) -> Result<()> {
    descriptor.manifest.rendering = Some(internals.web_url.clone());

    for (url, path) in &internals.paths {
        let Some(rest) = url.strip_prefix(canonical) else {
            continue;
        };
        // Skip the separator after the canonical prefix.
        let reference = rest.trim_start_matches('/');
        if let Some(row) = find_resource(&mut descriptor.manifest.resource, reference) {
            if row.relative_path.is_none() {
                row.relative_path = Some(path.clone());
            }
        }
    }

    for image in &internals.images {
        descriptor.manifest.image.push(image.clone());
    }

    for target in &internals.targets {
        if target.contains('#') {
            return Err(Error::IncompatibleInternals(format!(
                "target contains a fragment marker: {}",
                target
            )));
        }
        descriptor.manifest.page.push(ManifestPage {
            name: target.clone(),
            ..Default::default()
        });
    }

    if !internals.pages.is_empty() {
        return Err(Error::IncompatibleInternals(
            "legacy pages entries present".to_string(),
        ));
    }

    Ok(())
}

/// Default the license to an open-content one when none is declared.
pub fn apply_license_default(descriptor: &mut Descriptor) {
    if descriptor.license.is_none() {
        descriptor.license = Some(DEFAULT_LICENSE.to_string());
    }
}

/// First manifest row whose reference matches exactly.
fn find_resource<'a>(
    rows: &'a mut [ManifestResource],
    reference: &str,
) -> Option<&'a mut ManifestResource> {
    rows.iter_mut()
        .find(|r| r.reference.reference.as_deref() == Some(reference))
}
