// src/emitter.rs

//! npm-style package emission
//!
//! Writes the final `package.tgz` next to the input pack: a gzipped tar
//! whose entries live under category folders, fronted by a generated npm
//! `package.json` built from the normalized descriptor.

use crate::archive::{self, EntrySet};
use crate::descriptor::{self, Descriptor};
use crate::error::{Error, Result};
use crate::revision::SchemaRevision;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where an entry lands inside the package archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Resource,
    Schematron,
    Other,
}

impl Category {
    fn folder(&self) -> &'static str {
        match self {
            Self::Resource => "package",
            Self::Schematron => "package/schematron",
            Self::Other => "package/other",
        }
    }
}

/// One entry of the output package.
pub struct PackageEntry {
    pub category: Category,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PackageEntry {
    pub fn new(category: Category, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            category,
            name: name.into(),
            bytes,
        }
    }
}

/// Compose and write the output package for one converted pack.
///
/// Entry order: npm manifest, latest-schema descriptor, original-revision
/// descriptor, every original `.json` entry verbatim, extracted schematron
/// entries, and the raw `spec.internals`.
pub fn emit(
    pack_path: &Path,
    canonical: &str,
    descriptor: &Descriptor,
    revision: SchemaRevision,
    entries: &EntrySet,
) -> Result<PathBuf> {
    let mut package = Vec::new();

    package.push(PackageEntry::new(
        Category::Resource,
        "package.json",
        npm_manifest(canonical, descriptor)?,
    ));
    package.push(PackageEntry::new(
        Category::Resource,
        "ig-r4.json",
        serde_json::to_vec_pretty(descriptor)?,
    ));
    let id = descriptor.id.as_deref().unwrap_or("ig");
    package.push(PackageEntry::new(
        Category::Resource,
        format!("ImplementationGuide-{}.json", id),
        descriptor::downgrade(descriptor, revision)?,
    ));

    for (name, bytes) in entries {
        if name.ends_with(".json") {
            package.push(PackageEntry::new(
                Category::Resource,
                name.clone(),
                bytes.clone(),
            ));
        } else if name.as_str() == "schematron.zip" {
            for (nested_name, nested_bytes) in archive::read_zip(bytes)? {
                package.push(PackageEntry::new(
                    Category::Schematron,
                    nested_name,
                    nested_bytes,
                ));
            }
        } else if name.as_str() == "spec.internals" {
            // hedging against changes in the pack format
            package.push(PackageEntry::new(Category::Other, name.clone(), bytes.clone()));
        }
    }

    let output = pack_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("package.tgz");
    write_package(&output, &package)?;
    debug!("wrote {} entries to {}", package.len(), output.display());
    Ok(output)
}

/// Write the given entries, in order, as a gzipped tar archive.
pub fn write_package(output: &Path, entries: &[PackageEntry]) -> Result<()> {
    let file = File::create(output).map_err(|e| Error::ArchiveWrite(e.to_string()))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(entry.bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        let path = format!("{}/{}", entry.category.folder(), entry.name);
        builder
            .append_data(&mut header, &path, entry.bytes.as_slice())
            .map_err(|e| Error::ArchiveWrite(format!("{}: {}", path, e)))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::ArchiveWrite(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Error::ArchiveWrite(e.to_string()))?;
    Ok(())
}

/// The generated npm manifest for the package.
fn npm_manifest(canonical: &str, descriptor: &Descriptor) -> Result<Vec<u8>> {
    let dependencies: serde_json::Map<String, serde_json::Value> = descriptor
        .depends_on
        .iter()
        .filter_map(|d| {
            match (&d.package_id, &d.version) {
                (Some(id), Some(version)) => Some((id.clone(), json!(version))),
                _ => None,
            }
        })
        .collect();

    let manifest = json!({
        "name": &descriptor.package_id,
        "version": &descriptor.version,
        "type": "fhir.ig",
        "canonical": canonical,
        "url": &descriptor.url,
        "license": &descriptor.license,
        "fhirVersions": [&descriptor.fhir_version],
        "dependencies": dependencies,
    });
    Ok(serde_json::to_vec_pretty(&manifest)?)
}
