// src/descriptor/mod.rs

//! Implementation guide descriptor model
//!
//! The descriptor is the single central resource per validator pack. Only
//! the fields the conversion touches are modeled; everything else rides
//! along in flattened `extra` maps so re-emission stays faithful.

pub mod codec;

use crate::archive::EntrySet;
use crate::error::{Error, Result};
use crate::revision::SchemaRevision;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use codec::{downgrade, upgrade};

/// Extension URL carrying a definition resource's web page path.
pub const PAGE_EXTENSION: &str =
    "http://hl7.org/fhir/StructureDefinition/implementationguide-page";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Definition::is_empty")]
    pub definition: Definition,
    #[serde(default, skip_serializing_if = "Manifest::is_empty")]
    pub manifest: Manifest,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            resource_type: "ImplementationGuide".to_string(),
            id: None,
            url: String::new(),
            version: None,
            fhir_version: None,
            package_id: None,
            license: None,
            depends_on: Vec::new(),
            definition: Definition::default(),
            manifest: Manifest::default(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Definition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<DefinitionResource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Definition {
    pub fn is_empty(&self) -> bool {
        self.resource.is_empty() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionResource {
    #[serde(default)]
    pub reference: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_boolean: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DefinitionResource {
    /// String value of the first extension with the given URL, if any.
    pub fn extension_value(&self, url: &str) -> Option<&str> {
        self.extension
            .iter()
            .find(|e| e.url == url)
            .and_then(Extension::string_value)
    }

    pub fn remove_extension(&mut self, url: &str) {
        self.extension.retain(|e| e.url != url);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Extension {
    /// Extensions written by old publishers use either valueString or valueUri.
    pub fn string_value(&self) -> Option<&str> {
        self.value_string.as_deref().or(self.value_uri.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendering: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<ManifestResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page: Vec<ManifestPage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.rendering.is_none()
            && self.resource.is_empty()
            && self.image.is_empty()
            && self.page.is_empty()
            && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResource {
    #[serde(default)]
    pub reference: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPage {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Locate and decode the pack's single descriptor, upgraded to the latest
/// schema. Zero or multiple `ImplementationGuide-*` entries is fatal.
pub fn load(entries: &EntrySet, revision: SchemaRevision) -> Result<Descriptor> {
    let matches: Vec<&String> = entries
        .keys()
        .filter(|k| k.starts_with("ImplementationGuide-"))
        .collect();
    if matches.len() != 1 {
        return Err(Error::AmbiguousDescriptor(matches.len()));
    }
    codec::upgrade(&entries[matches[0]], revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_fields_survive_round_trip() {
        let json = r#"{
            "resourceType": "ImplementationGuide",
            "url": "http://example.org/fhir/ImplementationGuide/test",
            "status": "active",
            "publisher": "Example Org"
        }"#;
        let descriptor: Descriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.extra["status"], "active");
        let out = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(out["publisher"], "Example Org");
    }

    #[test]
    fn load_rejects_zero_descriptors() {
        let entries = EntrySet::new();
        assert!(matches!(
            load(&entries, SchemaRevision::V400).unwrap_err(),
            Error::AmbiguousDescriptor(0)
        ));
    }

    #[test]
    fn load_rejects_multiple_descriptors() {
        let mut entries = EntrySet::new();
        entries.insert("ImplementationGuide-a.json".to_string(), b"{}".to_vec());
        entries.insert("ImplementationGuide-b.json".to_string(), b"{}".to_vec());
        assert!(matches!(
            load(&entries, SchemaRevision::V400).unwrap_err(),
            Error::AmbiguousDescriptor(2)
        ));
    }

    #[test]
    fn extension_string_value_prefers_value_string() {
        let ext: Extension = serde_json::from_str(
            r#"{"url": "http://example.org/ext", "valueUri": "page.html"}"#,
        )
        .unwrap();
        assert_eq!(ext.string_value(), Some("page.html"));
    }
}
