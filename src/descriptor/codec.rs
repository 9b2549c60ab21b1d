// src/descriptor/codec.rs

//! Per-revision descriptor codecs
//!
//! Each historical schema revision gets a pair of pure conversions over the
//! raw JSON object: `to_latest` lifts a native-revision descriptor into the
//! latest shape, `from_latest` lowers it back for re-emission. The set is
//! closed over `CodecFamily`, so adding a revision forces a codec choice.
//!
//! Structural differences handled here:
//! - legacy `dependency[]` vs latest `dependsOn[]`
//! - legacy `package[].resource[]` vs latest `definition.resource[]`
//! - DSTU2 marks examples with a `purpose` code, later revisions with a
//!   boolean
//! - `packageId` and `license` do not exist before the latest schema; they
//!   travel as cross-version extensions in lowered output
//! - `manifest` is latest-only and is dropped when lowering

use super::Descriptor;
use crate::error::Result;
use crate::revision::{CodecFamily, SchemaRevision};
use serde_json::{json, Map, Value};

const PACKAGE_ID_EXTENSION: &str =
    "http://hl7.org/fhir/4.0/StructureDefinition/extension-ImplementationGuide.packageId";
const LICENSE_EXTENSION: &str =
    "http://hl7.org/fhir/4.0/StructureDefinition/extension-ImplementationGuide.license";

type Conversion = fn(Map<String, Value>) -> Result<Map<String, Value>>;

struct RevisionCodec {
    to_latest: Conversion,
    from_latest: Conversion,
}

fn codec(family: CodecFamily) -> RevisionCodec {
    match family {
        CodecFamily::Dstu2 => RevisionCodec {
            to_latest: dstu2_to_latest,
            from_latest: dstu2_from_latest,
        },
        CodecFamily::Dstu2016May => RevisionCodec {
            to_latest: boolean_legacy_to_latest,
            from_latest: boolean_legacy_from_latest,
        },
        CodecFamily::Stu3 => RevisionCodec {
            to_latest: boolean_legacy_to_latest,
            from_latest: boolean_legacy_from_latest,
        },
        CodecFamily::Latest => RevisionCodec {
            to_latest: passthrough,
            from_latest: passthrough,
        },
    }
}

/// Decode revision-native descriptor bytes and lift them to the latest schema.
pub fn upgrade(bytes: &[u8], revision: SchemaRevision) -> Result<Descriptor> {
    let obj: Map<String, Value> = serde_json::from_slice(bytes)?;
    let lifted = (codec(revision.family()).to_latest)(obj)?;
    Ok(serde_json::from_value(Value::Object(lifted))?)
}

/// Lower a latest-schema descriptor back into revision-native bytes.
pub fn downgrade(descriptor: &Descriptor, revision: SchemaRevision) -> Result<Vec<u8>> {
    let obj: Map<String, Value> = serde_json::from_value(serde_json::to_value(descriptor)?)?;
    let lowered = (codec(revision.family()).from_latest)(obj)?;
    Ok(serde_json::to_vec_pretty(&Value::Object(lowered))?)
}

fn passthrough(obj: Map<String, Value>) -> Result<Map<String, Value>> {
    Ok(obj)
}

/// How a revision marks example resources.
#[derive(Clone, Copy, PartialEq)]
enum ExampleStyle {
    /// `example: true` (1.4.0, 3.0.x)
    Boolean,
    /// `purpose: "example"` (1.0.2)
    Purpose,
}

fn dstu2_to_latest(obj: Map<String, Value>) -> Result<Map<String, Value>> {
    legacy_to_latest(obj, ExampleStyle::Purpose)
}

fn dstu2_from_latest(obj: Map<String, Value>) -> Result<Map<String, Value>> {
    legacy_from_latest(obj, ExampleStyle::Purpose)
}

fn boolean_legacy_to_latest(obj: Map<String, Value>) -> Result<Map<String, Value>> {
    legacy_to_latest(obj, ExampleStyle::Boolean)
}

fn boolean_legacy_from_latest(obj: Map<String, Value>) -> Result<Map<String, Value>> {
    legacy_from_latest(obj, ExampleStyle::Boolean)
}

fn legacy_to_latest(
    mut obj: Map<String, Value>,
    style: ExampleStyle,
) -> Result<Map<String, Value>> {
    lift_known_extensions(&mut obj);

    if let Some(Value::Array(deps)) = obj.remove("dependency") {
        let lifted: Vec<Value> = deps
            .into_iter()
            .filter_map(|d| d.get("uri").cloned())
            .map(|uri| json!({ "uri": uri }))
            .collect();
        if !lifted.is_empty() {
            obj.insert("dependsOn".to_string(), Value::Array(lifted));
        }
    }

    if let Some(Value::Array(packages)) = obj.remove("package") {
        let mut resources = Vec::new();
        for package in &packages {
            let Some(Value::Array(items)) = package.get("resource") else {
                continue;
            };
            for item in items {
                let mut lifted = Map::new();
                if let Some(r) = item.get("sourceReference") {
                    lifted.insert("reference".to_string(), r.clone());
                } else if let Some(Value::String(uri)) = item.get("sourceUri") {
                    lifted.insert("reference".to_string(), json!({ "reference": uri }));
                }
                let example = match style {
                    ExampleStyle::Boolean => item
                        .get("example")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    ExampleStyle::Purpose => item
                        .get("purpose")
                        .and_then(Value::as_str)
                        .map(|p| p == "example")
                        .unwrap_or(false),
                };
                lifted.insert("exampleBoolean".to_string(), Value::Bool(example));
                if let Some(ext) = item.get("extension") {
                    lifted.insert("extension".to_string(), ext.clone());
                }
                resources.push(Value::Object(lifted));
            }
        }
        if !resources.is_empty() {
            obj.insert("definition".to_string(), json!({ "resource": resources }));
        }
    }

    Ok(obj)
}

fn legacy_from_latest(
    mut obj: Map<String, Value>,
    style: ExampleStyle,
) -> Result<Map<String, Value>> {
    lower_known_extensions(&mut obj);
    obj.remove("manifest");

    if let Some(Value::Array(deps)) = obj.remove("dependsOn") {
        let lowered: Vec<Value> = deps
            .iter()
            .filter_map(|d| d.get("uri").cloned())
            .map(|uri| json!({ "type": "reference", "uri": uri }))
            .collect();
        if !lowered.is_empty() {
            obj.insert("dependency".to_string(), Value::Array(lowered));
        }
    }

    if let Some(definition) = obj.remove("definition") {
        if let Some(Value::Array(items)) = definition.get("resource") {
            let mut resources = Vec::new();
            for item in items {
                let mut lowered = Map::new();
                if let Some(r) = item.get("reference") {
                    lowered.insert("sourceReference".to_string(), r.clone());
                }
                let example = item
                    .get("exampleBoolean")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                match style {
                    ExampleStyle::Boolean => {
                        lowered.insert("example".to_string(), Value::Bool(example));
                    }
                    ExampleStyle::Purpose => {
                        let purpose = if example { "example" } else { "profile" };
                        lowered.insert("purpose".to_string(), json!(purpose));
                    }
                }
                if let Some(ext) = item.get("extension") {
                    lowered.insert("extension".to_string(), ext.clone());
                }
                resources.push(Value::Object(lowered));
            }
            obj.insert(
                "package".to_string(),
                json!([{ "name": "resources", "resource": resources }]),
            );
        }
    }

    Ok(obj)
}

/// Pull `packageId`/`license` out of cross-version extensions on lift.
fn lift_known_extensions(obj: &mut Map<String, Value>) {
    let Some(Value::Array(extensions)) = obj.get_mut("extension") else {
        return;
    };
    let mut package_id = None;
    let mut license = None;
    extensions.retain(|ext| {
        let url = ext.get("url").and_then(Value::as_str).unwrap_or("");
        let value = ext.get("valueString").and_then(Value::as_str);
        match url {
            PACKAGE_ID_EXTENSION => {
                package_id = value.map(str::to_string);
                false
            }
            LICENSE_EXTENSION => {
                license = value.map(str::to_string);
                false
            }
            _ => true,
        }
    });
    if extensions.is_empty() {
        obj.remove("extension");
    }
    if let Some(id) = package_id {
        obj.insert("packageId".to_string(), Value::String(id));
    }
    if let Some(l) = license {
        obj.insert("license".to_string(), Value::String(l));
    }
}

/// Stash `packageId`/`license` as cross-version extensions on lowering,
/// since the legacy schemas have no native fields for them.
fn lower_known_extensions(obj: &mut Map<String, Value>) {
    let mut stashed = Vec::new();
    if let Some(Value::String(id)) = obj.remove("packageId") {
        stashed.push(json!({ "url": PACKAGE_ID_EXTENSION, "valueString": id }));
    }
    if let Some(Value::String(license)) = obj.remove("license") {
        stashed.push(json!({ "url": LICENSE_EXTENSION, "valueString": license }));
    }
    if stashed.is_empty() {
        return;
    }
    match obj.get_mut("extension") {
        Some(Value::Array(extensions)) => extensions.extend(stashed),
        _ => {
            obj.insert("extension".to_string(), Value::Array(stashed));
        }
    }
}
