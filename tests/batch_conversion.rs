// tests/batch_conversion.rs
//! End-to-end tests for the validator pack batch conversion
//!
//! These tests build real zip archives on disk, run the batch driver over a
//! directory tree, and inspect the emitted npm-style packages:
//! - a well-formed 3.0.1 pack converting without interactive input
//! - unsupported revisions skipped without failing the batch
//! - descriptor forms and manifest content inside the output archive

use flate2::read::GzDecoder;
use igpack2npm::prompt::ScriptedPrompt;
use igpack2npm::{Convertor, MemoryStore, SqliteStore, StdinPrompt};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn make_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buf);
        for (name, content) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }
    buf.into_inner()
}

fn read_tgz(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = File::open(path).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut out = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        out.insert(name, bytes);
    }
    out
}

const STU3_IG: &str = r#"{
    "resourceType": "ImplementationGuide",
    "id": "test",
    "url": "http://example.org/fhir/ImplementationGuide/test",
    "version": "1.0.0",
    "fhirVersion": "3.0.1",
    "dependency": [{ "type": "reference", "uri": "http://hl7.org/fhir/us/core" }],
    "package": [{
        "name": "main",
        "resource": [{ "example": true, "sourceReference": { "reference": "Patient/a" } }]
    }]
}"#;

fn well_formed_pack() -> Vec<u8> {
    let schematron = make_zip(&[("test.sch", b"<schema/>")]);
    make_zip(&[
        ("version.info", b"[FHIR]\nversion=3.0.1\n"),
        ("ImplementationGuide-test.json", STU3_IG.as_bytes()),
        ("Patient-a.json", b"{\"resourceType\": \"Patient\", \"id\": \"a\"}"),
        ("schematron.zip", &schematron),
        (
            "spec.internals",
            br#"{
                "webUrl": "http://example.org/fhir/site",
                "paths": { "http://example.org/fhir/Patient/a": "Patient-a.html" },
                "images": ["logo.png"],
                "targets": ["index.html"]
            }"#,
        ),
    ])
}

/// Cache pre-populated so conversion never needs the interactive fallback.
fn warm_store() -> MemoryStore {
    MemoryStore::new()
        .with_package_id("http://example.org/fhir", "example.test")
        .with_package_id("http://hl7.org/fhir/us/core", "hl7.fhir.us.core")
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn two_archive_batch_converts_one_and_skips_the_other() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("guide-a");
    let b = dir.path().join("guide-b");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();
    fs::write(a.join("validator.pack"), well_formed_pack()).unwrap();
    fs::write(
        b.join("validator.pack"),
        make_zip(&[("version.info", b"[FHIR]\nversion=1.8.0\n")]),
    )
    .unwrap();

    let mut convertor = Convertor::new(warm_store(), ScriptedPrompt::new(Vec::<String>::new()));
    convertor.run(&[dir.path().to_path_buf()]);

    assert_eq!(convertor.package_paths(), &[a.join("package.tgz")]);
    assert!(a.join("package.tgz").exists());
    assert!(!b.join("package.tgz").exists());
}

#[test]
fn malformed_pack_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad");
    let good = dir.path().join("zzz-good");
    fs::create_dir_all(&bad).unwrap();
    fs::create_dir_all(&good).unwrap();
    // Not a zip at all.
    fs::write(bad.join("validator.pack"), b"garbage").unwrap();
    fs::write(good.join("validator.pack"), well_formed_pack()).unwrap();

    let mut convertor = Convertor::new(warm_store(), ScriptedPrompt::new(Vec::<String>::new()));
    convertor.run(&[dir.path().to_path_buf()]);

    assert_eq!(convertor.package_paths(), &[good.join("package.tgz")]);
}

#[test]
fn emitted_package_carries_both_descriptor_forms() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("validator.pack");
    fs::write(&pack, well_formed_pack()).unwrap();

    let mut convertor = Convertor::new(warm_store(), ScriptedPrompt::new(Vec::<String>::new()));
    let output = convertor.process_pack(&pack).unwrap().unwrap();

    let contents = read_tgz(&output);

    // npm manifest
    let npm: serde_json::Value =
        serde_json::from_slice(&contents["package/package.json"]).unwrap();
    assert_eq!(npm["name"], "example.test");
    assert_eq!(npm["version"], "1.0.0");
    assert_eq!(npm["canonical"], "http://example.org/fhir");
    assert_eq!(npm["dependencies"]["hl7.fhir.us.core"], "1.0.1");

    // Latest-schema descriptor, fully normalized.
    let latest: serde_json::Value = serde_json::from_slice(&contents["package/ig-r4.json"]).unwrap();
    assert_eq!(latest["packageId"], "example.test");
    assert_eq!(latest["license"], "CC0-1.0");
    assert_eq!(latest["fhirVersion"], "3.0.1");
    assert_eq!(latest["manifest"]["rendering"], "http://example.org/fhir/site");
    let rows = latest["manifest"]["resource"].as_array().unwrap();
    let patient = rows
        .iter()
        .find(|r| r["reference"]["reference"] == "Patient/a")
        .unwrap();
    assert_eq!(patient["exampleBoolean"], true);
    assert_eq!(patient["relativePath"], "Patient-a.html");
    assert_eq!(latest["manifest"]["image"][0], "logo.png");
    assert_eq!(latest["manifest"]["page"][0]["name"], "index.html");

    // Original-revision re-encode keeps the legacy shape.
    let original: serde_json::Value =
        serde_json::from_slice(&contents["package/ImplementationGuide-test.json"]).unwrap();
    assert_eq!(original["fhirVersion"], "3.0.1");
    assert!(original["package"].is_array());
    assert!(original.get("manifest").is_none());

    // Original resources, schematron, and internals all present.
    assert!(contents.contains_key("package/Patient-a.json"));
    assert!(contents.contains_key("package/schematron/test.sch"));
    assert!(contents.contains_key("package/other/spec.internals"));
}

#[test]
fn interactive_fallback_resolves_and_persists_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("validator.pack");
    // No version in the descriptor and a cold cache: id, version, and the
    // dependency id all come from the prompt.
    let ig = r#"{
        "resourceType": "ImplementationGuide",
        "id": "test",
        "url": "http://example.org/fhir/ImplementationGuide/test",
        "fhirVersion": "3.0.1",
        "dependency": [{ "type": "reference", "uri": "http://example.org/fhir/dep" }]
    }"#;
    fs::write(
        &pack,
        make_zip(&[
            ("version.info", b"[FHIR]\nversion=3.0.1\n"),
            ("ImplementationGuide-test.json", ig.as_bytes()),
        ]),
    )
    .unwrap();

    let prompt = ScriptedPrompt::new(["example.test", "2.0.0", "example.dep"]);
    let mut convertor = Convertor::new(MemoryStore::new(), prompt);
    let output = convertor.process_pack(&pack).unwrap().unwrap();

    let contents = read_tgz(&output);
    let latest: serde_json::Value = serde_json::from_slice(&contents["package/ig-r4.json"]).unwrap();
    assert_eq!(latest["packageId"], "example.test");
    assert_eq!(latest["version"], "2.0.0");
    assert_eq!(latest["dependsOn"][0]["packageId"], "example.dep");

    // A second pack for the same guide resolves everything from the stores.
    let dir2 = tempfile::tempdir().unwrap();
    let pack2 = dir2.path().join("validator.pack");
    fs::copy(&pack, &pack2).unwrap();
    // Reuse the same convertor: its store now holds the answers.
    convertor.process_pack(&pack2).unwrap().unwrap();
}

#[test]
fn sqlite_store_works_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pack = dir.path().join("validator.pack");
    fs::write(&pack, well_formed_pack()).unwrap();

    let db = dir.path().join("cache.db");
    {
        use igpack2npm::IdentityCache;
        let mut store = SqliteStore::open(&db).unwrap();
        store
            .record("http://example.org/fhir", "example.test")
            .unwrap();
        store
            .record("http://hl7.org/fhir/us/core", "hl7.fhir.us.core")
            .unwrap();
    }

    let store = SqliteStore::open(&db).unwrap();
    let mut convertor = Convertor::new(store, ScriptedPrompt::new(Vec::<String>::new()));
    let output = convertor.process_pack(&pack).unwrap().unwrap();
    assert!(output.exists());
}

// StdinPrompt is production wiring; just make sure the type composes.
#[test]
fn convertor_accepts_stdin_prompt_wiring() {
    let _convertor = Convertor::new(MemoryStore::new(), StdinPrompt);
}
